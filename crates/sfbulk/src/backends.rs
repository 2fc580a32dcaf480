//! 🔌 Backends — where the real I/O happens.
//!
//! 🚰 Row sources pour records in, transports push batches out.
//! And in between, the delivery client does the thinking.
//!
//! Same shape on both ends: a trait, a few concrete impls, and an enum that dispatches
//! to them so the client never has to care whether it's talking to a CSV file, a Vec,
//! Salesforce, or a Mutex full of recorded requests.
//!
//! 🦆 The duck is here because every file must have one. This is law.

pub mod file;
pub mod in_mem;
pub mod salesforce;
mod source;
mod transport;

pub use file::{FileFormat, FileSource, FileSourceConfig};
pub use in_mem::{InMemorySource, InMemorySourceConfig, InMemoryTransport, ScriptedReply};
pub use salesforce::{Endpoint, HttpTransport, SalesforceConfig};
pub use source::{RowSource, SourceBackend};
pub use transport::{Transport, TransportBackend};
