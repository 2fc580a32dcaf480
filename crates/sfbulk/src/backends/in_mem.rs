//! # Previously, on sfbulk...
//!
//! 🎬 The rows were ready. The API was not. Or rather: nobody wanted a test suite
//! that creates real Accounts in a real org every time someone hits save.
//!
//! `in_mem` provides an in-memory [`InMemorySource`] that hands out a fixed list of
//! records, and an [`InMemoryTransport`] that writes down every request it is given
//! and answers from a script. Great for assertions, great for trust issues, great for both.
//!
//! ✅ No network calls. No disk I/O. Just vibes and heap memory. 🦆

mod in_mem_source;
mod in_mem_transport;

pub use in_mem_source::{InMemorySource, InMemorySourceConfig};
pub use in_mem_transport::{InMemoryTransport, ScriptedReply};
