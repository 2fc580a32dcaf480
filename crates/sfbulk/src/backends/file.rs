//! 📂 Previously, on "Things That Could Go Wrong With A File"...
//!
//! Someone exported forty thousand Accounts to a CSV. Maybe with a header row. Maybe
//! without, because the warehouse export "doesn't do headers". Maybe gzipped, because
//! the warehouse export also "does gzip, but only sometimes".
//!
//! This module reads that file, one row per call, and never loads the whole thing into
//! memory. CSV rows become records keyed by header (or by column index `"0"`, `"1"`, ...
//! when there is no header). JSONL lines must each be a JSON object.
//!
//! 🚰 path → (gunzip?) → csv / line reader → Record → encoder
//! 🦆 (mandatory, no notes)

mod file_source;

pub use file_source::{FileFormat, FileSource, FileSourceConfig, resolve_input_path};
