use anyhow::Result;
use async_trait::async_trait;

use crate::backends::{file, in_mem};
use crate::common::Record;

/// 🚰 A source that produces one record per call, lazily, exactly once.
///
/// # Contract 📜
/// - `next_row` returns `Ok(Some(record))` while rows flow, in source order.
/// - `Ok(None)` = exhausted. Calling again after that keeps returning `None`.
/// - The source may block on each pull (a file read, a network cursor). That's its business.
/// - How the data got here (local path, downloaded blob, query cursor) is also its business.
#[async_trait]
pub trait RowSource: std::fmt::Debug + Send {
    /// 📄 Fetch the next row, or `None` when the well is dry. 🏁
    async fn next_row(&mut self) -> Result<Option<Record>>;
}

/// 🎭 The many faces of a RowSource — a polymorphic casting call for data origins.
///
/// Ancient proverb: "He who hardcodes the source, loads only once."
#[derive(Debug)]
pub enum SourceBackend {
    InMemory(in_mem::InMemorySource),
    File(file::FileSource),
}

#[async_trait]
impl RowSource for SourceBackend {
    async fn next_row(&mut self) -> Result<Option<Record>> {
        match self {
            SourceBackend::InMemory(i) => i.next_row().await,
            SourceBackend::File(f) => f.next_row().await,
        }
    }
}
