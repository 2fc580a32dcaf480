use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backends::RowSource;
use crate::common::Record;

/// 📦 Rows written straight into the config. Mostly for tests and quick experiments:
///
/// ```toml
/// [source_config.InMemory]
/// records = [{ Name = "Acme" }, { Name = "Globex" }]
/// ```
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct InMemorySourceConfig {
    #[serde(default)]
    pub records: Vec<Record>,
}

/// 📦 The world's most optimistic data source. Hands out its rows, once, in order.
#[derive(Debug, Default)]
pub struct InMemorySource {
    rows: VecDeque<Record>,
}

impl InMemorySource {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            rows: records.into_iter().collect(),
        }
    }

    pub fn from_config(config: InMemorySourceConfig) -> Self {
        Self::new(config.records)
    }
}

#[async_trait]
impl RowSource for InMemorySource {
    async fn next_row(&mut self) -> Result<Option<Record>> {
        // -- 🎯 pop_front: first in, first out, the way the rows were written
        Ok(self.rows.pop_front())
    }
}
