use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::common::EncodedItem;

/// 🔢 Stores opened by this process so far. Two stores in the same millisecond still differ.
static STORES_OPENED: AtomicU64 = AtomicU64::new(0);

/// 💾 Where failed records go to wait for a second chance.
///
/// Every failed batch leaves two files behind:
/// - `records_<run>_<seq>.jsonl`: the encoded items that did not make it, one per line
/// - `error_<run>_<seq>.txt`: what went wrong, and the command-line flags to resubmit them
///
/// `<run>` is `<unix millis>-<pid>-<n>`, so runs sharing a directory never share a name.
/// `<seq>` counts failed batches within the run. Files are created with `create_new`:
/// an existing file is an error, never overwritten.
#[derive(Debug)]
pub struct FailureStore {
    dir: PathBuf,
    run_id: String,
    sequence: u64,
}

impl FailureStore {
    /// 🚀 Creates the directory (and parents) if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.with_context(|| {
            format!(
                "💀 The failed-records directory '{}' could not be conjured into existence.",
                dir.display()
            )
        })?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis())
            .unwrap_or_default();
        let run_id = format!(
            "{millis}-{}-{}",
            std::process::id(),
            STORES_OPENED.fetch_add(1, Ordering::Relaxed)
        );
        Ok(Self {
            dir,
            run_id,
            sequence: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 📝 Writes one failed batch. Returns the path of the records file.
    pub async fn write(&mut self, records: &[&EncodedItem], error: &str) -> Result<PathBuf> {
        self.sequence += 1;
        let stem = format!("{}_{}", self.run_id, self.sequence);
        let records_path = self.dir.join(format!("records_{stem}.jsonl"));
        let error_path = self.dir.join(format!("error_{stem}.txt"));

        let mut file_buf = BufWriter::new(create_new(&records_path).await?);
        for record in records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            file_buf.write_all(line.as_bytes()).await?;
        }
        // -- 🚽 flush, or the last few records live in a buffer that dies with us
        file_buf.flush().await?;

        let error_text = format!(
            "{error}\n\n\
            {count} record(s) saved to {records}\n\
            To resubmit them: --input {records} --input-file-format JSONL\n\
            These records are already encoded. Leave out the item template \
            (--sf-api-req-item-json-template / --sf-api-req-item-json-template-file) \
            when resubmitting, or it is applied a second time.\n",
            count = records.len(),
            records = records_path.display(),
        );
        let mut error_file = create_new(&error_path).await?;
        error_file.write_all(error_text.as_bytes()).await?;
        error_file.flush().await?;

        debug!(
            "💾 {} failed record(s) written to {}",
            records.len(),
            records_path.display()
        );
        Ok(records_path)
    }
}

async fn create_new(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .with_context(|| format!("💀 could not create '{}' (it may already exist)", path.display()))
}
