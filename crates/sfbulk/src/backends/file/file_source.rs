use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::backends::RowSource;
use crate::common::Record;
use crate::error::BulkError;

/// 📑 What the bytes in the file look like.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileFormat {
    #[default]
    #[serde(alias = "csv")]
    Csv,
    /// One JSON object per line. Also what the failed-record store writes, so a failed
    /// batch can be fed straight back in.
    #[serde(alias = "jsonl")]
    Jsonl,
}

// -- 📂 FileSourceConfig, co-located with the FileSource that uses it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileSourceConfig {
    /// `file://<path>` or a bare path. Ending in `.gz` means gunzip on the fly.
    pub file_name: String,
    #[serde(default)]
    pub format: FileFormat,
    /// CSV only. Without a header row, columns are keyed `"0"`, `"1"`, ...
    #[serde(default)]
    pub has_headers: bool,
}

/// 🧭 Turn an input URI into a local path.
///
/// Only local files are supported. Cloud URIs (`gs://`, `bq://`) are recognized so the
/// error says what is going on instead of "file not found: gs:".
pub fn resolve_input_path(input: &str) -> Result<PathBuf, BulkError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BulkError::config("the input is empty"));
    }
    if let Some(path) = input.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = input.split_once("://") {
        return Err(BulkError::config(format!(
            "the `{scheme}://` input scheme is not supported, stage the data to a local file first"
        )));
    }
    Ok(PathBuf::from(input))
}

type ByteStream = Box<dyn Read + Send>;

enum RowReader {
    Csv {
        reader: csv::Reader<ByteStream>,
        headers: Option<StringRecord>,
        row: StringRecord,
    },
    Jsonl {
        lines: Lines<BufReader<ByteStream>>,
        line_number: usize,
    },
}

/// 📂 FileSource: reads a local file lazily, one record per `next_row`.
///
/// ⚠️ Reads are synchronous under the hood (the `csv` crate speaks `std::io::Read`).
/// Rows are small and the next thing we do with them is wait on the network, so
/// this has not been worth a `spawn_blocking` yet.
pub struct FileSource {
    config: FileSourceConfig,
    reader: RowReader,
    rows_read: u64,
}

// 🐛 The reader holds a boxed byte stream which has no Debug. Nobody misses it.
impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("config", &self.config)
            .field("rows_read", &self.rows_read)
            .finish()
    }
}

impl FileSource {
    /// 🚀 Opens the file, sniffs `.gz`, reads the CSV header row if there is one.
    pub async fn new(config: FileSourceConfig) -> Result<Self> {
        let path = resolve_input_path(&config.file_name)?;

        // -- 💀 The door. It's locked. Or it doesn't exist. Or the filesystem lied to you.
        let file = File::open(&path).with_context(|| {
            format!(
                "💀 The door to '{}' would not budge. We knocked. We checked if it existed \
                (it might not). We checked permissions (they might be wrong). It stayed shut.",
                path.display()
            )
        })?;

        let gzipped = path.extension().is_some_and(|ext| ext == "gz");
        let bytes: ByteStream = if gzipped {
            debug!("🗜️ '{}' looks gzipped, decompressing on the fly", path.display());
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let reader = match config.format {
            FileFormat::Csv => {
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(config.has_headers)
                    .flexible(true)
                    .from_reader(bytes);
                let headers = if config.has_headers {
                    Some(
                        reader
                            .headers()
                            .with_context(|| {
                                format!("💀 could not read the header row of '{}'", path.display())
                            })?
                            .clone(),
                    )
                } else {
                    None
                };
                RowReader::Csv {
                    reader,
                    headers,
                    row: StringRecord::new(),
                }
            }
            FileFormat::Jsonl => RowReader::Jsonl {
                lines: BufReader::new(bytes).lines(),
                line_number: 0,
            },
        };

        Ok(Self {
            config,
            reader,
            rows_read: 0,
        })
    }

    fn next_csv_row(
        reader: &mut csv::Reader<ByteStream>,
        headers: &Option<StringRecord>,
        row: &mut StringRecord,
    ) -> Result<Option<Record>> {
        if !reader.read_record(row)? {
            return Ok(None);
        }
        let mut record = Record::new();
        match headers {
            Some(headers) => {
                // -- 🎯 short rows leave trailing columns out, long rows drop the extras
                for (name, value) in headers.iter().zip(row.iter()) {
                    record.insert(name.to_string(), Value::String(value.to_string()));
                }
            }
            None => {
                for (index, value) in row.iter().enumerate() {
                    record.insert(index.to_string(), Value::String(value.to_string()));
                }
            }
        }
        Ok(Some(record))
    }

    fn next_jsonl_row(
        lines: &mut Lines<BufReader<ByteStream>>,
        line_number: &mut usize,
    ) -> Result<Option<Record>> {
        for line in lines.by_ref() {
            *line_number += 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(trimmed)
                .with_context(|| format!("💀 line {line_number} is not valid JSON"))?;
            let Value::Object(record) = value else {
                bail!("💀 line {line_number} is valid JSON but not an object, and rows need field names");
            };
            return Ok(Some(record));
        }
        Ok(None)
    }
}

#[async_trait]
impl RowSource for FileSource {
    async fn next_row(&mut self) -> Result<Option<Record>> {
        let next = match &mut self.reader {
            RowReader::Csv {
                reader,
                headers,
                row,
            } => Self::next_csv_row(reader, headers, row),
            RowReader::Jsonl { lines, line_number } => Self::next_jsonl_row(lines, line_number),
        }
        .with_context(|| format!("💀 failed reading a row from '{}'", self.config.file_name))?;

        if next.is_some() {
            self.rows_read += 1;
            trace!("📖 row {} out of '{}'", self.rows_read, self.config.file_name);
        }
        Ok(next)
    }
}
