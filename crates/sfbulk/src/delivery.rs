//! 🚚 Delivery: the queue, the batches, and the reading of the tea leaves.
//!
//! 🎬 *[a row is encoded. it joins the queue. 199 more follow.]*
//! *[the queue is full. a bus called `BulkRequest` pulls up.]*
//! *[Salesforce answers. Some made it. Some did not. We write down who.]*
//!
//! One row at a time, one batch in flight, no concurrency, no retries. A batch that
//! fails (partly, entirely, or because the network went for coffee) is logged, counted,
//! optionally saved to disk, and the run moves on. Only configuration and encoding
//! errors stop the run, because those break every row the same way.
//!
//! 🦆

mod failure_store;
mod outcome;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::backends::{Endpoint, RowSource, Transport, TransportBackend};
use crate::common::{BulkPayload, BulkRequest, EncodedItem, TransportResponse};
use crate::error::BulkError;
use crate::progress::ProgressMetrics;
use crate::transforms::{DEFAULT_SEPARATOR, RecordEncoder};

pub use failure_store::FailureStore;
pub use outcome::{BatchOutcome, DeliveryReport, RecordFailure, RecordResult};

/// 📦 Salesforce's composite sObject limit, and therefore ours.
pub const DEFAULT_BULK_SIZE: usize = 200;

/// ⚙️ How rows are batched and sent. Set once, before the first row.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeliveryConfig {
    /// Max records per request. Must be at least 1.
    #[serde(default = "default_bulk_size")]
    pub bulk_size: usize,
    /// `false` sends one record per request, which is slow and occasionally what you want.
    #[serde(default = "default_bulk")]
    pub bulk: bool,
    #[serde(default)]
    pub all_or_none: bool,
    /// 🧪 Log what would be sent, send nothing.
    #[serde(default)]
    pub dry_run: bool,
    /// 🎭 Inline item template. The row is bound as `row`.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_file: Option<PathBuf>,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// 💾 Failed batches are saved here when set.
    #[serde(default)]
    pub failed_records_dir: Option<PathBuf>,
}

fn default_bulk_size() -> usize {
    DEFAULT_BULK_SIZE
}

fn default_bulk() -> bool {
    true
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            bulk_size: default_bulk_size(),
            bulk: default_bulk(),
            all_or_none: false,
            dry_run: false,
            template: None,
            template_file: None,
            separator: default_separator(),
            failed_records_dir: None,
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> Result<(), BulkError> {
        if self.bulk_size == 0 {
            return Err(BulkError::config("bulk_size must be at least 1"));
        }
        if self.template.is_some() && self.template_file.is_some() {
            return Err(BulkError::config(
                "pick one of `template` and `template_file`, not both",
            ));
        }
        Ok(())
    }
}

/// 🚚 The delivery client. Owns the queue, the transport, and the running score.
#[derive(Debug)]
pub struct BulkClient {
    config: DeliveryConfig,
    endpoint: Endpoint,
    encoder: RecordEncoder,
    transport: TransportBackend,
    queue: Vec<EncodedItem>,
    report: DeliveryReport,
    progress: ProgressMetrics,
    failure_store: Option<FailureStore>,
}

impl BulkClient {
    pub fn new(
        config: DeliveryConfig,
        endpoint: Endpoint,
        encoder: RecordEncoder,
        transport: TransportBackend,
    ) -> Result<Self, BulkError> {
        config.validate()?;
        let progress = ProgressMetrics::hidden(encoder.object());
        Ok(Self {
            queue: Vec::with_capacity(config.bulk_size),
            config,
            endpoint,
            encoder,
            transport,
            report: DeliveryReport::default(),
            progress,
            failure_store: None,
        })
    }

    pub fn with_failure_store(mut self, failure_store: FailureStore) -> Self {
        self.failure_store = Some(failure_store);
        self
    }

    pub fn with_progress(mut self, progress: ProgressMetrics) -> Self {
        self.progress = progress;
        self
    }

    pub fn report(&self) -> &DeliveryReport {
        &self.report
    }

    /// 🚀 Drain the source: encode every row, batch, send, flush the remainder.
    ///
    /// 💀 Returns `Err` only for fatal problems: the source failing to read, a row that
    /// cannot be encoded, or failed records that cannot be saved. Failed batches are in
    /// the returned report instead.
    pub async fn send_all<S>(&mut self, source: &mut S) -> Result<DeliveryReport>
    where
        S: RowSource + ?Sized,
    {
        while let Some(record) = source
            .next_row()
            .await
            .context("💀 the row source gave up mid-stream")?
        {
            self.report.rows_read += 1;
            self.progress.row_read();
            let row_number = self.report.rows_read;

            let item = self
                .encoder
                .encode(record)
                .with_context(|| format!("💀 row {row_number} could not be encoded"))?;

            if self.config.bulk {
                self.enqueue(item).await?;
            } else {
                self.send_batch(vec![item]).await?;
            }
        }

        if self.report.rows_read == 0 {
            info!("📭 No record to send");
        }
        self.flush().await?;
        if self.report.records_submitted > 0 {
            info!(
                "🏁 request sent ({}/{}) across {} batch(es)",
                self.report.records_succeeded,
                self.report.records_submitted,
                self.report.batches_submitted
            );
        }
        self.progress.finish();
        Ok(self.report.clone())
    }

    /// 📥 Queue one item. A full queue is sent right away.
    pub async fn enqueue(&mut self, item: EncodedItem) -> Result<()> {
        self.queue.push(item);
        if self.queue.len() >= self.config.bulk_size {
            let batch = std::mem::replace(&mut self.queue, Vec::with_capacity(self.config.bulk_size));
            self.send_batch(batch).await?;
        }
        Ok(())
    }

    /// 🚽 Send whatever is still queued. An empty queue sends nothing.
    pub async fn flush(&mut self) -> Result<()> {
        if !self.queue.is_empty() {
            let batch = std::mem::take(&mut self.queue);
            self.send_batch(batch).await?;
        }
        Ok(())
    }

    /// 📡 Send one batch (or log it, in dry-run), interpret the answer, keep score.
    pub async fn send_batch(&mut self, items: Vec<EncodedItem>) -> Result<BatchOutcome> {
        if items.is_empty() && !self.config.dry_run {
            info!("📭 No record to send");
            return Ok(BatchOutcome::Empty);
        }

        info!(
            "📡 Sending a {} HTTP request to {}",
            self.endpoint.method, self.endpoint.url
        );

        let outcome = if self.config.dry_run {
            self.log_dry_run(&items);
            BatchOutcome::DryRun {
                records: items.len(),
            }
        } else {
            let body = BulkPayload::new(self.config.all_or_none, &items)
                .render()
                .context("💀 a batch refused to serialize")?;
            let request = BulkRequest {
                method: self.endpoint.method.clone(),
                url: self.endpoint.url.clone(),
                body,
            };
            match self.transport.send(request).await {
                Ok(response) => interpret_response(response, &items),
                Err(err) => {
                    error!(
                        "🔌 no response for a batch of {} records, moving on: {err:#}",
                        items.len()
                    );
                    BatchOutcome::TransportFailed {
                        reason: format!("{err:#}"),
                    }
                }
            }
        };

        self.report.absorb(items.len(), &outcome);
        self.progress.batch_finished(items.len(), &outcome);
        self.save_failures(&items, &outcome).await?;
        Ok(outcome)
    }

    fn log_dry_run(&self, items: &[EncodedItem]) {
        if items.is_empty() {
            info!("🧪 [DRY RUN] No record to send");
            return;
        }
        let total = items.len();
        info!(
            "🧪 [DRY RUN] Would have sent {total} elements (allOrNone: {})",
            self.config.all_or_none
        );
        for (index, item) in items.iter().enumerate() {
            info!("🧪 [DRY RUN] Record {}/{total}: {}", index + 1, to_json(item));
        }
    }

    async fn save_failures(&mut self, items: &[EncodedItem], outcome: &BatchOutcome) -> Result<()> {
        let Some(store) = self.failure_store.as_mut() else {
            return Ok(());
        };

        let (records, error_text): (Vec<&EncodedItem>, String) = match outcome {
            BatchOutcome::Delivered { failures, .. } if !failures.is_empty() => {
                let records = failures.iter().filter_map(|f| f.record.as_ref()).collect();
                let error_text = failures
                    .iter()
                    .map(|f| format!("record {}: {}", f.index + 1, Value::Array(f.errors.clone())))
                    .collect::<Vec<_>>()
                    .join("\n");
                (records, error_text)
            }
            BatchOutcome::Rejected { status, body } => {
                (items.iter().collect(), format!("HTTP {status}: {body}"))
            }
            BatchOutcome::TransportFailed { reason } => (items.iter().collect(), reason.clone()),
            _ => return Ok(()),
        };

        let path = store
            .write(&records, &error_text)
            .await
            .context("💀 failed records could not be saved, stopping before more of them are lost")?;
        warn!(
            "💾 {} failed record(s) saved to {}",
            records.len(),
            path.display()
        );
        Ok(())
    }
}

/// 🔍 200 → per-record results. Anything else → logged, not parsed.
fn interpret_response(response: TransportResponse, items: &[EncodedItem]) -> BatchOutcome {
    if response.status != 200 {
        warn!(
            "⚠️ error when sending the rows: HTTP {} {}",
            response.status, response.body
        );
        return BatchOutcome::Rejected {
            status: response.status,
            body: response.body,
        };
    }

    let results: Vec<RecordResult> = match serde_json::from_str(&response.body) {
        Ok(results) => results,
        Err(err) => {
            warn!(
                "⚠️ got a 200 but could not read per-record results ({err}): {}",
                response.body
            );
            return BatchOutcome::Rejected {
                status: response.status,
                body: response.body,
            };
        }
    };

    let total = items.len();
    if results.len() != total {
        warn!(
            "⚠️ sent {total} records but got {} results back, records without a result count as failed",
            results.len()
        );
    }

    let mut succeeded = 0;
    let mut failures = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let errors = match results.get(index) {
            Some(result) if result.success => {
                succeeded += 1;
                continue;
            }
            Some(result) => result.errors.clone(),
            None => vec![Value::String("no result returned for this record".to_string())],
        };
        // -- ⚠️ built outside warn!: inside the macro `Value` means tracing's trait, not serde_json's
        let detail = Value::Array(errors.clone());
        warn!(
            "💀 record {}/{total} failed: {detail} | record: {}",
            index + 1,
            to_json(item)
        );
        failures.push(RecordFailure {
            index,
            errors,
            record: Some(item.clone()),
        });
    }

    info!("✅ request sent ({succeeded}/{total})");
    BatchOutcome::Delivered {
        total,
        succeeded,
        failures,
    }
}

fn to_json(item: &EncodedItem) -> String {
    serde_json::to_string(item).unwrap_or_else(|err| format!("<unprintable: {err}>"))
}
