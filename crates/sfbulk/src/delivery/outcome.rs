//! 📬 What happened to a batch, and what happened to the whole run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::EncodedItem;

/// 📨 One entry of a composite sObject response. Salesforce sends one per submitted record,
/// in submission order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecordResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

/// 💀 A record Salesforce said no to, paired with what we actually sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// zero-based position inside the batch
    pub index: usize,
    pub errors: Vec<Value>,
    pub record: Option<EncodedItem>,
}

/// 🎲 The fate of one submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// 🧪 Dry-run: logged, never sent.
    DryRun { records: usize },
    /// 📭 Live mode was asked to send nothing, and obliged.
    Empty,
    /// ✅ HTTP 200 with per-record results. `failures` may be empty, may be everything.
    Delivered {
        total: usize,
        succeeded: usize,
        failures: Vec<RecordFailure>,
    },
    /// ⚠️ A response came back, but not the kind we can read per record.
    Rejected { status: u16, body: String },
    /// 🔌 No response at all.
    TransportFailed { reason: String },
}

impl BatchOutcome {
    /// Did every record in the batch make it (or was there nothing to make)?
    pub fn is_clean(&self) -> bool {
        match self {
            BatchOutcome::DryRun { .. } | BatchOutcome::Empty => true,
            BatchOutcome::Delivered { failures, .. } => failures.is_empty(),
            BatchOutcome::Rejected { .. } | BatchOutcome::TransportFailed { .. } => false,
        }
    }
}

/// 📊 Running totals for one run. Returned by `BulkClient::send_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub rows_read: u64,
    pub batches_submitted: u64,
    pub dry_run_batches: u64,
    pub records_submitted: u64,
    pub records_succeeded: u64,
    pub records_failed: u64,
    pub transport_failures: u64,
    pub unexpected_responses: u64,
}

impl DeliveryReport {
    /// ✅ Nothing failed. Not a record, not a batch, not a socket.
    pub fn is_clean(&self) -> bool {
        self.records_failed == 0 && self.transport_failures == 0 && self.unexpected_responses == 0
    }

    pub(crate) fn absorb(&mut self, batch_len: usize, outcome: &BatchOutcome) {
        let batch_len = batch_len as u64;
        match outcome {
            BatchOutcome::DryRun { .. } => {
                self.batches_submitted += 1;
                self.dry_run_batches += 1;
            }
            BatchOutcome::Empty => {}
            BatchOutcome::Delivered {
                succeeded,
                failures,
                ..
            } => {
                self.batches_submitted += 1;
                self.records_submitted += batch_len;
                self.records_succeeded += *succeeded as u64;
                self.records_failed += failures.len() as u64;
            }
            BatchOutcome::Rejected { .. } => {
                self.batches_submitted += 1;
                self.records_submitted += batch_len;
                self.records_failed += batch_len;
                self.unexpected_responses += 1;
            }
            BatchOutcome::TransportFailed { .. } => {
                self.batches_submitted += 1;
                self.records_submitted += batch_len;
                self.records_failed += batch_len;
                self.transport_failures += 1;
            }
        }
    }
}
