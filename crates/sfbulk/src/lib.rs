//! 📦 sfbulk: rows in, Salesforce sObjects out.
//!
//! 🚰 `RowSource` → `RecordEncoder` → `BulkClient` (queue → batch) → `Transport` → 📊 `DeliveryReport`
//!
//! 🦆

pub mod app_config;
pub mod backends;
pub mod common;
pub mod delivery;
pub mod error;
pub mod progress;
pub mod transforms;

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use tracing::info;

use crate::app_config::{AppConfig, SourceConfig};
use crate::backends::{
    FileSource, HttpTransport, InMemorySource, SourceBackend, TransportBackend,
};
use crate::delivery::{BulkClient, DeliveryReport, FailureStore};
use crate::error::BulkError;
use crate::progress::ProgressMetrics;
use crate::transforms::{JinjaTemplate, RecordEncoder};

/// 🚀 One run: resolve secrets, validate, wire everything up, drain the source.
///
/// 💀 `Err` means the run was stopped (bad config, bad template, unreadable source,
/// failed records that could not be saved). Failed batches do NOT make this an `Err`;
/// check `DeliveryReport::is_clean` for those.
pub async fn run(app_config: AppConfig) -> Result<DeliveryReport> {
    run_with_progress(app_config, &MultiProgress::new()).await
}

/// 🚀 Same as [`run`], with the spinner drawn through `multi`. Callers that also print
/// to the terminal (log lines, mostly) use `multi.suspend(..)` to print around it.
pub async fn run_with_progress(
    mut app_config: AppConfig,
    multi: &MultiProgress,
) -> Result<DeliveryReport> {
    app_config.resolve_secrets()?;
    let AppConfig {
        source_config,
        salesforce,
        delivery,
    } = app_config;
    delivery.validate()?;

    let endpoint = salesforce.endpoint()?;
    info!(
        "🧭 {} {} into `{}` ({})",
        endpoint.method,
        endpoint.url,
        salesforce.object,
        if endpoint.is_upsert() { "upsert" } else { "insert" }
    );

    let encoder = build_encoder(&salesforce.object, &delivery).await?;

    let transport = TransportBackend::Http(HttpTransport::new(
        &salesforce.access_token,
        Duration::from_secs(salesforce.connect_timeout_secs),
        Duration::from_secs(salesforce.request_timeout_secs),
    )?);

    let mut source = match source_config {
        SourceConfig::File(file_config) => SourceBackend::File(FileSource::new(file_config).await?),
        SourceConfig::InMemory(in_mem_config) => {
            SourceBackend::InMemory(InMemorySource::from_config(in_mem_config))
        }
    };

    // -- 🧪 a dry run never fails a record, so it gets no store (and no new directory)
    let failure_store = match &delivery.failed_records_dir {
        Some(dir) if !delivery.dry_run => Some(FailureStore::new(dir).await?),
        _ => None,
    };

    if delivery.dry_run {
        info!("🧪 dry run: nothing will be sent to Salesforce");
    }

    let progress = ProgressMetrics::new_in(salesforce.object.clone(), multi);
    let mut client = BulkClient::new(delivery, endpoint, encoder, transport)?.with_progress(progress);
    if let Some(store) = failure_store {
        client = client.with_failure_store(store);
    }

    client.send_all(&mut source).await
}

async fn build_encoder(
    object: &str,
    delivery: &delivery::DeliveryConfig,
) -> Result<RecordEncoder> {
    let template_source = match (&delivery.template, &delivery.template_file) {
        (Some(inline), _) => Some(inline.clone()),
        (None, Some(path)) => Some(tokio::fs::read_to_string(path).await.with_context(|| {
            format!("💀 could not read the item template file '{}'", path.display())
        })?),
        (None, None) => None,
    };

    let encoder = RecordEncoder::new(object).with_separator(delivery.separator.clone());
    match template_source {
        Some(source) if source.trim().is_empty() => {
            Err(BulkError::config("the item template is empty").into())
        }
        Some(source) => Ok(encoder.with_template(JinjaTemplate::new(source)?)),
        None => Ok(encoder),
    }
}
