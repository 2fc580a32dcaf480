//! 🚀 sfbulk: the front door, the bouncer, the maitre d' of the whole operation.
//!
//! 🎬 *[narrator voice]* "It all started with a CSV and a deadline..."
//! 📦 This binary parses flags, sets up logging, loads config, and then lets the
//! library do the heavy lifting. Like a manager. 🦆

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use figment::{Figment, providers::Serialized};
use indicatif::MultiProgress;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Create or update Salesforce objects from a data set.
///
/// Every flag can also live in the TOML file given with `--config`, or in `SFBULK_*`
/// environment variables (`SFBULK_SALESFORCE__OBJECT=Account`). Flags win.
/// `--sf-api-instance-url` and `--sf-api-access-token` accept `env://VAR_NAME`.
#[derive(Debug, Parser)]
#[command(name = "sfbulk", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the rows come from: `file://<path>` or a plain path (`.gz` is fine)
    #[arg(long, alias = "input-path")]
    input: Option<String>,

    /// CSV or JSONL
    #[arg(long)]
    input_file_format: Option<String>,

    /// The CSV file starts with a header row
    #[arg(long)]
    input_csv_file_has_headers: bool,

    /// Jinja template turning a row (bound as `row`) into a JSON object
    #[arg(long, conflicts_with = "sf_api_req_item_json_template_file")]
    sf_api_req_item_json_template: Option<String>,

    /// Same as `--sf-api-req-item-json-template`, read from a file
    #[arg(long)]
    sf_api_req_item_json_template_file: Option<PathBuf>,

    /// URL of the instance that the org lives on
    #[arg(long)]
    sf_api_instance_url: Option<String>,

    /// Access token used to authenticate the requests
    #[arg(long)]
    sf_api_access_token: Option<String>,

    /// sObject to create or update, e.g. `Account`
    #[arg(long)]
    sf_api_object: Option<String>,

    /// External id field; when set, records are upserted on it
    #[arg(long)]
    sf_api_external_id: Option<String>,

    /// API version, e.g. `v58.0`
    #[arg(long)]
    sf_api_version: Option<String>,

    /// Records per request (at most 200 for the composite API)
    #[arg(long)]
    sf_api_bulk_size: Option<usize>,

    /// Ask Salesforce to roll back the whole request if one record fails
    #[arg(long)]
    sf_api_all_or_none: bool,

    /// Send one record per request
    #[arg(long)]
    no_bulk: bool,

    /// Separator for nested field names (`Owner.Email`)
    #[arg(long)]
    separator: Option<String>,

    /// Save failed records (and why they failed) into this directory
    #[arg(long)]
    failed_records_dir: Option<PathBuf>,

    /// Log the requests instead of sending them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    /// 🎛️ Flags as a figment layer. Unset flags stay out so they don't flatten the file.
    fn overrides(&self) -> Figment {
        let mut figment = Figment::new();

        // -- 📥 source
        if let Some(input) = &self.input {
            figment = figment.merge(Serialized::default("source_config.File.file_name", input));
        }
        if let Some(format) = &self.input_file_format {
            figment = figment.merge(Serialized::default(
                "source_config.File.format",
                format.to_uppercase(),
            ));
        }
        if self.input_csv_file_has_headers {
            figment = figment.merge(Serialized::default("source_config.File.has_headers", true));
        }

        // -- 📡 salesforce
        let salesforce = [
            ("salesforce.instance_url", &self.sf_api_instance_url),
            ("salesforce.access_token", &self.sf_api_access_token),
            ("salesforce.object", &self.sf_api_object),
            ("salesforce.external_id", &self.sf_api_external_id),
            ("salesforce.api_version", &self.sf_api_version),
        ];
        for (key, value) in salesforce {
            if let Some(value) = value {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        // -- 🚚 delivery
        if let Some(template) = &self.sf_api_req_item_json_template {
            figment = figment.merge(Serialized::default("delivery.template", template));
        }
        if let Some(template_file) = &self.sf_api_req_item_json_template_file {
            figment = figment.merge(Serialized::default("delivery.template_file", template_file));
        }
        if let Some(bulk_size) = self.sf_api_bulk_size {
            figment = figment.merge(Serialized::default("delivery.bulk_size", bulk_size));
        }
        if self.sf_api_all_or_none {
            figment = figment.merge(Serialized::default("delivery.all_or_none", true));
        }
        if self.no_bulk {
            figment = figment.merge(Serialized::default("delivery.bulk", false));
        }
        if let Some(separator) = &self.separator {
            figment = figment.merge(Serialized::default("delivery.separator", separator));
        }
        if let Some(dir) = &self.failed_records_dir {
            figment = figment.merge(Serialized::default("delivery.failed_records_dir", dir));
        }
        if self.dry_run {
            figment = figment.merge(Serialized::default("delivery.dry_run", true));
        }

        figment
    }
}

/// 🚀 main(): parse, configure, run, report.
///
/// Exit codes: 0 when everything made it, 2 when the run finished but some records
/// did not, 1 when the run itself was stopped.
#[tokio::main]
async fn main() -> ExitCode {
    // 📡 `info` by default so dry-run output shows up without RUST_LOG gymnastics
    // 🖨️ logs go to stderr, stepping around the spinner instead of drawing through it
    let multi = MultiProgress::new();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(LogsAroundProgress::new(multi.clone()))
        .init();

    let args = Args::parse();
    let started = std::time::Instant::now();

    match load_and_run(&args, &multi).await {
        Ok(report) => {
            println!("{}", sfbulk::progress::report_table(&report, started.elapsed()));
            if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                warn!(
                    "⚠️ {} record(s) did not make it. Scroll up for the why.",
                    report.records_failed
                );
                ExitCode::from(2)
            }
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// 🖨️ A stderr writer that pauses the spinner for every write, so a log line never lands
/// in the middle of a redraw.
#[derive(Debug, Clone)]
struct LogsAroundProgress {
    multi: MultiProgress,
}

impl LogsAroundProgress {
    fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl Write for LogsAroundProgress {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().flush())
    }
}

impl<'a> MakeWriter<'a> for LogsAroundProgress {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

async fn load_and_run(
    args: &Args,
    multi: &MultiProgress,
) -> Result<sfbulk::delivery::DeliveryReport> {
    if let Some(config_file) = &args.config {
        // 🔒 Validate the config file exists before we get too emotionally attached
        let exists = config_file.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the configuration file exists: '{}'",
                config_file.display()
            )
        })?;
        if !exists {
            anyhow::bail!(
                "💀 Configuration file '{}' does not exist. If it's a relative path, \
                check the working directory, or use an absolute path to be absolutely certain.",
                config_file.display()
            );
        }
    }

    let app_config = sfbulk::app_config::load_config(args.config.as_deref(), args.overrides())
        .context("💀 couldn't assemble a configuration. Make sure you didn't forget something obvious, like --sf-api-object")?;

    sfbulk::run_with_progress(app_config, multi).await
}

/// 🧅 Peel the onion of sadness, one layer at a time.
fn report_error(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    let mut the_vibes_are_giving_connection_issues = false;
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
        // -- 🕵️ sniff the cause like a truffle pig hunting for connection problems
        let cause_str = cause.to_string();
        if cause_str.contains("error sending request")
            || cause_str.contains("connection refused")
            || cause_str.contains("Connection refused")
            || cause_str.contains("tcp connect error")
            || cause_str.contains("dns error")
        {
            the_vibes_are_giving_connection_issues = true;
        }
    }

    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: looks like Salesforce isn't reachable. Double-check --sf-api-instance-url \
            (it should look like https://yourorg.my.salesforce.com) and your network. ☕"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct FlagLayers {
        source_config: figment::value::Dict,
        salesforce: figment::value::Dict,
        delivery: figment::value::Dict,
    }

    #[test]
    fn the_one_where_only_the_flags_you_gave_show_up() {
        let args = Args::parse_from([
            "sfbulk",
            "--input",
            "file:///tmp/accounts.csv",
            "--input-file-format",
            "jsonl",
            "--sf-api-object",
            "Account",
            "--dry-run",
        ]);
        let layers: FlagLayers = args.overrides().extract().unwrap();

        assert_eq!(layers.source_config.len(), 1);
        assert_eq!(layers.salesforce.len(), 1);
        assert_eq!(layers.delivery.len(), 1);
        assert!(layers.delivery.contains_key("dry_run"));
    }

    #[test]
    fn the_one_where_log_lines_pass_straight_through_the_pause() {
        let writers = LogsAroundProgress::new(MultiProgress::new());
        let mut writer = writers.make_writer();
        assert_eq!(writer.write(b"sfbulk: log line\n").unwrap(), 17);
        writer.flush().unwrap();
    }

    #[test]
    fn the_one_where_both_templates_at_once_is_refused() {
        let result = Args::try_parse_from([
            "sfbulk",
            "--sf-api-req-item-json-template",
            "{}",
            "--sf-api-req-item-json-template-file",
            "item.j2",
        ]);
        assert!(result.is_err());
    }
}
