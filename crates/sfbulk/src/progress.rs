//! 📊 progress.rs — "Are we there yet?" — every pipeline, every time, forever.
//!
//! We don't know how many rows the source holds (a CSV doesn't announce its length,
//! it just keeps going), so instead of a bar we spin, and next to the spinner we keep
//! a small comfy table of rows read, batches sent, and the score so far.
//!
//! ⚠️  Watching the spinner will not make Salesforce answer faster. Science says no.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::delivery::{BatchOutcome, DeliveryReport};

/// 🔢 Formats a number with commas for the 3 people in the audience who like readability.
/// "1000000 rows" → "1,000,000 rows" — you're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, you should probably call your mom. It's been a while.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Live counters for one run, drawn next to a spinner.
///
/// Rates use a sliding 5-second window so one slow batch doesn't make the
/// rows/s figure look like a seismograph.
pub struct ProgressMetrics {
    /// 🏷️ what are we loading? shown on the first line
    label: String,
    rows_read: u64,
    batches_sent: u64,
    records_succeeded: u64,
    records_failed: u64,
    progress_bar: ProgressBar,
    /// 🔄 (timestamp, rows) samples for the rows/s figure
    rate_samples: VecDeque<(Instant, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("rows_read", &self.rows_read)
            .field("batches_sent", &self.batches_sent)
            .field("records_succeeded", &self.records_succeeded)
            .field("records_failed", &self.records_failed)
            .finish()
    }
}

impl ProgressMetrics {
    /// 🚀 A visible spinner on stderr, drawn through `multi`. Anything else printing to the
    /// terminal goes through `multi.suspend(..)` so the two don't shred each other's lines.
    /// indicatif stays quiet by itself when stderr is not a terminal.
    pub fn new_in(label: impl Into<String>, multi: &MultiProgress) -> Self {
        let progress_bar = multi.add(ProgressBar::new_spinner());
        progress_bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(label.into(), progress_bar)
    }

    /// 🙈 Counts everything, draws nothing. The library default.
    pub fn hidden(label: impl Into<String>) -> Self {
        Self::with_bar(label.into(), ProgressBar::hidden())
    }

    fn with_bar(label: String, progress_bar: ProgressBar) -> Self {
        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        // -- 🔄 seed the window with t=0 so we don't divide by zero like animals
        rate_samples.push_back((start_time, 0u64));
        Self {
            label,
            rows_read: 0,
            batches_sent: 0,
            records_succeeded: 0,
            records_failed: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    pub(crate) fn row_read(&mut self) {
        self.rows_read += 1;
        self.render();
    }

    pub(crate) fn batch_finished(&mut self, batch_len: usize, outcome: &BatchOutcome) {
        self.batches_sent += 1;
        match outcome {
            BatchOutcome::Delivered {
                succeeded,
                failures,
                ..
            } => {
                self.records_succeeded += *succeeded as u64;
                self.records_failed += failures.len() as u64;
            }
            BatchOutcome::Rejected { .. } | BatchOutcome::TransportFailed { .. } => {
                self.records_failed += batch_len as u64;
            }
            BatchOutcome::DryRun { .. } | BatchOutcome::Empty => {}
        }
        self.render();
    }

    /// ✅ Stop spinning. Ring the bell. We made it.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn rows_per_sec(&mut self) -> f64 {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.rows_read));

        match self.rate_samples.front() {
            Some(&(oldest_time, oldest_rows)) => {
                let elapsed = now.duration_since(oldest_time).as_secs_f64();
                if elapsed > 0.0 {
                    self.rows_read.saturating_sub(oldest_rows) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    fn render(&mut self) {
        if self.progress_bar.is_hidden() {
            return;
        }
        let rate = self.rows_per_sec();

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} Rows/s", format_number(rate as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Rows", format_number(self.rows_read)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} Batches", format_number(self.batches_sent)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{} ok / {} failed",
                format_number(self.records_succeeded),
                format_number(self.records_failed)
            ))
            .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(self.elapsed())))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);

        self.progress_bar
            .set_message(format!("object: {}\n{}", self.label, table));
    }
}

/// 🍽️ The end-of-run summary table. Printed by the CLI, handy anywhere else.
pub fn report_table(report: &DeliveryReport, elapsed: Duration) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "count"]);

    let rows: [(&str, u64); 8] = [
        ("rows read", report.rows_read),
        ("batches submitted", report.batches_submitted),
        ("dry-run batches", report.dry_run_batches),
        ("records submitted", report.records_submitted),
        ("records succeeded", report.records_succeeded),
        ("records failed", report.records_failed),
        ("transport failures", report.transport_failures),
        ("unexpected responses", report.unexpected_responses),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format_number(value)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("elapsed"),
        Cell::new(format_duration(elapsed)).set_alignment(CellAlignment::Right),
    ]);
    table
}
