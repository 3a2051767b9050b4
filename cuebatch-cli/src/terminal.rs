// ============================================================================
// cuebatch-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Progress Rendering and Batch Summary
//
// The core library emits progress events through the ProgressSink trait and
// never draws anything itself. This module provides the two renderings the
// CLI offers:
//
// - ProgressBarSink: a single indicatif bar showing done/total and job rate
// - LogSink: one log line per event, used with --verbose so the bar does not
//   fight with debug output
//
// It also prints the final summary, either human readable or as JSON.

use anyhow::Result;
use console::style;
use cuebatch_core::batch::BatchSummary;
use cuebatch_core::progress::{ProgressEvent, ProgressSink, format_rate};
use cuebatch_core::utils::format_total_time;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} | Elapsed: {elapsed_precise} | Speed: {msg}";

// ============================================================================
// PROGRESS BAR
// ============================================================================

/// Renders batch progress as a single terminal progress bar.
#[derive(Debug, Clone)]
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Bar drawing to `target`; tests use a hidden target.
    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ "),
        );
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(0);
                self.bar.set_message(format_rate(None));
                self.bar.reset_elapsed();
            }
            ProgressEvent::JobStarted { .. } => {}
            ProgressEvent::Progress {
                completed, rate, ..
            } => {
                self.bar.set_position(completed as u64);
                self.bar.set_message(format_rate(rate));
            }
            ProgressEvent::JobFailed { job, message } => {
                self.bar.suspend(|| {
                    warn!("{} {}: {}", style("✗").red(), job, message);
                });
            }
            ProgressEvent::BatchFinished { .. } => self.bar.finish(),
        }
    }
}

// ============================================================================
// LOG LINES
// ============================================================================

/// Renders batch progress as log lines.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total } => info!("Starting batch of {} job(s)", total),
            ProgressEvent::JobStarted { job } => debug!("Started {}", job),
            ProgressEvent::Progress {
                completed,
                total,
                rate,
            } => info!("Progress: {}/{} ({})", completed, total, format_rate(rate)),
            ProgressEvent::JobFailed { job, message } => warn!("Job {} failed: {}", job, message),
            ProgressEvent::BatchFinished {
                completed,
                total,
                elapsed,
            } => info!(
                "Finished {}/{} job(s) in {}",
                completed,
                total,
                format_total_time(elapsed)
            ),
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Renders the human-readable summary lines.
///
/// Failed jobs were already reported as warnings while the batch ran; once
/// every job has completed the batch counts as done.
pub fn summary_lines(summary: &BatchSummary) -> Vec<String> {
    if !summary.failed.is_empty() {
        debug!(
            "{} of {} job(s) reported failures: {}",
            summary.failed.len(),
            summary.total,
            summary.failed.join(", ")
        );
    }
    vec![
        style("Successfully").green().to_string(),
        format!(
            "Total execution time: {}",
            format_total_time(summary.elapsed)
        ),
    ]
}

/// Prints the summary to stdout, as JSON when `json` is set.
pub fn print_summary(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        for line in summary_lines(summary) {
            println!("{line}");
        }
    }
    Ok(())
}
