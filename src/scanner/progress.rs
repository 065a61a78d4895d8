//! Scan progress output

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use tracing::info;

use crate::core::Verdict;

/// In quiet mode a progress line is logged once per this many verdicts.
pub const QUIET_PROGRESS_INTERVAL: usize = 100;

/// Whether the `processed`-th verdict gets its own log line.
pub fn should_log(processed: usize, verbose: bool) -> bool {
    verbose || processed % QUIET_PROGRESS_INTERVAL == 0
}

/// Progress bar plus progress log lines.
///
/// The bar is drawn only for verbose runs on a terminal; log lines are always
/// emitted and are printed through the bar so they do not tear it.
pub struct Progress {
    bar: ProgressBar,
    total: usize,
    verbose: bool,
}

impl Progress {
    pub fn new(total: usize, verbose: bool) -> Self {
        let bar = if verbose && std::io::stderr().is_terminal() {
            let pb = ProgressBar::new(total as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { bar, total, verbose }
    }

    /// Note that `verdict` arrived as the `processed`-th of the run.
    pub fn record(&self, processed: usize, verdict: &Verdict) {
        self.bar.inc(1);
        if !should_log(processed, self.verbose) {
            return;
        }

        let total = self.total;
        self.bar.suspend(|| {
            if self.verbose {
                match &verdict.error {
                    None => info!("[{}/{}] {}", processed, total, verdict.path.display()),
                    Some(error) => info!("[{}/{}] {} - {}", processed, total, verdict.path.display(), error),
                }
            } else {
                let percent = processed as f64 / total.max(1) as f64 * 100.0;
                info!("Progress: {}/{} ({:.1}%)", processed, total, percent);
            }
        });
    }

    pub fn finish(&self, message: &'static str) {
        self.bar.finish_with_message(message);
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
