//! Progress reporting for imports

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Progress after one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportProgress {
    /// 1-based ordinal of the record just read
    pub position: usize,
    /// Total records in the input
    pub length: usize,
    /// `position / length` as a percentage
    pub percent: f64,
    /// Short description of the record
    pub message: String,
    /// True when the record was skipped rather than imported
    pub skipped: bool,
}

impl ImportProgress {
    pub fn new(position: usize, length: usize, message: impl Into<String>, skipped: bool) -> Self {
        let percent = if length == 0 {
            0.0
        } else {
            position as f64 * 100.0 / length as f64
        };
        Self {
            position,
            length,
            percent,
            message: message.into(),
            skipped,
        }
    }
}

/// Receives progress once per record read.
pub trait ProgressSink {
    fn report(&mut self, progress: &ImportProgress);
}

impl<F: FnMut(&ImportProgress)> ProgressSink for F {
    fn report(&mut self, progress: &ImportProgress) {
        self(progress)
    }
}

/// Terminal progress bar
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(length: usize) -> Self {
        let bar = ProgressBar::new(length as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

impl ProgressSink for BarProgress {
    fn report(&mut self, progress: &ImportProgress) {
        self.bar.set_position(progress.position as u64);

        // Truncated safely for UTF-8
        let message = if progress.message.chars().count() > 40 {
            let truncated: String = progress.message.chars().take(37).collect();
            format!("{}...", truncated)
        } else {
            progress.message.clone()
        };
        if progress.skipped {
            self.bar.set_message(format!("skip {}", message));
        } else {
            self.bar.set_message(message);
        }
    }
}
