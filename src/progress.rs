//! # Progress Display and Statistics Module
//!
//! Questo modulo gestisce il feedback visivo nella CLI e le statistiche di batch.
//!
//! ## Componenti principali:
//! - `ProgressManager`: spinner `indicatif` che mostra l'ultima riga dell'engine
//! - `BatchStats`: statistiche cumulative quando si comprime una directory intera
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:01:12] holiday.mov frame= 1450 fps= 48 q=30.0 size= 9216kB time=00:00:48.33
//! ```

use crate::file_manager::FileManager;
use crate::report::CompressionResult;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner showing the live engine output of one session
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(prefix: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        // a template error just leaves the default style in place
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {wide_msg}") {
            bar.set_style(style);
        }

        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Show a new line without scrolling
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Print a line above the spinner
    pub fn println(&self, message: &str) {
        self.bar.println(message);
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics over several sessions
#[derive(Debug, Default)]
pub struct BatchStats {
    pub sessions: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, result: &CompressionResult) {
        self.sessions += 1;
        self.succeeded += 1;
        self.total_original_size += result.original_size_bytes;
        self.total_compressed_size += result.compressed_size_bytes;
    }

    pub fn add_failure(&mut self) {
        self.sessions += 1;
        self.failed += 1;
    }

    pub fn overall(&self) -> CompressionResult {
        CompressionResult::new(self.total_original_size, self.total_compressed_size)
    }

    pub fn format_summary(&self) -> String {
        let overall = self.overall();
        format!(
            "Videos: {} | Compressed: {} | Failed: {} | Total saved: {} ({}%)",
            self.sessions,
            self.succeeded,
            self.failed,
            FileManager::format_size(overall.bytes_saved()),
            overall.savings_percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_stats() {
        let mut stats = BatchStats::new();
        stats.add_success(&CompressionResult::new(1000, 400));
        stats.add_success(&CompressionResult::new(1000, 600));
        stats.add_failure();

        assert_eq!(stats.sessions, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.overall().savings_percent, 50);
        assert!(stats.format_summary().contains("Failed: 1"));
    }

    #[test]
    fn test_empty_batch() {
        let stats = BatchStats::new();
        assert_eq!(stats.overall().savings_percent, 0);
    }
}
