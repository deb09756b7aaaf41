//! Terminal progress for pipeline runs

use indicatif::{ProgressBar, ProgressStyle};
use rh_core::{TableName, TableStats, TableStatus};
use rh_etl::{LoadPhase, PipelineObserver};
use std::time::Duration;

/// One spinner per table, replaced by a summary line when the table ends
#[derive(Default)]
pub(crate) struct ProgressObserver {
    spinner: Option<ProgressBar>,
}

impl ProgressObserver {
    fn spinner(label: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(label);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

impl PipelineObserver for ProgressObserver {
    fn phase_started(&mut self, phase: LoadPhase) {
        println!("==> {}", phase);
    }

    fn table_started(&mut self, table: &TableName, source: &str) {
        self.spinner = Some(Self::spinner(format!("{} <- {}", table, source)));
    }

    fn rows_progress(&mut self, _table: &TableName, rows_read: u64) {
        if let Some(pb) = &self.spinner {
            pb.set_message(format!("{} rows read", rows_read));
        }
    }

    fn table_finished(&mut self, stats: &TableStats) {
        let summary = format!(
            "{} inserted, {} skipped ({}, {} ms)",
            stats.inserted,
            stats.skipped(),
            stats.status,
            stats.duration_ms
        );
        match self.spinner.take() {
            Some(pb) if stats.status == TableStatus::Failed => pb.abandon_with_message(summary),
            Some(pb) => pb.finish_with_message(summary),
            None => println!("  {} {}", stats.table, summary),
        }
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.abandon();
        }
    }
}
