//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use rh_core::{Config, RunReport};
use rh_db::{Database, DuckDbBackend};
use rh_etl::{NoopObserver, Pipeline, PipelineObserver, RunMode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{GlobalArgs, LoadMode};
use crate::commands::progress::ProgressObserver;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Project root from the global arguments
pub(crate) fn project_root(global: &GlobalArgs) -> PathBuf {
    PathBuf::from(&global.project_dir)
}

/// Load `reelhouse.yml` from `--config` or the project directory
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    match &global.config {
        Some(path) => Config::load(Path::new(path)).context("Failed to load configuration file"),
        None => Config::load_from_dir(&project_root(global))
            .context("Failed to load project configuration"),
    }
}

/// Open the warehouse named by `--database`, `REELHOUSE_DB` or the config
pub(crate) fn open_database(config: &Config, global: &GlobalArgs) -> Result<Arc<dyn Database>> {
    let path = config.resolve_database_path(&project_root(global), global.database.as_deref());
    log::debug!("Opening warehouse at {}", path);
    let db = DuckDbBackend::new(&path)
        .with_context(|| format!("Failed to open warehouse database at {}", path))?;
    Ok(Arc::new(db))
}

/// Map the CLI mode flag onto a pipeline run mode
pub(crate) fn resolve_run_mode(
    mode: LoadMode,
    limit: Option<u64>,
    config: &Config,
) -> Result<RunMode> {
    if limit == Some(0) {
        anyhow::bail!("--limit must be greater than zero");
    }
    if limit.is_some() && mode != LoadMode::Test {
        log::warn!("--limit only applies to --mode test; ignoring it");
    }
    Ok(match mode {
        LoadMode::Full => RunMode::Full,
        LoadMode::Test => RunMode::Test {
            limit: limit.unwrap_or(config.test_limit),
        },
        LoadMode::TruncateOnly => RunMode::TruncateOnly,
        LoadMode::Validated => RunMode::Validated,
    })
}

/// Run the pipeline, print the report and turn a failed run into exit code 1
pub(crate) async fn run_pipeline(
    global: &GlobalArgs,
    mode: impl FnOnce(&Config) -> Result<RunMode>,
    report_json: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let config = load_config(global)?;
    let mode = mode(&config)?;
    let db = open_database(&config, global)?;
    let pipeline = Pipeline::new(config, project_root(global), db)
        .context("Failed to prepare the load pipeline")?;

    if !quiet {
        println!("Running {} load of '{}'\n", mode, pipeline.config().name);
    }

    let mut progress = ProgressObserver::default();
    let mut noop = NoopObserver;
    let observer: &mut dyn PipelineObserver = if quiet { &mut noop } else { &mut progress };
    let outcome = pipeline.run(mode, observer).await;

    println!();
    print_report(&outcome.report);

    if let Some(path) = report_json {
        outcome
            .report
            .save_json(Path::new(path))
            .with_context(|| format!("Failed to write run report to {}", path))?;
        println!("\nReport written to {}", path);
    }

    if let Err(err) = &outcome.result {
        eprintln!("\nLoad failed: {}", err);
        eprintln!("The warehouse is partially loaded; rerun a full load to recover.");
        return Err(ExitCode(1).into());
    }
    Ok(())
}

/// Print the per-table report followed by totals and any failure
pub(crate) fn print_report(report: &RunReport) {
    let (headers, rows) = report.table_rows();
    if rows.is_empty() {
        println!("No tables processed.");
    } else {
        print_table(&headers, &rows);
    }

    println!(
        "\nrun {} ({}): {} rows inserted, {} rows skipped",
        report.run_id,
        report.mode,
        report.total_inserted(),
        report.total_skipped()
    );

    for check in &report.integrity {
        println!(
            "  integrity {}.{} -> {}: {} dangling",
            check.table, check.column, check.references, check.dangling
        );
    }

    if let Some(failure) = &report.failure {
        let table = failure
            .table
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  failed at table {} after batch {}: {}",
            table, failure.last_committed_batch, failure.message
        );
    }
}

/// Calculate column widths for a text table
fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    widths
}

/// Print a left-aligned text table with a dashed separator
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);
    let line = |cells: Vec<String>| {
        let parts: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", parts.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row.clone());
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
