//! Plan command implementation

use anyhow::{Context, Result};
use rh_core::{Config, WarehouseContract};
use rh_etl::{JobInput, LoadPlan, TableJob};
use std::path::Path;

use crate::cli::{GlobalArgs, OutputFormat, PlanArgs};
use crate::commands::common::{self, print_table, resolve_run_mode};

/// Print the truncate and load order without opening the warehouse
pub async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let root = common::project_root(global);
    let mode = resolve_run_mode(args.mode, None, &config)?;
    let contract = WarehouseContract::catalog().context("Invalid warehouse contract")?;
    let plan = LoadPlan::build(&contract, &config, mode).context("Failed to build load plan")?;

    match args.output {
        OutputFormat::Json => {
            let jobs: Vec<serde_json::Value> = plan
                .jobs
                .iter()
                .map(|job| {
                    serde_json::json!({
                        "table": job.spec.name,
                        "kind": job.spec.kind.to_string(),
                        "input": job.input.label(),
                        "file": source_file(job, &config, &root),
                    })
                })
                .collect();
            let payload = serde_json::json!({
                "mode": mode.to_string(),
                "truncate": plan.truncate,
                "load": jobs,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => print_plan(&plan, &config, &root),
    }
    Ok(())
}

/// Path of the job's source file, or the year span for generated input
fn source_file(job: &TableJob, config: &Config, root: &Path) -> String {
    match &job.input {
        JobInput::Source(source) => config.source_path(root, *source).display().to_string(),
        JobInput::YearWindow {
            window,
            extra_years,
        } => {
            if extra_years.is_empty() {
                format!("{}..={}", window.min, window.max)
            } else {
                format!(
                    "{}..={} (+{} extra)",
                    window.min,
                    window.max,
                    extra_years.len()
                )
            }
        }
    }
}

fn print_plan(plan: &LoadPlan, config: &Config, root: &Path) {
    println!("Mode: {}\n", plan.mode);

    println!("Truncate order:");
    for (i, table) in plan.truncate.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, table);
    }

    if plan.jobs.is_empty() {
        println!("\nNo tables to load.");
        return;
    }

    println!("\nLoad order:");
    let rows: Vec<Vec<String>> = plan
        .jobs
        .iter()
        .enumerate()
        .map(|(i, job)| {
            let present = match job.input {
                JobInput::Source(source) => {
                    if config.source_path(root, source).is_file() {
                        "yes"
                    } else {
                        "MISSING"
                    }
                }
                JobInput::YearWindow { .. } => "-",
            };
            vec![
                (i + 1).to_string(),
                job.spec.name.to_string(),
                job.spec.kind.to_string(),
                job.input.label(),
                source_file(job, config, root),
                present.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "TABLE", "KIND", "INPUT", "FILE", "PRESENT"], &rows);
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
