//! Status command implementation

use anyhow::{Context, Result};
use rh_core::{Config, RunState};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{self, print_table, ExitCode};

/// Show the last run-state marker. Exits 1 when the warehouse is untrusted.
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let path = config.run_state_path(&common::project_root(global));
    let state = RunState::load(&path)
        .with_context(|| format!("Failed to read run state from {}", path.display()))?;

    let Some(state) = state else {
        match args.output {
            OutputFormat::Json => println!("{}", serde_json::json!({ "state": null })),
            OutputFormat::Text => println!("No load has been recorded for this project."),
        }
        return Ok(());
    };

    let config_changed = config_changed(&config, &state);
    match args.output {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "trusted": state.trusted(),
                "config_changed": config_changed,
                "state": state,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => print_state(&state, config_changed),
    }

    if !state.trusted() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn config_changed(config: &Config, state: &RunState) -> bool {
    match config.checksum() {
        Ok(hash) => hash != state.config_hash,
        Err(e) => {
            log::warn!("Could not hash configuration: {}", e);
            false
        }
    }
}

fn print_state(state: &RunState, config_changed: bool) {
    println!("Run:          {}", state.run_id);
    println!("Mode:         {}", state.mode);
    println!("Status:       {}", state.status);
    println!(
        "Started:      {}",
        state.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Last update:  {}",
        state.last_updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if config_changed {
        println!("Config:       changed since this run");
    }
    println!();

    let trusted = if state.trusted() { "yes" } else { "no" };
    let rows: Vec<Vec<String>> = state
        .completed_tables
        .iter()
        .map(|t| {
            vec![
                t.name.to_string(),
                t.inserted.to_string(),
                t.duration_ms.to_string(),
                trusted.to_string(),
            ]
        })
        .collect();
    if rows.is_empty() {
        println!("No tables loaded.");
    } else {
        print_table(&["TABLE", "INSERTED", "DURATION_MS", "TRUSTED"], &rows);
    }

    if !state.truncated_tables.is_empty() && state.completed_tables.is_empty() {
        println!("{} tables truncated.", state.truncated_tables.len());
    }

    if let Some(failure) = &state.failure {
        let table = failure
            .name
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "\nFailed at table {} after batch {}: {}",
            table, failure.last_committed_batch, failure.error
        );
    }

    if !state.trusted() {
        println!("\nThe warehouse is not trusted. Run a full load to recover.");
    }
}
