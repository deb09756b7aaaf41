//! Truncate command implementation

use anyhow::Result;
use rh_etl::RunMode;

use crate::cli::{GlobalArgs, TruncateArgs};
use crate::commands::common::run_pipeline;

/// Empty every warehouse table, referencing tables first
pub async fn execute(args: &TruncateArgs, global: &GlobalArgs) -> Result<()> {
    run_pipeline(
        global,
        |_| Ok(RunMode::TruncateOnly),
        args.report_json.as_deref(),
        false,
    )
    .await
}
