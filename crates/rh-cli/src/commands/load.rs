//! Load command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, LoadArgs};
use crate::commands::common::{resolve_run_mode, run_pipeline};

/// Truncate the warehouse and reload it from the source snapshots
pub async fn execute(args: &LoadArgs, global: &GlobalArgs) -> Result<()> {
    run_pipeline(
        global,
        |config| resolve_run_mode(args.mode, args.limit, config),
        args.report_json.as_deref(),
        args.quiet,
    )
    .await
}
