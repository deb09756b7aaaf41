//! Run-state marker
//!
//! Written to `target/run_state.json` when a run starts, after every table,
//! and when the run ends. A marker left at `running` or `failed` means the
//! warehouse is partially loaded and must not be trusted until a full rerun.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::table_name::TableName;

/// Progress of the latest run against the warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Short random id, also used in the run report
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    pub last_updated_at: DateTime<Utc>,

    pub status: RunStatus,

    /// Run mode (full, test, truncate-only, validated)
    pub mode: String,

    /// Tables fully loaded by this run
    pub completed_tables: Vec<CompletedTable>,

    /// Tables truncated by this run
    #[serde(default)]
    pub truncated_tables: Vec<TableName>,

    /// Where the run stopped, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailedTable>,

    /// SHA-256 of the effective configuration
    pub config_hash: String,
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Started and not finished; also what a killed run leaves behind
    Running,
    Completed,
    Failed,
}

/// A table that loaded successfully
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTable {
    pub name: TableName,
    pub completed_at: DateTime<Utc>,
    pub inserted: u64,
    pub duration_ms: u64,
}

/// The table a failed run stopped at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<TableName>,
    pub failed_at: DateTime<Utc>,
    pub last_committed_batch: u64,
    pub error: String,
}

impl RunState {
    /// Marker for a run that is about to truncate the warehouse
    pub fn new(mode: impl Into<String>, config_hash: String) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            started_at: now,
            last_updated_at: now,
            status: RunStatus::Running,
            mode: mode.into(),
            completed_tables: Vec::new(),
            truncated_tables: Vec::new(),
            failure: None,
            config_hash,
        }
    }

    /// Read the marker; `None` when no run has ever started
    pub fn load(path: &Path) -> CoreResult<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CoreError::IoWithPath {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Replace the marker through a temp file and rename
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let io_err = |source: std::io::Error| CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let staged = path.with_extension("json.tmp");
        fs::write(&staged, serde_json::to_vec_pretty(self)?).map_err(io_err)?;
        fs::rename(&staged, path).map_err(io_err)
    }

    fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    pub fn mark_truncated(&mut self, name: &TableName) {
        self.truncated_tables.push(name.clone());
        self.touch();
    }

    /// Record a table whose rows are all committed
    pub fn mark_completed(&mut self, name: &TableName, inserted: u64, duration_ms: u64) {
        self.completed_tables.push(CompletedTable {
            name: name.clone(),
            completed_at: Utc::now(),
            inserted,
            duration_ms,
        });
        self.touch();
    }

    pub fn mark_failed(&mut self, name: Option<&TableName>, last_committed_batch: u64, error: &str) {
        self.status = RunStatus::Failed;
        self.failure = Some(FailedTable {
            name: name.cloned(),
            failed_at: Utc::now(),
            last_committed_batch,
            error: error.to_string(),
        });
        self.touch();
    }

    pub fn mark_run_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.touch();
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed_tables.iter().any(|t| t.name == name)
    }

    /// Whether the warehouse contents can be trusted.
    ///
    /// Only a completed run that is not truncate-only leaves trusted tables.
    pub fn trusted(&self) -> bool {
        self.status == RunStatus::Completed && self.mode != "truncate-only"
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        })
    }
}

#[cfg(test)]
#[path = "run_state_test.rs"]
mod tests;
