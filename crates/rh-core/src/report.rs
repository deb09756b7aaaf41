//! Run report: per-table counts of rows read, inserted and skipped
//!
//! The report is produced for every run, including failed ones, where it
//! covers the completed tables plus the partial counts of the failing table.

use crate::error::CoreResult;
use crate::table_name::TableName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Why a source row produced no destination row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Wrong field count, undecodable bytes, or a required field missing
    Malformed,
    /// A mandatory foreign key did not resolve
    UnresolvedReference,
    /// Natural key or bridge composite already seen
    DuplicateKey,
    /// A value outside the accepted range, such as a start year
    OutOfRange,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed => write!(f, "malformed"),
            SkipReason::UnresolvedReference => write!(f, "unresolved reference"),
            SkipReason::DuplicateKey => write!(f, "duplicate key"),
            SkipReason::OutOfRange => write!(f, "out of range"),
        }
    }
}

/// Outcome of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Loaded,
    Failed,
    Truncated,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Loaded => write!(f, "loaded"),
            TableStatus::Failed => write!(f, "failed"),
            TableStatus::Truncated => write!(f, "truncated"),
        }
    }
}

/// Counts for one destination table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub table: TableName,
    /// Source file name, or the generator for generated tables
    pub source: String,
    /// Source rows read
    pub read: u64,
    /// Destination rows inserted
    pub inserted: u64,
    pub malformed: u64,
    pub unresolved: u64,
    pub duplicate: u64,
    pub out_of_range: u64,
    /// Insert transactions committed
    pub batches_committed: u64,
    pub status: TableStatus,
    pub duration_ms: u64,
    /// Digest of the table's key registry once frozen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_digest: Option<String>,
}

impl TableStats {
    pub fn new(table: TableName, source: impl Into<String>) -> Self {
        Self {
            table,
            source: source.into(),
            read: 0,
            inserted: 0,
            malformed: 0,
            unresolved: 0,
            duplicate: 0,
            out_of_range: 0,
            batches_committed: 0,
            status: TableStatus::Loaded,
            duration_ms: 0,
            key_digest: None,
        }
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        self.record_skips(reason, 1);
    }

    pub fn record_skips(&mut self, reason: SkipReason, count: u64) {
        match reason {
            SkipReason::Malformed => self.malformed += count,
            SkipReason::UnresolvedReference => self.unresolved += count,
            SkipReason::DuplicateKey => self.duplicate += count,
            SkipReason::OutOfRange => self.out_of_range += count,
        }
    }

    /// Count for one reason
    pub fn skipped_for(&self, reason: SkipReason) -> u64 {
        match reason {
            SkipReason::Malformed => self.malformed,
            SkipReason::UnresolvedReference => self.unresolved,
            SkipReason::DuplicateKey => self.duplicate,
            SkipReason::OutOfRange => self.out_of_range,
        }
    }

    /// Total skips across all reasons
    pub fn skipped(&self) -> u64 {
        self.malformed + self.unresolved + self.duplicate + self.out_of_range
    }
}

/// Where a failed run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableName>,
    /// Last insert batch committed for the failing table, 0 if none
    pub last_committed_batch: u64,
    pub message: String,
}

/// Result of one dangling-reference probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub table: TableName,
    pub column: String,
    pub references: TableName,
    pub dangling: u64,
}

/// Report of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub tables: Vec<TableStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrity: Vec<IntegrityCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            mode: mode.into(),
            started_at: Utc::now(),
            finished_at: None,
            tables: Vec::new(),
            integrity: Vec::new(),
            failure: None,
        }
    }

    pub fn push(&mut self, stats: TableStats) {
        self.tables.push(stats);
    }

    pub fn table(&self, name: &str) -> Option<&TableStats> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, table: Option<TableName>, last_committed_batch: u64, message: String) {
        self.failure = Some(FailureSummary {
            table,
            last_committed_batch,
            message,
        });
        self.finish();
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn total_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.tables.iter().map(|t| t.skipped()).sum()
    }

    /// Header and rows for a text table
    pub fn table_rows(&self) -> (Vec<&'static str>, Vec<Vec<String>>) {
        let headers = vec![
            "TABLE",
            "SOURCE",
            "READ",
            "INSERTED",
            "MALFORMED",
            "UNRESOLVED",
            "DUPLICATE",
            "OUT_OF_RANGE",
            "STATUS",
        ];
        let rows = self
            .tables
            .iter()
            .map(|t| {
                vec![
                    t.table.to_string(),
                    t.source.clone(),
                    t.read.to_string(),
                    t.inserted.to_string(),
                    t.malformed.to_string(),
                    t.unresolved.to_string(),
                    t.duplicate.to_string(),
                    t.out_of_range.to_string(),
                    t.status.to_string(),
                ]
            })
            .collect();
        (headers, rows)
    }

    /// Write the report as pretty JSON
    pub fn save_json(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
