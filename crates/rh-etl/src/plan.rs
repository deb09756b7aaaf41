//! Run modes and the per-run load plan

use crate::error::EtlResult;
use rh_core::{Config, SourceId, TableName, TableSpec, WarehouseContract, YearWindow};
use std::fmt;

/// How a run treats the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Truncate and load every table from the full sources
    Full,
    /// Like `Full`, reading at most `limit` data rows per source
    Test { limit: u64 },
    /// Truncate every table and stop
    TruncateOnly,
    /// Full load with constraints left on and a dangling-reference probe
    Validated,
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Full => "full",
            RunMode::Test { .. } => "test",
            RunMode::TruncateOnly => "truncate-only",
            RunMode::Validated => "validated",
        }
    }

    /// Per-source cap on data rows read
    pub fn row_limit(&self) -> Option<u64> {
        match self {
            RunMode::Test { limit } => Some(*limit),
            _ => None,
        }
    }

    /// `false` for runs that only truncate
    pub fn loads(&self) -> bool {
        !matches!(self, RunMode::TruncateOnly)
    }

    /// Whether the loader asks the store to suspend foreign-key checks
    pub fn disables_constraints(&self) -> bool {
        !matches!(self, RunMode::Validated)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Test { limit } => write!(f, "test (limit {})", limit),
            other => f.write_str(other.name()),
        }
    }
}

/// Where a table's records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    Source(SourceId),
    /// Generated from the year window plus any extra years
    YearWindow {
        window: YearWindow,
        extra_years: Vec<i64>,
    },
}

impl JobInput {
    pub fn label(&self) -> String {
        match self {
            JobInput::Source(source) => source.to_string(),
            JobInput::YearWindow { .. } => "year window".to_string(),
        }
    }

    /// Years a generated input produces, window first, in order
    pub fn years(&self) -> Vec<i64> {
        match self {
            JobInput::Source(_) => Vec::new(),
            JobInput::YearWindow {
                window,
                extra_years,
            } => window
                .years()
                .map(i64::from)
                .chain(extra_years.iter().copied())
                .collect(),
        }
    }
}

/// One table to load
#[derive(Debug, Clone)]
pub struct TableJob {
    pub spec: TableSpec,
    pub input: JobInput,
}

/// Everything a run will do, in order
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub mode: RunMode,
    /// Tables to empty, referencing tables first
    pub truncate: Vec<TableName>,
    /// Tables to load, referenced tables first
    pub jobs: Vec<TableJob>,
}

impl LoadPlan {
    pub fn build(contract: &WarehouseContract, config: &Config, mode: RunMode) -> EtlResult<Self> {
        let truncate = contract
            .truncate_order()?
            .into_iter()
            .map(|spec| spec.name.clone())
            .collect();

        let jobs = if mode.loads() {
            contract
                .load_order()?
                .into_iter()
                .map(|spec| TableJob {
                    spec: spec.clone(),
                    input: match spec.source {
                        Some(source) => JobInput::Source(source),
                        None => JobInput::YearWindow {
                            window: config.year_window(),
                            extra_years: config.time.extra_years.clone(),
                        },
                    },
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            mode,
            truncate,
            jobs,
        })
    }

    /// Source files the plan reads, in first-use order
    pub fn sources(&self) -> Vec<SourceId> {
        let mut sources = Vec::new();
        for job in &self.jobs {
            if let JobInput::Source(source) = job.input {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }
        sources
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
