//! rh-core - Core library for Reelhouse
//!
//! This crate provides the types shared by every Reelhouse component: the
//! `reelhouse.yml` configuration, the source file layouts, the destination
//! warehouse contract and its dependency DAG, typed values and records,
//! time-dimension derivation, and run reporting.

pub mod checksum;
pub mod config;
pub mod dag;
pub mod error;
pub mod record;
pub mod report;
pub mod run_state;
pub mod schema;
pub mod source;
pub mod table_name;
pub mod time;
pub mod value;

pub use checksum::{compute_checksum, compute_checksum_lines};
pub use config::{Config, Strictness, DATABASE_ENV_VAR};
pub use dag::TableDag;
pub use error::{CoreError, CoreResult};
pub use record::{ColumnDef, Record, RecordShape};
pub use report::{FailureSummary, IntegrityCheck, RunReport, SkipReason, TableStats, TableStatus};
pub use run_state::{RunState, RunStatus};
pub use schema::{ColumnSpec, ForeignKey, Requirement, TableKind, TableSpec, WarehouseContract};
pub use source::SourceId;
pub use table_name::TableName;
pub use time::{TimeAttributes, YearWindow};
pub use value::{ColumnType, Row, Value, ValueParseError};
