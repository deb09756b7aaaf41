//! Error types for rh-etl

use crate::load::LoadPhase;
use rh_core::CoreError;
use rh_db::DbError;
use thiserror::Error;

/// Source file errors. All of them abort the run.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// X001: Source file does not exist
    #[error("[X001] Source file not found: {path}")]
    NotFound { path: String },

    /// X002: IO or gzip decompression failure
    #[error("[X002] Failed to read '{path}': {message}")]
    Read { path: String, message: String },

    /// X003: Header row differs from the expected layout
    #[error("[X003] Header of '{path}' does not match: expected [{expected}], found [{found}]")]
    HeaderMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

/// Key registry misuse
#[derive(Error, Debug)]
pub enum RegistryError {
    /// K001: Insertion after the registry was frozen
    #[error("[K001] Key registry for '{table}' is frozen; cannot assign a key to '{natural}'")]
    Frozen { table: String, natural: String },

    /// K002: Lookup before the registry was frozen
    #[error("[K002] Key registry for '{table}' is still being populated; '{table}' must finish loading first")]
    NotFrozen { table: String },

    /// K003: No registry for the table
    #[error("[K003] No key registry for table '{table}'")]
    Unknown { table: String },
}

/// Loader failures
#[derive(Error, Debug)]
pub enum LoadError {
    /// L001: Phase change not allowed from the current phase
    #[error("[L001] Illegal loader transition: {from} -> {to}")]
    IllegalTransition { from: LoadPhase, to: LoadPhase },

    /// L002: Destination write failed
    #[error("[L002] Loading '{table}' failed after batch {last_committed_batch}: {source}")]
    Destination {
        table: String,
        last_committed_batch: u64,
        source: DbError,
    },

    /// L003: Truncation failed
    #[error("[L003] Truncating '{table}' failed: {source}")]
    Truncate { table: String, source: DbError },

    /// L004: Destination table missing
    #[error("[L004] Warehouse table '{table}' does not exist; the warehouse schema must be created before loading")]
    MissingTable { table: String },

    /// L005: Dangling references found by the integrity probe
    #[error("[L005] Integrity check found {count} dangling references: {details}")]
    DanglingReferences { count: u64, details: String },
}

/// Top-level ETL error
#[derive(Error, Debug)]
pub enum EtlError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// T001: No transform exists for a contract table
    #[error("[T001] No transform for warehouse table '{table}'")]
    NoTransform { table: String },

    /// T002: Transform refers to a foreign key the contract does not declare
    #[error("[T002] Table '{table}' declares no foreign key '{column}'")]
    UnknownForeignKey { table: String, column: String },
}

impl EtlError {
    /// Last committed batch, for destination failures
    pub fn last_committed_batch(&self) -> Option<u64> {
        match self {
            EtlError::Load(LoadError::Destination {
                last_committed_batch,
                ..
            }) => Some(*last_committed_batch),
            _ => None,
        }
    }
}

/// Result type alias for EtlError
pub type EtlResult<T> = Result<T, EtlError>;
