//! Error types for rh-core

use thiserror::Error;

/// Core error type for Reelhouse
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Invalid configuration value
    #[error("[E002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E003: Project directory not found
    #[error("[E003] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E004: Table is not part of the warehouse contract
    #[error("[E004] Unknown warehouse table: {name}")]
    UnknownTable { name: String },

    /// E005: Foreign key points at a table outside the contract
    #[error("[E005] Table '{table}' references unknown table '{references}'")]
    DanglingContractReference { table: String, references: String },

    /// E006: Circular dependency between warehouse tables
    #[error("[E006] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E007: Load order breaks the dimension → bridge → fact sequence
    #[error("[E007] Table '{table}' ({kind}) cannot load after a {previous} table")]
    PhaseOrder {
        table: String,
        kind: String,
        previous: String,
    },

    /// E008: IO error
    #[error("[E008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E009: IO error with file path context
    #[error("[E009] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E010: YAML parse error
    #[error("[E010] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
