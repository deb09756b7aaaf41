//! Error types for rh-db

use thiserror::Error;

/// Warehouse access errors
#[derive(Error, Debug)]
pub enum DbError {
    /// D001: Opening the warehouse failed
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// D002: Statement rejected by the warehouse
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// D003: Relation missing from the catalog
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// D004: Appending a batch failed
    #[error("[D004] Insert into '{table}' failed: {message}")]
    InsertError { table: String, message: String },

    /// D005: Row width differs from the insert column list
    #[error("[D005] Row for '{table}' has {actual} values, expected {expected}")]
    RowWidth {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// D006: A previous holder of the connection panicked
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error has no structured variants for catalog errors
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
