//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use rh_core::{Row, Value};

/// Outcome of a request to toggle foreign-key enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintToggle {
    /// The engine changed its enforcement mode
    Applied,
    /// The engine cannot change enforcement for this session
    Unsupported,
}

/// Database abstraction trait for Reelhouse
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Run a query and return its first `width` columns
    async fn query_rows(&self, sql: &str, width: usize) -> DbResult<Vec<Vec<Value>>>;

    /// Remove every row from a table
    async fn truncate(&self, table: &str) -> DbResult<()>;

    /// Turn foreign-key enforcement on or off for this session
    async fn set_constraint_checks(&self, enabled: bool) -> DbResult<ConstraintToggle>;

    /// Insert rows in a single transaction, returns rows inserted.
    ///
    /// Either every row is committed or none is.
    async fn insert_batch(&self, table: &str, columns: &[&str], rows: &[Row]) -> DbResult<usize>;

    /// Flush written data to durable storage
    async fn checkpoint(&self) -> DbResult<()>;

    /// Count non-null values of `table.column` with no matching
    /// `ref_table.ref_column`
    async fn count_dangling(
        &self,
        table: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> DbResult<u64>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Quote an identifier for SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
