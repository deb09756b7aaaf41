//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{quote_ident, ConstraintToggle, Database};
use async_trait::async_trait;
use duckdb::types::Value as SqlValue;
use duckdb::{params, params_from_iter, Connection};
use rh_core::{Row, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count as usize)
    }

    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;

        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }

    fn query_rows_sync(&self, sql: &str, width: usize) -> DbResult<Vec<Vec<Value>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_iter().map(from_sql_value).collect());
        }
        Ok(out)
    }

    fn insert_batch_sync(&self, table: &str, columns: &[&str], rows: &[Row]) -> DbResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let insert_err = |e: duckdb::Error| DbError::InsertError {
            table: table.to_string(),
            message: e.to_string(),
        };

        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            column_list,
            placeholders
        );

        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls it back
        let tx = conn.transaction().map_err(insert_err)?;
        {
            let mut stmt = tx.prepare(&sql).map_err(insert_err)?;
            for row in rows {
                if row.len() != columns.len() {
                    return Err(DbError::RowWidth {
                        table: table.to_string(),
                        expected: columns.len(),
                        actual: row.len(),
                    });
                }
                stmt.execute(params_from_iter(row.iter().map(to_sql_value)))
                    .map_err(insert_err)?;
            }
        }
        tx.commit().map_err(insert_err)?;

        Ok(rows.len())
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Absent => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Int(i) => SqlValue::BigInt(*i),
        Value::Float(f) => SqlValue::Double(*f),
        Value::Bool(b) => SqlValue::Boolean(*b),
    }
}

fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Absent,
        SqlValue::Boolean(b) => Value::Bool(b),
        SqlValue::TinyInt(i) => Value::Int(i64::from(i)),
        SqlValue::SmallInt(i) => Value::Int(i64::from(i)),
        SqlValue::Int(i) => Value::Int(i64::from(i)),
        SqlValue::BigInt(i) => Value::Int(i),
        SqlValue::UTinyInt(i) => Value::Int(i64::from(i)),
        SqlValue::USmallInt(i) => Value::Int(i64::from(i)),
        SqlValue::UInt(i) => Value::Int(i64::from(i)),
        SqlValue::Float(f) => Value::Float(f64::from(f)),
        SqlValue::Double(f) => Value::Float(f),
        SqlValue::Text(s) => Value::Text(s),
        other => Value::Text(format!("{:?}", other)),
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn query_rows(&self, sql: &str, width: usize) -> DbResult<Vec<Vec<Value>>> {
        self.query_rows_sync(sql, width)
    }

    async fn truncate(&self, table: &str) -> DbResult<()> {
        if !self.relation_exists_sync(table)? {
            return Err(DbError::TableNotFound(table.to_string()));
        }
        self.execute_sync(&format!("DELETE FROM {}", quote_ident(table)))?;
        Ok(())
    }

    async fn set_constraint_checks(&self, enabled: bool) -> DbResult<ConstraintToggle> {
        // DuckDB enforces declared foreign keys unconditionally
        log::debug!(
            "duckdb cannot {} foreign key checks per session",
            if enabled { "enable" } else { "disable" }
        );
        Ok(ConstraintToggle::Unsupported)
    }

    async fn insert_batch(&self, table: &str, columns: &[&str], rows: &[Row]) -> DbResult<usize> {
        self.insert_batch_sync(table, columns, rows)
    }

    async fn checkpoint(&self) -> DbResult<()> {
        self.execute_batch_sync("CHECKPOINT")
    }

    async fn count_dangling(
        &self,
        table: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> DbResult<u64> {
        let sql = format!(
            "SELECT c.{col} FROM {table} c WHERE c.{col} IS NOT NULL \
             AND NOT EXISTS (SELECT 1 FROM {ref_table} p WHERE p.{ref_col} = c.{col})",
            col = quote_ident(column),
            table = quote_ident(table),
            ref_table = quote_ident(ref_table),
            ref_col = quote_ident(ref_column),
        );
        Ok(self.query_count_sync(&sql)? as u64)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
