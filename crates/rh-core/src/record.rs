//! Record shapes and typed source records
//!
//! A [`RecordShape`] describes one delimited source file: its ordered, typed
//! columns, the field delimiter and the token that stands for a missing
//! value. A [`Record`] is one decoded row of such a file. Records share their
//! shape through an `Arc`, so a row costs one `Vec<Value>` rather than a map.

use crate::value::{ColumnType, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One named, typed column of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Layout of a delimited source file
#[derive(Debug, Clone)]
pub struct RecordShape {
    columns: Vec<ColumnDef>,
    delimiter: u8,
    null_token: String,
    index: HashMap<String, usize>,
}

impl RecordShape {
    /// Build a shape. Column names must be unique.
    pub fn new(columns: Vec<ColumnDef>, delimiter: u8, null_token: impl Into<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect::<HashMap<_, _>>();
        debug_assert_eq!(index.len(), columns.len(), "duplicate column names");
        Self {
            columns,
            delimiter,
            null_token: null_token.into(),
            index,
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Column names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn null_token(&self) -> &str {
        &self.null_token
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Decode one raw field: the null token becomes `Absent`, anything else
    /// is parsed as the column's type.
    pub fn decode_field(
        &self,
        position: usize,
        raw: &str,
    ) -> Result<Value, crate::value::ValueParseError> {
        if raw == self.null_token {
            return Ok(Value::Absent);
        }
        Value::parse(raw, self.columns[position].ty)
    }
}

static ABSENT: Value = Value::Absent;

/// One decoded source row
#[derive(Debug, Clone)]
pub struct Record {
    shape: Arc<RecordShape>,
    values: Vec<Value>,
    line: u64,
}

impl Record {
    /// Create a record. `values` must follow the shape's column order.
    pub fn new(shape: Arc<RecordShape>, values: Vec<Value>, line: u64) -> Self {
        debug_assert_eq!(shape.len(), values.len());
        Self {
            shape,
            values,
            line,
        }
    }

    /// 1-based data row number within the source file
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    /// Value of the named column; unknown columns read as `Absent`.
    pub fn get(&self, name: &str) -> &Value {
        match self.shape.index_of(name) {
            Some(i) => &self.values[i],
            None => {
                debug_assert!(false, "unknown column '{}'", name);
                &ABSENT
            }
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).as_str()
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).as_int()
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).as_float()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
