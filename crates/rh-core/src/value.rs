//! Typed cell values shared by source records and destination rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Free text, kept verbatim
    Text,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// `0`/`1` or `true`/`false`
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Bool => write!(f, "bool"),
        }
    }
}

/// A single cell. `Absent` is the loader's only notion of NULL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Absent,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A destination row, ordered like the table's insert columns.
pub type Row = Vec<Value>;

/// Raw text that does not parse as the declared column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueParseError {
    pub raw: String,
    pub expected: ColumnType,
}

impl fmt::Display for ValueParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid {}", self.raw, self.expected)
    }
}

impl std::error::Error for ValueParseError {}

impl Value {
    /// Parse a raw (non-null) source field as `ty`.
    pub fn parse(raw: &str, ty: ColumnType) -> Result<Value, ValueParseError> {
        let fail = || ValueParseError {
            raw: raw.to_string(),
            expected: ty,
        };
        match ty {
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
            ColumnType::Int => raw.trim().parse::<i64>().map(Value::Int).map_err(|_| fail()),
            ColumnType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .ok_or_else(fail),
            ColumnType::Bool => match raw.trim() {
                "1" | "true" | "TRUE" | "True" => Ok(Value::Bool(true)),
                "0" | "false" | "FALSE" | "False" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
        }
    }

    /// Text value of `s`, or `Absent` for `None`.
    pub fn text(s: Option<&str>) -> Value {
        s.map_or(Value::Absent, |s| Value::Text(s.to_string()))
    }

    /// Integer value of `i`, or `Absent` for `None`.
    pub fn int(i: Option<i64>) -> Value {
        i.map_or(Value::Absent, Value::Int)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Truncate a text value to at most `max_chars` characters.
    pub fn truncated(self, max_chars: usize) -> Value {
        match self {
            Value::Text(s) if s.chars().count() > max_chars => {
                Value::Text(s.chars().take(max_chars).collect())
            }
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
