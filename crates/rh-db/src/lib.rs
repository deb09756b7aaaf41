//! rh-db - Database abstraction layer for Reelhouse
//!
//! This crate provides the `Database` trait the loader writes through and its
//! DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{quote_ident, ConstraintToggle, Database};
