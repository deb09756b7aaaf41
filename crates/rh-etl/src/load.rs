//! Batched loader and its phase state machine
//!
//! The loader walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> Truncate -> DisableConstraints -> LoadDimensions -> LoadBridges
//!      -> LoadFacts -> EnableConstraints -> Report
//! ```
//!
//! A truncate-only run goes from `Truncate` straight to `Report`. Any
//! non-terminal phase may move to `Failed`. Rows are buffered per table and
//! written in batches of `batch_rows`, each batch in its own transaction.

use crate::error::{EtlResult, LoadError};
use rh_core::{IntegrityCheck, Row, TableKind, TableName, TableSpec, WarehouseContract};
use rh_db::{ConstraintToggle, Database};
use std::fmt;
use std::sync::Arc;

/// Loader phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Truncate,
    DisableConstraints,
    LoadDimensions,
    LoadBridges,
    LoadFacts,
    EnableConstraints,
    Report,
    Failed,
}

impl LoadPhase {
    /// Phase in which tables of `kind` load
    pub fn for_kind(kind: TableKind) -> Self {
        if kind.is_dimension() {
            LoadPhase::LoadDimensions
        } else if kind == TableKind::Bridge {
            LoadPhase::LoadBridges
        } else {
            LoadPhase::LoadFacts
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoadPhase::Report | LoadPhase::Failed)
    }

    fn can_move_to(self, next: LoadPhase) -> bool {
        use LoadPhase::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, Truncate)
                | (Truncate, DisableConstraints)
                | (Truncate, Report)
                | (DisableConstraints, LoadDimensions)
                | (LoadDimensions, LoadBridges)
                | (LoadBridges, LoadFacts)
                | (LoadFacts, EnableConstraints)
                | (EnableConstraints, Report)
        )
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadPhase::Idle => "idle",
            LoadPhase::Truncate => "truncate",
            LoadPhase::DisableConstraints => "disable constraints",
            LoadPhase::LoadDimensions => "load dimensions",
            LoadPhase::LoadBridges => "load bridges",
            LoadPhase::LoadFacts => "load facts",
            LoadPhase::EnableConstraints => "enable constraints",
            LoadPhase::Report => "report",
            LoadPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Batch and durability settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Rows per insert transaction
    pub batch_rows: usize,
    /// Rows between durability checkpoints; 0 disables them
    pub checkpoint_rows: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_rows: 50_000,
            checkpoint_rows: 1_000_000,
        }
    }
}

/// Write buffer of the table currently loading
#[derive(Debug)]
pub struct TableSink {
    table: TableName,
    columns: Vec<&'static str>,
    buffer: Vec<Row>,
    batches_committed: u64,
    inserted: u64,
}

impl TableSink {
    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    /// Rows buffered and not yet written
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Writes destination tables through a [`Database`]
pub struct Loader {
    db: Arc<dyn Database>,
    phase: LoadPhase,
    options: LoadOptions,
    rows_since_checkpoint: u64,
    constraints_disabled: bool,
}

impl Loader {
    pub fn new(db: Arc<dyn Database>, options: LoadOptions) -> Self {
        Self {
            db,
            phase: LoadPhase::Idle,
            options,
            rows_since_checkpoint: 0,
            constraints_disabled: false,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Move to `next`, rejecting out-of-order transitions
    pub fn transition(&mut self, next: LoadPhase) -> EtlResult<()> {
        if !self.phase.can_move_to(next) {
            return Err(LoadError::IllegalTransition {
                from: self.phase,
                to: next,
            }
            .into());
        }
        log::debug!("Loader phase: {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Enter `Truncate` and empty every table, referencing tables first
    pub async fn truncate_all(&mut self, children_first: &[&TableSpec]) -> EtlResult<()> {
        self.transition(LoadPhase::Truncate)?;
        for spec in children_first {
            let table = spec.name.as_str();
            self.db
                .truncate(table)
                .await
                .map_err(|source| LoadError::Truncate {
                    table: table.to_string(),
                    source,
                })?;
            log::debug!("Truncated {}", table);
        }
        Ok(())
    }

    /// Enter `DisableConstraints`, turning enforcement off when asked to
    pub async fn disable_constraints(&mut self, disable: bool) -> EtlResult<()> {
        self.transition(LoadPhase::DisableConstraints)?;
        if !disable {
            return Ok(());
        }
        match self.db.set_constraint_checks(false).await? {
            ConstraintToggle::Applied => self.constraints_disabled = true,
            ConstraintToggle::Unsupported => log::warn!(
                "{} cannot disable foreign-key checks; loading with constraints enforced",
                self.db.db_type()
            ),
        }
        Ok(())
    }

    /// Enter `EnableConstraints` and restore enforcement if it was disabled
    pub async fn enable_constraints(&mut self) -> EtlResult<()> {
        self.transition(LoadPhase::EnableConstraints)?;
        self.restore_constraints().await
    }

    async fn restore_constraints(&mut self) -> EtlResult<()> {
        if self.constraints_disabled {
            self.db.set_constraint_checks(true).await?;
            self.constraints_disabled = false;
        }
        Ok(())
    }

    /// Start writing a table, moving to its kind's phase if needed
    pub fn open_table(&mut self, spec: &TableSpec) -> EtlResult<TableSink> {
        let target = LoadPhase::for_kind(spec.kind);
        while self.phase != target {
            let next = match self.phase {
                LoadPhase::DisableConstraints => LoadPhase::LoadDimensions,
                LoadPhase::LoadDimensions => LoadPhase::LoadBridges,
                LoadPhase::LoadBridges => LoadPhase::LoadFacts,
                _ => target,
            };
            self.transition(next)?;
        }
        Ok(TableSink {
            table: spec.name.clone(),
            columns: spec.column_names(),
            buffer: Vec::with_capacity(self.options.batch_rows.min(65_536)),
            batches_committed: 0,
            inserted: 0,
        })
    }

    /// Buffer one row, writing a batch once the buffer is full
    pub async fn push(&mut self, sink: &mut TableSink, row: Row) -> EtlResult<()> {
        sink.buffer.push(row);
        if sink.buffer.len() >= self.options.batch_rows.max(1) {
            self.flush(sink).await?;
        }
        Ok(())
    }

    /// Write buffered rows as one transaction
    pub async fn flush(&mut self, sink: &mut TableSink) -> EtlResult<()> {
        if sink.buffer.is_empty() {
            return Ok(());
        }
        let inserted = self
            .db
            .insert_batch(sink.table.as_str(), &sink.columns, &sink.buffer)
            .await
            .map_err(|source| LoadError::Destination {
                table: sink.table.to_string(),
                last_committed_batch: sink.batches_committed,
                source,
            })?;
        sink.buffer.clear();
        sink.batches_committed += 1;
        sink.inserted += inserted as u64;
        log::debug!(
            "{}: committed batch {} ({} rows)",
            sink.table,
            sink.batches_committed,
            inserted
        );

        self.rows_since_checkpoint += inserted as u64;
        if self.options.checkpoint_rows > 0
            && self.rows_since_checkpoint >= self.options.checkpoint_rows
        {
            self.db
                .checkpoint()
                .await
                .map_err(|source| LoadError::Destination {
                    table: sink.table.to_string(),
                    last_committed_batch: sink.batches_committed,
                    source,
                })?;
            self.rows_since_checkpoint = 0;
        }
        Ok(())
    }

    /// Flush the remainder of a table; returns rows inserted
    pub async fn close_table(&mut self, mut sink: TableSink) -> EtlResult<u64> {
        self.flush(&mut sink).await?;
        Ok(sink.inserted)
    }

    /// Count dangling values of every declared foreign key
    pub async fn probe_integrity(
        &self,
        contract: &WarehouseContract,
    ) -> EtlResult<Vec<IntegrityCheck>> {
        let mut checks = Vec::new();
        for spec in contract.tables() {
            for fk in &spec.foreign_keys {
                let dangling = self
                    .db
                    .count_dangling(
                        spec.name.as_str(),
                        fk.column,
                        fk.references.as_str(),
                        fk.referenced_column,
                    )
                    .await?;
                checks.push(IntegrityCheck {
                    table: spec.name.clone(),
                    column: fk.column.to_string(),
                    references: fk.references.clone(),
                    dangling,
                });
            }
        }
        Ok(checks)
    }

    /// Move to `Failed`, restoring constraint enforcement on a best-effort
    /// basis
    pub async fn fail(&mut self) {
        if let Err(e) = self.restore_constraints().await {
            log::warn!("Failed to re-enable foreign-key checks: {}", e);
        }
        if !self.phase.is_terminal() {
            self.phase = LoadPhase::Failed;
        }
    }
}

/// Turn dangling counts into an error when any are non-zero
pub fn check_integrity(checks: &[IntegrityCheck]) -> EtlResult<()> {
    let count: u64 = checks.iter().map(|c| c.dangling).sum();
    if count == 0 {
        return Ok(());
    }
    let details = checks
        .iter()
        .filter(|c| c.dangling > 0)
        .map(|c| format!("{}.{} -> {} ({})", c.table, c.column, c.references, c.dangling))
        .collect::<Vec<_>>()
        .join(", ");
    Err(LoadError::DanglingReferences { count, details }.into())
}

#[cfg(test)]
#[path = "load_test.rs"]
mod tests;
