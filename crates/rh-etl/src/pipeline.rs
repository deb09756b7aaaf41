//! Run orchestration: preflight, truncate, load in dependency order, report.

use crate::error::{EtlError, EtlResult, LoadError};
use crate::extract::{self, ExtractOptions, Extractor};
use crate::load::{check_integrity, LoadOptions, LoadPhase, Loader, TableSink};
use crate::plan::{JobInput, LoadPlan, RunMode, TableJob};
use crate::transform::{self, Skip, TimeTransform, TransformContext, Transformed};
use rh_core::{
    Config, CoreResult, Record, RunReport, RunState, SkipReason, SourceId, TableName, TableSpec,
    TableStats, TableStatus, Value, WarehouseContract,
};
use rh_db::Database;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Progress callbacks for front ends
pub trait PipelineObserver {
    fn phase_started(&mut self, _phase: LoadPhase) {}
    fn table_started(&mut self, _table: &TableName, _source: &str) {}
    /// Source rows read so far for the current table
    fn rows_progress(&mut self, _table: &TableName, _rows_read: u64) {}
    fn table_finished(&mut self, _stats: &TableStats) {}
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Result of a run. The report is produced for failed runs too.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub result: EtlResult<()>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Mutable state of one run
struct RunProgress {
    report: RunReport,
    state: RunState,
    state_path: PathBuf,
    marker_written: bool,
    loader: Loader,
    /// Counts of the table being loaded
    current: Option<TableStats>,
}

impl RunProgress {
    fn save_state(&self) -> CoreResult<()> {
        self.state.save(&self.state_path)
    }
}

/// Loads the catalog snapshots of a project into a warehouse
pub struct Pipeline {
    config: Config,
    root: PathBuf,
    contract: WarehouseContract,
    db: Arc<dyn Database>,
}

impl Pipeline {
    pub fn new(config: Config, root: impl Into<PathBuf>, db: Arc<dyn Database>) -> EtlResult<Self> {
        Ok(Self {
            config,
            root: root.into(),
            contract: WarehouseContract::catalog()?,
            db,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contract(&self) -> &WarehouseContract {
        &self.contract
    }

    pub fn plan(&self, mode: RunMode) -> EtlResult<LoadPlan> {
        LoadPlan::build(&self.contract, &self.config, mode)
    }

    /// Execute a run.
    ///
    /// Nothing in the warehouse or the project's target directory changes
    /// until preflight has checked every table and every source header.
    pub async fn run(&self, mode: RunMode, observer: &mut dyn PipelineObserver) -> RunOutcome {
        let config_hash = self.config.checksum().unwrap_or_else(|e| {
            log::warn!("Could not hash configuration: {}", e);
            String::new()
        });
        let state = RunState::new(mode.name(), config_hash);
        let options = LoadOptions {
            batch_rows: self.config.load.batch_rows,
            checkpoint_rows: self.config.load.checkpoint_rows,
        };

        let mut run = RunProgress {
            report: RunReport::new(state.run_id.clone(), mode.name()),
            state,
            state_path: self.config.run_state_path(&self.root),
            marker_written: false,
            loader: Loader::new(self.db.clone(), options),
            current: None,
        };

        let result = self.execute(mode, &mut run, observer).await;
        match &result {
            Ok(()) => {
                run.report.finish();
                log::info!(
                    "Run {} finished: {} rows inserted, {} skipped",
                    run.report.run_id,
                    run.report.total_inserted(),
                    run.report.total_skipped()
                );
            }
            Err(e) => self.record_failure(&mut run, e, observer).await,
        }

        RunOutcome {
            report: run.report,
            result,
        }
    }

    async fn record_failure(
        &self,
        run: &mut RunProgress,
        error: &EtlError,
        observer: &mut dyn PipelineObserver,
    ) {
        let message = error.to_string();
        let table = run.current.as_ref().map(|s| s.table.clone());
        let last_batch = error
            .last_committed_batch()
            .or_else(|| run.current.as_ref().map(|s| s.batches_committed))
            .unwrap_or(0);

        if let Some(mut stats) = run.current.take() {
            stats.status = TableStatus::Failed;
            observer.table_finished(&stats);
            run.report.push(stats);
        }
        run.report.fail(table.clone(), last_batch, message.clone());
        run.loader.fail().await;

        if run.marker_written {
            run.state.mark_failed(table.as_ref(), last_batch, &message);
            if let Err(e) = run.save_state() {
                log::warn!("Failed to write run state: {}", e);
            }
        }
    }

    async fn execute(
        &self,
        mode: RunMode,
        run: &mut RunProgress,
        observer: &mut dyn PipelineObserver,
    ) -> EtlResult<()> {
        let plan = self.plan(mode)?;
        self.preflight(&plan).await?;

        run.save_state()?;
        run.marker_written = true;
        log::info!(
            "Run {} started in {} mode against {}",
            run.state.run_id,
            mode,
            self.db.db_type()
        );

        observer.phase_started(LoadPhase::Truncate);
        let truncate: Vec<&TableSpec> = plan
            .truncate
            .iter()
            .map(|name| self.contract.table(name.as_str()))
            .collect::<CoreResult<_>>()?;
        run.loader.truncate_all(&truncate).await?;
        for name in &plan.truncate {
            run.state.mark_truncated(name);
        }
        run.save_state()?;

        if !mode.loads() {
            for name in &plan.truncate {
                let mut stats = TableStats::new(name.clone(), "-");
                stats.status = TableStatus::Truncated;
                run.report.push(stats);
            }
            return self.complete(run, observer);
        }

        observer.phase_started(LoadPhase::DisableConstraints);
        run.loader
            .disable_constraints(mode.disables_constraints())
            .await?;

        let mut ctx = TransformContext::new(
            &self.contract,
            self.config.strictness,
            self.config.year_window(),
        );
        for job in &plan.jobs {
            self.load_table(job, mode, &mut ctx, run, observer).await?;
        }

        if mode == RunMode::Validated {
            let checks = run.loader.probe_integrity(&self.contract).await?;
            run.report.integrity = checks;
            check_integrity(&run.report.integrity)?;
        }

        observer.phase_started(LoadPhase::EnableConstraints);
        run.loader.enable_constraints().await?;
        self.complete(run, observer)
    }

    fn complete(&self, run: &mut RunProgress, observer: &mut dyn PipelineObserver) -> EtlResult<()> {
        run.loader.transition(LoadPhase::Report)?;
        observer.phase_started(LoadPhase::Report);
        run.state.mark_run_completed();
        run.save_state()?;
        Ok(())
    }

    /// Check every destination table exists and every source opens with the
    /// expected header
    async fn preflight(&self, plan: &LoadPlan) -> EtlResult<()> {
        for table in &plan.truncate {
            if !self.db.relation_exists(table.as_str()).await? {
                return Err(LoadError::MissingTable {
                    table: table.to_string(),
                }
                .into());
            }
        }
        for source in plan.sources() {
            let path = self.config.source_path(&self.root, source);
            extract::preflight(&path, Arc::new(self.shape(source)))?;
            log::debug!("Preflight ok: {}", path.display());
        }
        Ok(())
    }

    fn shape(&self, source: SourceId) -> rh_core::RecordShape {
        source.shape(self.config.delimiter_byte(), &self.config.format.null_token)
    }

    async fn load_table(
        &self,
        job: &TableJob,
        mode: RunMode,
        ctx: &mut TransformContext,
        run: &mut RunProgress,
        observer: &mut dyn PipelineObserver,
    ) -> EtlResult<()> {
        let started = Instant::now();
        let table = job.spec.name.clone();
        let label = job.input.label();
        log::info!("Loading {} from {}", table, label);

        let before = run.loader.phase();
        let mut sink = run.loader.open_table(&job.spec)?;
        if run.loader.phase() != before {
            observer.phase_started(run.loader.phase());
        }
        observer.table_started(&table, &label);

        let stats = run.current.insert(TableStats::new(table.clone(), label));
        ctx.begin_table();

        let mut transform = transform::for_table(&job.spec)?;
        let mut emitter = Emitter {
            loader: &mut run.loader,
            sink: &mut sink,
            stats,
            out: Transformed::default(),
            logged: 0,
            sample: self.config.report.sample_skips,
        };

        match &job.input {
            JobInput::YearWindow { .. } => {
                let shape = Arc::new(TimeTransform::shape());
                for (i, year) in job.input.years().into_iter().enumerate() {
                    let record = Record::new(shape.clone(), vec![Value::Int(year)], i as u64 + 1);
                    emitter.stats.read += 1;
                    emitter.out.clear();
                    transform.apply(&record, ctx, &mut emitter.out)?;
                    emitter.emit().await?;
                }
            }
            JobInput::Source(source) => {
                let path = self.config.source_path(&self.root, *source);
                let options = ExtractOptions {
                    chunk_rows: self.config.extract.chunk_rows,
                    limit: mode.row_limit(),
                };
                let mut extractor = Extractor::open(&path, Arc::new(self.shape(*source)), options)?;
                while let Some(chunk) = extractor.next_chunk()? {
                    for record in &chunk {
                        emitter.out.clear();
                        transform.apply(record, ctx, &mut emitter.out)?;
                        emitter.emit().await?;
                    }
                    emitter.stats.read = extractor.stats().rows_read;
                    observer.rows_progress(&table, emitter.stats.read);
                }

                let extracted = extractor.stats();
                emitter.stats.read = extracted.rows_read;
                emitter
                    .stats
                    .record_skips(SkipReason::Malformed, extracted.malformed);
                if extracted.coerced > 0 {
                    log::debug!(
                        "{}: {} unparseable fields loaded as NULL",
                        table,
                        extracted.coerced
                    );
                }
            }
        }

        emitter.flush().await?;
        let inserted = run.loader.close_table(sink).await?;

        let key_digest = match job.spec.surrogate_key {
            Some(_) => {
                ctx.registries.freeze(table.as_str())?;
                Some(ctx.registries.get(table.as_str())?.digest())
            }
            None => None,
        };

        let mut stats = run.current.take().unwrap_or_else(|| TableStats::new(table.clone(), "-"));
        stats.inserted = inserted;
        stats.key_digest = key_digest;
        stats.duration_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "{}: read {}, inserted {}, skipped {} [{}ms]",
            table,
            stats.read,
            stats.inserted,
            stats.skipped(),
            stats.duration_ms
        );
        observer.table_finished(&stats);
        run.state
            .mark_completed(&table, stats.inserted, stats.duration_ms);
        run.report.push(stats);
        run.save_state()?;
        Ok(())
    }
}

/// Moves transform output into the loader and the table's counts
struct Emitter<'a> {
    loader: &'a mut Loader,
    sink: &'a mut TableSink,
    stats: &'a mut TableStats,
    out: Transformed,
    logged: usize,
    sample: usize,
}

impl Emitter<'_> {
    async fn emit(&mut self) -> EtlResult<()> {
        for skip in self.out.skips.drain(..) {
            self.stats.record_skip(skip.reason);
            log_skip(&self.stats.table, &skip, self.logged < self.sample);
            self.logged += 1;
        }
        let mut result = Ok(());
        for row in self.out.rows.drain(..) {
            if let Err(e) = self.loader.push(self.sink, row).await {
                result = Err(e);
                break;
            }
        }
        self.sync();
        result
    }

    async fn flush(&mut self) -> EtlResult<()> {
        let result = self.loader.flush(self.sink).await;
        self.sync();
        result
    }

    fn sync(&mut self) {
        self.stats.inserted = self.sink.inserted();
        self.stats.batches_committed = self.sink.batches_committed();
    }
}

fn log_skip(table: &TableName, skip: &Skip, sampled: bool) {
    let key = skip.source_key.as_deref().unwrap_or("-");
    let reference = skip
        .reference
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default();
    if sampled {
        log::warn!(
            "{}: skipped row {} ({}) as {}{}",
            table,
            skip.line,
            key,
            skip.reason,
            reference
        );
    } else {
        log::debug!(
            "{}: skipped row {} ({}) as {}{}",
            table,
            skip.line,
            key,
            skip.reason,
            reference
        );
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
