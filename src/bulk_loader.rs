use std::fmt;
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::LoadError;
use crate::ingest::plan::LoadPlan;
use crate::ingest::row_gen::{KeySource, RowSpec, UuidKeySource};
use crate::observability::metrics;
use crate::perf_counter::LoadCounter;
use crate::scheduler::{BatchContext, JobQueue, WorkerPool};
use crate::store::TableHandle;
use crate::unit_fmt;

// Elapsed time is never taken to be shorter than this when computing rates.
const MIN_ELAPSED: Duration = Duration::from_micros(1);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputReport {
    pub rows_written: u64,
    pub bytes_written: u64,
    pub batches: usize,
    pub elapsed: Duration,
    pub rows_per_second: u64,
}

impl ThroughputReport {
    pub fn new(rows_written: u64, bytes_written: u64, batches: usize, elapsed: Duration) -> ThroughputReport {
        let seconds = elapsed.max(MIN_ELAPSED).as_secs_f64();
        ThroughputReport {
            rows_written,
            bytes_written,
            batches,
            elapsed,
            rows_per_second: (rows_written as f64 / seconds) as u64,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_written as f64 / self.elapsed.max(MIN_ELAPSED).as_secs_f64()
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "wrote {} rows ({}) in {} batches in {:.3}s: {} rows/s, {}/s",
            self.rows_written,
            unit_fmt::bite(self.bytes_written as usize),
            self.batches,
            self.elapsed_seconds(),
            unit_fmt::short_scale(self.rows_per_second as f64),
            unit_fmt::byte(self.bytes_per_second()),
        )
    }
}

/// Populates a table with synthetic rows using a fixed pool of workers that
/// each issue one bulk write per batch.
pub struct BulkLoader {
    table: TableHandle,
    family: String,
    column: String,
    keys: Arc<dyn KeySource>,
}

impl BulkLoader {
    pub fn new(table: TableHandle, family: &str, column: &str) -> BulkLoader {
        BulkLoader {
            table,
            family: family.to_string(),
            column: column.to_string(),
            keys: Arc::new(UuidKeySource),
        }
    }

    pub fn with_key_source(mut self, keys: Arc<dyn KeySource>) -> BulkLoader {
        self.keys = keys;
        self
    }

    /// Writes `batch_count * floor(total_rows / batch_count)` rows.
    ///
    /// Fails with the first batch error observed, but only after every
    /// outstanding batch has reported and all workers have exited.
    pub fn load(
        &self,
        total_rows: usize,
        bytes_per_row: usize,
        batch_count: usize,
        worker_count: usize,
    ) -> Result<ThroughputReport, LoadError> {
        let plan = LoadPlan::new(total_rows, bytes_per_row, batch_count, worker_count)?;
        self.run(&plan)
    }

    pub fn run(&self, plan: &LoadPlan) -> Result<ThroughputReport, LoadError> {
        if plan.dropped_rows() > 0 {
            log::warn!(
                "{} rows do not divide into {} batches, writing {} of {} requested rows",
                plan.dropped_rows(),
                plan.batch_count,
                plan.realized_rows(),
                plan.total_rows
            );
        }
        log::info!(
            "Populating {} with {} rows of {} in {} batches of {} using {} workers",
            self.table.name(),
            plan.realized_rows(),
            unit_fmt::bite(plan.bytes_per_row),
            plan.batch_count,
            plan.rows_per_batch,
            plan.worker_count
        );

        let counter = Arc::new(LoadCounter::new());
        let context = Arc::new(BatchContext {
            table: self.table.clone(),
            row_spec: RowSpec {
                family: self.family.clone(),
                column: self.column.clone(),
                bytes_per_row: plan.bytes_per_row,
            },
            keys: self.keys.clone(),
            counter: counter.clone(),
        });

        // Both queues hold every batch, so neither the producer nor a worker
        // delivering a result ever blocks on a full queue.
        let jobs = Arc::new(JobQueue::with_capacity(plan.batch_count));
        let (results, receiver) = sync_channel(plan.batch_count);
        let pool = WorkerPool::start(plan.worker_count, jobs.clone(), results, context)?;
        for job in plan.jobs() {
            if jobs.push(job).is_err() {
                pool.join();
                return Err(LoadError::WorkerLost("job queue closed early".to_string()));
            }
        }
        jobs.close();
        let start_time = Instant::now();

        let progress_step = (plan.batch_count / 10).max(1);
        let mut first_error = None;
        let mut received = 0;
        while received < plan.batch_count {
            let result = match receiver.recv() {
                Ok(result) => result,
                // Every worker is gone without reporting all batches.
                Err(_) => break,
            };
            received += 1;
            match result.error {
                Some(err) => {
                    if first_error.is_none() {
                        log::error!("Batch {} failed, aborting load: {}", result.batch, err);
                        first_error = Some(err);
                    } else {
                        log::debug!("Discarding error from batch {}: {}", result.batch, err);
                    }
                }
                None => log::debug!("Batch {} wrote {} rows", result.batch, result.rows),
            }
            if received % progress_step == 0 || received == plan.batch_count {
                log::info!(
                    "Populated {}/{} rows ({}/{} batches complete)",
                    counter.rows_written(),
                    plan.realized_rows(),
                    received,
                    plan.batch_count
                );
            }
        }
        let elapsed = start_time.elapsed();
        let clean = pool.join();
        log::debug!("Worker pool shut down, {} of {} workers exited cleanly", clean, plan.worker_count);

        if let Some(err) = first_error {
            return Err(err);
        }
        if received < plan.batch_count {
            return Err(LoadError::WorkerLost(format!(
                "received {} of {} batch results",
                received, plan.batch_count
            )));
        }

        let report = ThroughputReport::new(
            counter.rows_written(),
            counter.bytes_written(),
            plan.batch_count,
            elapsed,
        );
        metrics::LAST_RUN_ROWS_PER_SECOND.set(report.rows_per_second as f64);
        log::info!("Population of {} complete: {}", self.table.name(), report);
        Ok(report)
    }
}
