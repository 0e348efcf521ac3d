use std::io;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::errors::{LoadError, StoreError};
use crate::ingest::plan::BatchJob;
use crate::ingest::row_gen::{KeySource, Row, RowGenerator, RowSpec};
use crate::observability::metrics;
use crate::perf_counter::LoadCounter;
use crate::scheduler::job_queue::JobQueue;
use crate::store::TableHandle;

/// Outcome of exactly one `BatchJob`.
#[derive(Debug)]
pub struct BatchResult {
    pub batch: usize,
    pub rows: usize,
    pub error: Option<LoadError>,
}

impl BatchResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a worker needs to turn a `BatchJob` into a bulk write.
pub struct BatchContext {
    pub table: TableHandle,
    pub row_spec: RowSpec,
    pub keys: Arc<dyn KeySource>,
    pub counter: Arc<LoadCounter>,
}

type Worker = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads draining a shared job queue.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads. Each sends one `BatchResult` per job it
    /// takes and exits once `jobs` is closed and drained.
    pub fn start(
        worker_count: usize,
        jobs: Arc<JobQueue<BatchJob>>,
        results: SyncSender<BatchResult>,
        context: Arc<BatchContext>,
    ) -> Result<WorkerPool, LoadError> {
        WorkerPool::start_with(worker_count, jobs, results, context, |name, work| {
            thread::Builder::new().name(name).spawn(work)
        })
    }

    fn start_with<S>(
        worker_count: usize,
        jobs: Arc<JobQueue<BatchJob>>,
        results: SyncSender<BatchResult>,
        context: Arc<BatchContext>,
        mut spawn: S,
    ) -> Result<WorkerPool, LoadError>
    where
        S: FnMut(String, Worker) -> io::Result<JoinHandle<()>>,
    {
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let queue = jobs.clone();
            let results = results.clone();
            let context = context.clone();
            let work: Worker = Box::new(move || WorkerPool::worker_loop(id, &queue, &results, &context));
            match spawn(format!("loader-{id}"), work) {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Let already running workers drain and exit before bailing.
                    jobs.close();
                    WorkerPool { workers }.join();
                    return Err(LoadError::WorkerLost(format!(
                        "failed to spawn worker {id}: {err}"
                    )));
                }
            }
        }
        Ok(WorkerPool { workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to exit. Returns the number of workers that
    /// terminated without panicking.
    pub fn join(self) -> usize {
        let mut clean = 0;
        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("loader").to_string();
            match worker.join() {
                Ok(()) => clean += 1,
                Err(_) => log::error!("Worker {} panicked", name),
            }
        }
        clean
    }

    fn worker_loop(
        id: usize,
        jobs: &JobQueue<BatchJob>,
        results: &SyncSender<BatchResult>,
        context: &BatchContext,
    ) {
        log::debug!("Starting worker {}", id);
        let mut generator = RowGenerator::new(context.row_spec.clone(), context.keys.clone());
        while let Some(job) = jobs.pop() {
            let result = execute_batch(&job, &mut generator, context);
            if results.send(result).is_err() {
                log::warn!("Worker {} found results channel closed", id);
                break;
            }
        }
        log::debug!("Stopping worker {}", id);
    }
}

/// Generates the rows for `job` and writes them with a single bulk request.
pub fn execute_batch(job: &BatchJob, generator: &mut RowGenerator, context: &BatchContext) -> BatchResult {
    let error = write_batch(job, generator, context).err();
    if error.is_some() {
        metrics::BATCH_ERROR_COUNT.inc();
    } else {
        metrics::BATCH_OK_COUNT.inc();
    }
    BatchResult {
        batch: job.id,
        rows: job.rows,
        error,
    }
}

fn write_batch(job: &BatchJob, generator: &mut RowGenerator, context: &BatchContext) -> Result<(), LoadError> {
    let rows = match generator.rows(job.rows) {
        Ok(rows) => rows,
        Err(err) => {
            context.counter.batch_failed(job.rows as u64);
            return Err(err);
        }
    };
    let bytes = (rows.len() * generator.spec().bytes_per_row) as u64;
    context.counter.rows_generated(rows.len() as u64, bytes);

    context.counter.bulk_write_request();
    metrics::BULK_WRITE_REQUESTS.inc();
    let statuses = match context.table.bulk_write(&rows) {
        Ok(statuses) => statuses,
        Err(source) => {
            context.counter.batch_failed(rows.len() as u64);
            return Err(LoadError::BulkWrite {
                table: context.table.name().to_string(),
                rows: rows.len(),
                source,
            });
        }
    };
    if let Err(err) = first_row_error(context.table.name(), &rows, statuses) {
        context.counter.batch_failed(rows.len() as u64);
        return Err(err);
    }

    context.counter.batch_succeeded(rows.len() as u64, bytes);
    metrics::ROWS_WRITTEN.inc_by(rows.len() as f64);
    metrics::BYTES_WRITTEN.inc_by(bytes as f64);
    Ok(())
}

/// A single failed row fails the whole batch.
fn first_row_error(table: &str, rows: &[Row], statuses: Vec<Option<StoreError>>) -> Result<(), LoadError> {
    if statuses.len() != rows.len() {
        return Err(LoadError::BulkWrite {
            table: table.to_string(),
            rows: rows.len(),
            source: StoreError::Decode(format!(
                "expected {} row statuses, got {}",
                rows.len(),
                statuses.len()
            )),
        });
    }
    let failed = statuses.iter().filter(|s| s.is_some()).count();
    match rows.iter().zip(statuses).find_map(|(row, status)| status.map(|e| (row, e))) {
        Some((row, source)) => {
            log::debug!("{} of {} rows failed in bulk write to {}", failed, rows.len(), table);
            Err(LoadError::RowMutation {
                table: table.to_string(),
                key: row.key.clone(),
                source,
            })
        }
        None => Ok(()),
    }
}
