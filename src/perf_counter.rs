use std::sync::atomic::{AtomicU64, Ordering};

const ORDERING: Ordering = Ordering::SeqCst;

/// Counters for a single load run, updated concurrently by all workers.
#[derive(Debug, Default)]
pub struct LoadCounter {
    rows_generated: AtomicU64,
    bytes_generated: AtomicU64,

    bulk_write_requests: AtomicU64,
    rows_written: AtomicU64,
    bytes_written: AtomicU64,

    batches_succeeded: AtomicU64,
    batches_failed: AtomicU64,
    rows_failed: AtomicU64,
}

impl LoadCounter {
    pub fn new() -> LoadCounter {
        LoadCounter::default()
    }

    pub fn rows_generated(&self, rows: u64, bytes: u64) {
        self.rows_generated.fetch_add(rows, ORDERING);
        self.bytes_generated.fetch_add(bytes, ORDERING);
    }

    pub fn bulk_write_request(&self) {
        self.bulk_write_requests.fetch_add(1, ORDERING);
    }

    pub fn batch_succeeded(&self, rows: u64, bytes: u64) {
        self.batches_succeeded.fetch_add(1, ORDERING);
        self.rows_written.fetch_add(rows, ORDERING);
        self.bytes_written.fetch_add(bytes, ORDERING);
    }

    pub fn batch_failed(&self, failed_rows: u64) {
        self.batches_failed.fetch_add(1, ORDERING);
        self.rows_failed.fetch_add(failed_rows, ORDERING);
    }

    pub fn total_rows_generated(&self) -> u64 {
        self.rows_generated.load(ORDERING)
    }

    pub fn total_bytes_generated(&self) -> u64 {
        self.bytes_generated.load(ORDERING)
    }

    pub fn bulk_write_requests(&self) -> u64 {
        self.bulk_write_requests.load(ORDERING)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(ORDERING)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(ORDERING)
    }

    pub fn batches_succeeded(&self) -> u64 {
        self.batches_succeeded.load(ORDERING)
    }

    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(ORDERING)
    }

    pub fn rows_failed(&self) -> u64 {
        self.rows_failed.load(ORDERING)
    }

    pub fn batches_completed(&self) -> u64 {
        self.batches_succeeded() + self.batches_failed()
    }
}
