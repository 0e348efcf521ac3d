use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;

use tableload::ingest::KeySource;
use tableload::{
    BulkLoader, LoadError, LookupVerifier, MemoryStore, Options, ReadFilter, Row, RowLookup, StoreError,
    TableHandle, TableProvisioner, WideColumnStore,
};

/// Memory store with an instrumented, optionally failing bulk write.
struct MockStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_call: Option<usize>,
    panic_call: Option<usize>,
    fail_transport: bool,
    delay: Duration,
    admin_log: Mutex<Vec<String>>,
}

impl MockStore {
    fn new() -> MockStore {
        MockStore {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_call: None,
            panic_call: None,
            fail_transport: false,
            delay: Duration::ZERO,
            admin_log: Mutex::new(Vec::new()),
        }
    }

    fn provisioned(self, table: &str) -> MockStore {
        self.inner.create_table(table).unwrap();
        self.inner.create_column_family(table, "family").unwrap();
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WideColumnStore for MockStore {
    fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        self.admin_log.lock().unwrap().push(format!("delete {table}"));
        self.inner.delete_table(table)
    }

    fn create_table(&self, table: &str) -> Result<(), StoreError> {
        self.admin_log.lock().unwrap().push(format!("create {table}"));
        self.inner.create_table(table)
    }

    fn create_column_family(&self, table: &str, family: &str) -> Result<(), StoreError> {
        self.admin_log.lock().unwrap().push(format!("family {table} {family}"));
        self.inner.create_column_family(table, family)
    }

    fn bulk_write(&self, table: &str, rows: &[Row]) -> Result<Vec<Option<StoreError>>, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        thread::sleep(self.delay);
        if Some(call) == self.panic_call {
            panic!("bulk write {} crashed", call);
        }
        let result = if self.fail_transport {
            Err(StoreError::Transport("connection reset".to_string()))
        } else {
            self.inner.bulk_write(table, rows).map(|mut statuses| {
                if Some(call) == self.fail_call {
                    let last = statuses.len() - 1;
                    statuses[last] = Some(StoreError::Status {
                        code: 10,
                        message: "aborted".to_string(),
                    });
                }
                statuses
            })
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn point_read(
        &self,
        table: &str,
        keys: &[String],
        filter: ReadFilter,
    ) -> Result<Vec<RowLookup>, StoreError> {
        self.inner.point_read(table, keys, filter)
    }
}

struct BrokenKeys;

impl KeySource for BrokenKeys {
    fn next_key(&self) -> Result<String, LoadError> {
        Err(LoadError::KeyGeneration("no entropy".to_string()))
    }
}

fn loader(store: &Arc<MockStore>) -> BulkLoader {
    BulkLoader::new(TableHandle::open(store.clone(), "t"), "family", "column")
}

#[test]
fn test_load_thousand_rows() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore::new().provisioned("t"));
    let report = loader(&store).load(1000, 1024, 10, 4).unwrap();
    assert_eq!(report.rows_written, 1000);
    assert_eq!(report.bytes_written, 1000 * 1024);
    assert_eq!(report.batches, 10);
    assert!(report.rows_per_second > 0);
    assert_eq!(store.calls(), 10);
    assert_eq!(store.inner.row_count("t"), 1000);
}

#[test]
fn test_remainder_is_dropped() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore::new().provisioned("t"));
    let report = loader(&store).load(1009, 8, 10, 3).unwrap();
    assert_eq!(report.rows_written, 1000);
    assert_eq!(store.inner.row_count("t"), 1000);
}

#[test]
fn test_concurrency_bounded_by_workers() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore {
        delay: Duration::from_millis(5),
        ..MockStore::new().provisioned("t")
    });
    loader(&store).load(400, 16, 40, 3).unwrap();
    assert_eq!(store.calls(), 40);
    let max_in_flight = store.max_in_flight.load(Ordering::SeqCst);
    assert!(max_in_flight <= 3, "{} concurrent writes", max_in_flight);
    assert!(max_in_flight >= 1);
}

#[test]
fn test_row_failure_fails_load_and_drains() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore {
        fail_call: Some(3),
        ..MockStore::new().provisioned("t")
    });
    let err = loader(&store).load(1000, 64, 10, 4).unwrap_err();
    match err {
        LoadError::RowMutation { table, source, .. } => {
            assert_eq!(table, "t");
            assert_eq!(source, StoreError::Status { code: 10, message: "aborted".to_string() });
        }
        other => panic!("unexpected error {:?}", other),
    }
    // every batch was still attempted exactly once
    assert_eq!(store.calls(), 10);
}

#[test]
fn test_worker_panic_is_reported() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore {
        panic_call: Some(2),
        ..MockStore::new().provisioned("t")
    });
    let err = loader(&store).load(100, 8, 10, 3).unwrap_err();
    match err {
        LoadError::WorkerLost(msg) => assert_eq!(msg, "received 9 of 10 batch results"),
        other => panic!("unexpected error {:?}", other),
    }
    // the surviving workers drained the rest of the queue
    assert_eq!(store.calls(), 10);
    assert_eq!(store.inner.row_count("t"), 90);
}

#[test]
fn test_transport_failure() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore {
        fail_transport: true,
        ..MockStore::new().provisioned("t")
    });
    let err = loader(&store).load(100, 64, 5, 2).unwrap_err();
    assert!(matches!(err, LoadError::BulkWrite { rows: 20, source: StoreError::Transport(_), .. }));
    assert_eq!(store.calls(), 5);
}

#[test]
fn test_key_failure_skips_write() {
    let _ = env_logger::try_init();
    let store = Arc::new(MockStore::new().provisioned("t"));
    let err = loader(&store)
        .with_key_source(Arc::new(BrokenKeys))
        .load(100, 64, 5, 2)
        .unwrap_err();
    assert!(matches!(err, LoadError::KeyGeneration(_)));
    assert_eq!(store.calls(), 0);
}

#[test]
fn test_invalid_plan_starts_nothing() {
    let store = Arc::new(MockStore::new().provisioned("t"));
    for (rows, batches, workers) in [(0, 10, 4), (100, 0, 4), (100, 10, 0), (5, 10, 4)] {
        let err = loader(&store).load(rows, 64, batches, workers).unwrap_err();
        assert!(matches!(err, LoadError::InvalidPlan(_)), "{:?}", err);
    }
    assert_eq!(store.calls(), 0);
}

#[test]
fn test_reset_missing_table() {
    let store = Arc::new(MockStore::new());
    TableProvisioner::new(store.clone(), "family").reset("fresh").unwrap();
    assert_eq!(
        *store.admin_log.lock().unwrap(),
        vec!["delete fresh", "create fresh", "family fresh family"]
    );
    assert!(store.inner.table_exists("fresh"));
}

#[test]
fn test_reset_failure() {
    struct NoAdmin;
    impl WideColumnStore for NoAdmin {
        fn delete_table(&self, table: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound(table.to_string()))
        }
        fn create_table(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Status {
                code: 403,
                message: "PERMISSION_DENIED".to_string(),
            })
        }
        fn create_column_family(&self, _: &str, _: &str) -> Result<(), StoreError> {
            unreachable!()
        }
        fn bulk_write(&self, _: &str, _: &[Row]) -> Result<Vec<Option<StoreError>>, StoreError> {
            unreachable!()
        }
        fn point_read(&self, _: &str, _: &[String], _: ReadFilter) -> Result<Vec<RowLookup>, StoreError> {
            unreachable!()
        }
    }
    let err = TableProvisioner::new(Arc::new(NoAdmin), "family")
        .reset("t")
        .unwrap_err();
    assert!(matches!(err, LoadError::Provisioning { source: StoreError::Status { code: 403, .. }, .. }));
}

#[test]
fn test_lookup_duplicates() {
    let store = Arc::new(MockStore::new().provisioned("t"));
    let row = Row {
        key: "A".to_string(),
        mutation: tableload::CellMutation {
            family: "family".to_string(),
            column: "column".to_string(),
            timestamp_micros: 1000,
            value: b"v".to_vec(),
        },
    };
    store.inner.bulk_write("t", &[row]).unwrap();
    let keys = vec!["A".to_string(), "B".to_string(), "A".to_string()];
    let lookups = LookupVerifier::new(TableHandle::open(store, "t"))
        .verify(&keys)
        .unwrap();
    assert_eq!(
        lookups,
        vec![
            RowLookup { key: "A".to_string(), found: true },
            RowLookup { key: "B".to_string(), found: false },
            RowLookup { key: "A".to_string(), found: true },
        ]
    );
}

#[test]
fn test_lookup_without_keys() {
    let store = Arc::new(MemoryStore::new());
    let lookups = LookupVerifier::new(TableHandle::open(store, "absent"))
        .verify(&[])
        .unwrap();
    assert_eq!(lookups, vec![]);
}

#[test]
fn test_harness_end_to_end() {
    let _ = env_logger::try_init();
    let store = Arc::new(MemoryStore::new());
    let options = Options {
        table: "harness".to_string(),
        total_rows: 2000,
        bytes_per_row: 128,
        batch_count: 8,
        worker_count: 4,
        ..Options::default()
    };
    let summary = tableload::run(&options, store.clone()).unwrap();
    let report = summary.report.unwrap();
    assert_eq!(report.rows_written, 2000);
    assert_eq!(store.row_count("harness"), 2000);
    // the sample keys are not among the generated uuids
    assert_eq!(summary.lookups.len(), 4);
    assert_eq!(summary.found(), 0);

    // a second run starts from an empty table
    tableload::run(&options, store.clone()).unwrap();
    assert_eq!(store.row_count("harness"), 2000);
}

#[test]
fn test_harness_read_only() {
    let store = Arc::new(MemoryStore::new());
    let options = Options {
        table: "absent".to_string(),
        populate: false,
        ..Options::default()
    };
    let err = tableload::run(&options, store.clone()).unwrap_err();
    assert!(matches!(err, LoadError::Read { source: StoreError::NotFound(_), .. }));
    assert!(!store.table_exists("absent"));
}
