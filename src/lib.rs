#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod errors;
pub mod bulk_loader;
pub mod harness;
pub mod ingest;
pub mod observability;
pub mod options;
pub mod perf_counter;
pub mod provision;
pub mod scheduler;
pub mod store;
pub mod unit_fmt;
pub mod verify;

pub use crate::bulk_loader::{BulkLoader, ThroughputReport};
pub use crate::errors::{LoadError, StoreError};
pub use crate::harness::{run, RunSummary};
pub use crate::ingest::{decompose, BatchJob, LoadPlan, Row, RowGenerator, RowSpec};
pub use crate::options::{Backend, Options};
pub use crate::provision::TableProvisioner;
pub use crate::store::{CellMutation, MemoryStore, ReadFilter, RowLookup, TableHandle, WideColumnStore};
pub use crate::verify::LookupVerifier;
