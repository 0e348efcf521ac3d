use thiserror::Error;

/// Failures reported by a `WideColumnStore` backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("status {code}: {message}")]
    Status { code: i32, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to generate row key: {0}")]
    KeyGeneration(String),
    #[error("invalid load plan: {0}")]
    InvalidPlan(String),
    #[error("bulk write of {rows} rows to table {table} failed: {source}")]
    BulkWrite {
        table: String,
        rows: usize,
        #[source]
        source: StoreError,
    },
    #[error("mutation for row {key} in table {table} failed: {source}")]
    RowMutation {
        table: String,
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to provision table {table}: {source}")]
    Provisioning {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("point read on table {table} failed: {source}")]
    Read {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("worker pool lost results: {0}")]
    WorkerLost(String),
}

#[macro_export]
macro_rules! bail {
    ($kind:expr, $e:expr) => {
        return Err($kind($e.to_owned()));
    };
    ($kind:expr, $fmt:expr, $($arg:tt)+) => {
        return Err($kind(format!($fmt, $($arg)+).to_owned()));
    };
}
