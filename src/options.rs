use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::store::bigtable::{ADMIN_ENDPOINT, DATA_ENDPOINT};
use crate::store::credentials::CredentialsSource;
use crate::verify::SAMPLE_KEYS;

pub const DEFAULT_PROJECT: &str = "snap-tests-217018";
pub const DEFAULT_INSTANCE: &str = "testing";
pub const DEFAULT_FAMILY: &str = "family";
pub const DEFAULT_COLUMN: &str = "column";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Bigtable,
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Backend, String> {
        match s {
            "bigtable" => Ok(Backend::Bigtable),
            "memory" => Ok(Backend::Memory),
            _ => Err(format!("unknown backend `{}`, expected `bigtable` or `memory`", s)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Backend::Bigtable => write!(f, "bigtable"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

/// Configuration for one harness run. Built once at startup and only read
/// afterwards.
#[derive(Clone, Debug)]
pub struct Options {
    pub backend: Backend,
    pub project: String,
    pub instance: String,
    pub table: String,
    pub populate: bool,
    pub credentials: CredentialsSource,
    pub total_rows: usize,
    pub bytes_per_row: usize,
    pub batch_count: usize,
    pub worker_count: usize,
    pub column_family: String,
    pub column: String,
    pub lookup_keys: Vec<String>,
    pub admin_endpoint: String,
    pub data_endpoint: String,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            backend: Backend::Bigtable,
            project: DEFAULT_PROJECT.to_string(),
            instance: DEFAULT_INSTANCE.to_string(),
            table: generated_table_name(),
            populate: true,
            credentials: CredentialsSource::Env,
            total_rows: 100_000,
            bytes_per_row: 2 * 1024,
            batch_count: 50,
            worker_count: default_worker_count(),
            column_family: DEFAULT_FAMILY.to_string(),
            column: DEFAULT_COLUMN.to_string(),
            lookup_keys: sample_lookup_keys(),
            admin_endpoint: ADMIN_ENDPOINT.to_string(),
            data_endpoint: DATA_ENDPOINT.to_string(),
        }
    }
}

/// One worker per core.
pub fn default_worker_count() -> usize {
    num_cpus::get()
}

pub fn sample_lookup_keys() -> Vec<String> {
    SAMPLE_KEYS.iter().map(|k| k.to_string()).collect()
}

/// A fresh table name of the form `loadtest-<12 hex digits>`.
pub fn generated_table_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("loadtest-{}", &id[..12])
}
