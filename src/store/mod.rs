use std::fmt;
use std::sync::Arc;

use crate::errors::StoreError;
use crate::ingest::row_gen::Row;

pub mod bigtable;
pub mod credentials;
pub mod memory;

pub use self::bigtable::BigtableStore;
pub use self::memory::MemoryStore;

/// Administrative and data-plane operations the load harness needs from a
/// wide-column store. Implementations must tolerate concurrent callers.
pub trait WideColumnStore: Send + Sync {
    /// Returns `StoreError::NotFound` if the table does not exist.
    fn delete_table(&self, table: &str) -> Result<(), StoreError>;
    fn create_table(&self, table: &str) -> Result<(), StoreError>;
    fn create_column_family(&self, table: &str, family: &str) -> Result<(), StoreError>;
    /// Applies all rows in a single request. The returned statuses are aligned
    /// with `rows` by index, `None` meaning the row was applied.
    fn bulk_write(&self, table: &str, rows: &[Row]) -> Result<Vec<Option<StoreError>>, StoreError>;
    /// Looks up every key in `keys`, preserving order and duplicates.
    fn point_read(
        &self,
        table: &str,
        keys: &[String],
        filter: ReadFilter,
    ) -> Result<Vec<RowLookup>, StoreError>;
}

/// A single cell write: `family:column @ timestamp = value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellMutation {
    pub family: String,
    pub column: String,
    pub timestamp_micros: i64,
    pub value: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadFilter {
    /// Only the most recent version of each cell.
    LatestVersion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowLookup {
    pub key: String,
    pub found: bool,
}

/// Handle to a named table on a shared store client.
#[derive(Clone)]
pub struct TableHandle {
    store: Arc<dyn WideColumnStore>,
    name: String,
}

impl TableHandle {
    pub fn open(store: Arc<dyn WideColumnStore>, name: &str) -> TableHandle {
        TableHandle {
            store,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bulk_write(&self, rows: &[Row]) -> Result<Vec<Option<StoreError>>, StoreError> {
        self.store.bulk_write(&self.name, rows)
    }

    pub fn point_read(&self, keys: &[String], filter: ReadFilter) -> Result<Vec<RowLookup>, StoreError> {
        self.store.point_read(&self.name, keys, filter)
    }
}

impl fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TableHandle").field("name", &self.name).finish()
    }
}
