use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use super::{ReadFilter, RowLookup, WideColumnStore};
use crate::errors::StoreError;
use crate::ingest::row_gen::Row;

// gRPC status codes
const ALREADY_EXISTS: i32 = 6;
const FAILED_PRECONDITION: i32 = 9;

/// In-process wide-column store. Keeps every written version of every cell.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemTable>>,
}

#[derive(Default)]
struct MemTable {
    families: HashSet<String>,
    // row key -> (family, column) -> versions ordered by timestamp
    rows: HashMap<String, BTreeMap<(String, String), Vec<(i64, Vec<u8>)>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.read().unwrap().contains_key(table)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Most recent value of `family:column` in `key`.
    pub fn latest_value(&self, table: &str, key: &str, family: &str, column: &str) -> Option<Vec<u8>> {
        let tables = self.tables.read().unwrap();
        let versions = tables
            .get(table)?
            .rows
            .get(key)?
            .get(&(family.to_string(), column.to_string()))?;
        versions.last().map(|(_, value)| value.clone())
    }
}

impl WideColumnStore for MemoryStore {
    fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        match self.tables.write().unwrap().remove(table) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("table {}", table))),
        }
    }

    fn create_table(&self, table: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        if tables.contains_key(table) {
            return Err(StoreError::Status {
                code: ALREADY_EXISTS,
                message: format!("table {} already exists", table),
            });
        }
        tables.insert(table.to_string(), MemTable::default());
        Ok(())
    }

    fn create_column_family(&self, table: &str, family: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        match tables.get_mut(table) {
            Some(t) => {
                t.families.insert(family.to_string());
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("table {}", table))),
        }
    }

    fn bulk_write(&self, table: &str, rows: &[Row]) -> Result<Vec<Option<StoreError>>, StoreError> {
        let mut tables = self.tables.write().unwrap();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound(format!("table {}", table)))?;
        let mut statuses = Vec::with_capacity(rows.len());
        for row in rows {
            let cell = &row.mutation;
            if !t.families.contains(&cell.family) {
                statuses.push(Some(StoreError::Status {
                    code: FAILED_PRECONDITION,
                    message: format!("unknown column family {}", cell.family),
                }));
                continue;
            }
            let versions = t
                .rows
                .entry(row.key.clone())
                .or_default()
                .entry((cell.family.clone(), cell.column.clone()))
                .or_default();
            match versions.binary_search_by_key(&cell.timestamp_micros, |(ts, _)| *ts) {
                Ok(i) => versions[i].1 = cell.value.clone(),
                Err(i) => versions.insert(i, (cell.timestamp_micros, cell.value.clone())),
            }
            statuses.push(None);
        }
        Ok(statuses)
    }

    fn point_read(
        &self,
        table: &str,
        keys: &[String],
        filter: ReadFilter,
    ) -> Result<Vec<RowLookup>, StoreError> {
        let tables = self.tables.read().unwrap();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::NotFound(format!("table {}", table)))?;
        Ok(keys
            .iter()
            .map(|key| {
                let found = match filter {
                    ReadFilter::LatestVersion => t
                        .rows
                        .get(key)
                        .map(|cells| cells.values().any(|versions| !versions.is_empty()))
                        .unwrap_or(false),
                };
                RowLookup {
                    key: key.clone(),
                    found,
                }
            })
            .collect())
    }
}
