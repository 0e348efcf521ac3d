use std::sync::Arc;

use crate::errors::{LoadError, StoreError};
use crate::store::WideColumnStore;

/// Recreates the target table from scratch before a load.
pub struct TableProvisioner {
    store: Arc<dyn WideColumnStore>,
    family: String,
}

impl TableProvisioner {
    pub fn new(store: Arc<dyn WideColumnStore>, family: &str) -> TableProvisioner {
        TableProvisioner {
            store,
            family: family.to_string(),
        }
    }

    /// Drops `table` if it exists, then creates it with the column family.
    pub fn reset(&self, table: &str) -> Result<(), LoadError> {
        let provisioning = |source: StoreError| LoadError::Provisioning {
            table: table.to_string(),
            source,
        };
        match self.store.delete_table(table) {
            Ok(()) => log::info!("Deleted existing table {}", table),
            Err(err) if err.is_not_found() => log::debug!("Table {} did not exist", table),
            Err(err) => return Err(provisioning(err)),
        }
        self.store.create_table(table).map_err(provisioning)?;
        self.store
            .create_column_family(table, &self.family)
            .map_err(provisioning)?;
        log::info!("Created table {} with column family {}", table, self.family);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_reset_missing_table() {
        let store = Arc::new(MemoryStore::new());
        let provisioner = TableProvisioner::new(store.clone(), "family");
        provisioner.reset("fresh").unwrap();
        assert!(store.table_exists("fresh"));
    }

    #[test]
    fn test_reset_is_repeatable() {
        let store = Arc::new(MemoryStore::new());
        let provisioner = TableProvisioner::new(store.clone(), "family");
        provisioner.reset("t").unwrap();
        provisioner.reset("t").unwrap();
        assert!(store.table_exists("t"));
        assert_eq!(store.row_count("t"), 0);
    }
}
