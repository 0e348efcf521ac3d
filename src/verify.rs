use crate::errors::LoadError;
use crate::observability::metrics;
use crate::store::{ReadFilter, RowLookup, TableHandle};

/// Keys read back after a load. They are fixed sample keys and are not
/// expected to match the freshly generated ones.
pub const SAMPLE_KEYS: &[&str] = &[
    "76b8a3923dfb9de5dc36b24227",
    "328f374e887de67fd55b2454a0",
    "328f374e887de67fd55b2454a0",
    "8d053c4cecd1cbb11a2fc8ec5d",
];

pub struct LookupVerifier {
    table: TableHandle,
}

impl LookupVerifier {
    pub fn new(table: TableHandle) -> LookupVerifier {
        LookupVerifier { table }
    }

    /// Reads the latest version of each key. The result has one entry per
    /// input key, in input order, duplicates included.
    pub fn verify(&self, keys: &[String]) -> Result<Vec<RowLookup>, LoadError> {
        if keys.is_empty() {
            log::info!("No lookup keys for {}", self.table.name());
            return Ok(Vec::new());
        }
        log::info!("Reading {} rows from {}", keys.len(), self.table.name());
        metrics::ROW_LOOKUP_COUNT.inc_by(keys.len() as f64);
        let lookups = self
            .table
            .point_read(keys, ReadFilter::LatestVersion)
            .map_err(|source| LoadError::Read {
                table: self.table.name().to_string(),
                source,
            })?;
        for lookup in &lookups {
            if lookup.found {
                log::info!("Found row {}", lookup.key);
            } else {
                log::info!("Row {} not found", lookup.key);
            }
        }
        Ok(lookups)
    }
}
