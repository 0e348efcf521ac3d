use std::sync::Arc;

use crate::bulk_loader::{BulkLoader, ThroughputReport};
use crate::errors::LoadError;
use crate::options::{Backend, Options};
use crate::provision::TableProvisioner;
use crate::store::{BigtableStore, MemoryStore, RowLookup, TableHandle, WideColumnStore};
use crate::verify::LookupVerifier;

#[derive(Debug)]
pub struct RunSummary {
    pub table: String,
    pub report: Option<ThroughputReport>,
    pub lookups: Vec<RowLookup>,
}

impl RunSummary {
    pub fn found(&self) -> usize {
        self.lookups.iter().filter(|l| l.found).count()
    }
}

/// Builds the store client selected by `options`.
pub fn connect(options: &Options) -> Result<Arc<dyn WideColumnStore>, LoadError> {
    match options.backend {
        Backend::Memory => Ok(Arc::new(MemoryStore::new())),
        Backend::Bigtable => {
            let token = options.credentials.load_token()?;
            log::debug!(
                "Connecting to {}/{} (credentials: {})",
                options.project,
                options.instance,
                options.credentials
            );
            Ok(Arc::new(BigtableStore::new(
                &options.project,
                &options.instance,
                &options.admin_endpoint,
                &options.data_endpoint,
                token,
            )))
        }
    }
}

/// Resets and populates the table if requested, then reads back the lookup
/// keys.
pub fn run(options: &Options, store: Arc<dyn WideColumnStore>) -> Result<RunSummary, LoadError> {
    log::info!(
        "Starting up: backend={} project={} instance={} table={}",
        options.backend,
        options.project,
        options.instance,
        options.table
    );
    let table = TableHandle::open(store.clone(), &options.table);

    let report = if options.populate {
        log::info!("Provisioning table {}", options.table);
        TableProvisioner::new(store, &options.column_family).reset(&options.table)?;
        let loader = BulkLoader::new(table.clone(), &options.column_family, &options.column);
        Some(loader.load(
            options.total_rows,
            options.bytes_per_row,
            options.batch_count,
            options.worker_count,
        )?)
    } else {
        log::info!("Skipping population of {}", options.table);
        None
    };

    let lookups = LookupVerifier::new(table).verify(&options.lookup_keys)?;
    let summary = RunSummary {
        table: options.table.clone(),
        report,
        lookups,
    };
    log::info!(
        "Done: {} of {} lookups found a row",
        summary.found(),
        summary.lookups.len()
    );
    Ok(summary)
}
