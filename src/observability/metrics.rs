use prometheus::{register_counter, register_gauge};
use prometheus::{Counter, Encoder, Gauge, TextEncoder};

lazy_static! {
    pub static ref ROWS_WRITTEN: Counter =
        register_counter!("rows_written", "Number of rows written by successful batches").unwrap();
    pub static ref BYTES_WRITTEN: Counter =
        register_counter!("bytes_written", "Payload bytes written by successful batches").unwrap();
    pub static ref BULK_WRITE_REQUESTS: Counter =
        register_counter!("bulk_write_requests", "Number of bulk write requests issued").unwrap();
    pub static ref BATCH_OK_COUNT: Counter =
        register_counter!("batch_ok_count", "Number of batches written successfully").unwrap();
    pub static ref BATCH_ERROR_COUNT: Counter =
        register_counter!("batch_error_count", "Number of batches that failed").unwrap();
    pub static ref ROW_LOOKUP_COUNT: Counter =
        register_counter!("row_lookup_count", "Number of point lookups issued").unwrap();
    pub static ref LAST_RUN_ROWS_PER_SECOND: Gauge =
        register_gauge!("last_run_rows_per_second", "Throughput of the most recent load run").unwrap();
}

/// Renders all registered metrics in the Prometheus text exposition format.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::warn!("Failed to encode metrics: {}", err);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
