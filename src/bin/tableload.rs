use std::process;

use structopt::StructOpt;
use tableload::options::{
    default_worker_count, generated_table_name, sample_lookup_keys, Backend, Options, DEFAULT_COLUMN,
    DEFAULT_FAMILY, DEFAULT_INSTANCE, DEFAULT_PROJECT,
};
use tableload::store::bigtable::{ADMIN_ENDPOINT, DATA_ENDPOINT};
use tableload::store::credentials::CredentialsSource;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "tableload",
    about = "Populate a wide-column table with synthetic rows and read a few back."
)]
struct Opt {
    /// Store backend: `bigtable` or `memory`
    #[structopt(long, name = "BACKEND", default_value = "bigtable")]
    backend: Backend,

    /// GCP project
    #[structopt(long, name = "PROJECT", default_value = DEFAULT_PROJECT)]
    project: String,

    /// Bigtable instance
    #[structopt(long, name = "INSTANCE", default_value = DEFAULT_INSTANCE)]
    instance: String,

    /// Table name [default: loadtest-<random>]
    #[structopt(long, name = "TABLE")]
    table: Option<String>,

    /// Only read, don't recreate and populate the table
    #[structopt(long)]
    no_populate: bool,

    /// Access token source: `none`, `env` or `file:<path>`
    #[structopt(long, name = "CREDENTIALS", default_value = "env")]
    credentials: CredentialsSource,

    /// Total number of rows to write
    #[structopt(long, name = "ROWS", default_value = "100000")]
    rows: usize,

    /// Payload bytes per row
    #[structopt(long, name = "BYTES", default_value = "2048")]
    row_bytes: usize,

    /// Number of bulk write batches
    #[structopt(long, name = "BATCHES", default_value = "50")]
    batches: usize,

    /// Number of concurrent workers [default: number of cores]
    #[structopt(long, name = "WORKERS")]
    workers: Option<usize>,

    /// Column family to create and write to
    #[structopt(long, name = "FAMILY", default_value = DEFAULT_FAMILY)]
    family: String,

    /// Column qualifier to write
    #[structopt(long, name = "COLUMN", default_value = DEFAULT_COLUMN)]
    column: String,

    /// Row key to read back after loading, may be repeated
    #[structopt(long = "lookup-key", name = "KEY")]
    lookup_keys: Vec<String>,

    /// Bigtable admin API endpoint
    #[structopt(long, name = "ADMIN_URL", default_value = ADMIN_ENDPOINT)]
    admin_endpoint: String,

    /// Bigtable data API endpoint
    #[structopt(long, name = "DATA_URL", default_value = DATA_ENDPOINT)]
    data_endpoint: String,

    /// Print Prometheus metrics on exit
    #[structopt(long)]
    print_metrics: bool,
}

impl Opt {
    fn options(self) -> Options {
        Options {
            backend: self.backend,
            project: self.project,
            instance: self.instance,
            table: self.table.unwrap_or_else(generated_table_name),
            populate: !self.no_populate,
            credentials: self.credentials,
            total_rows: self.rows,
            bytes_per_row: self.row_bytes,
            batch_count: self.batches,
            worker_count: self.workers.unwrap_or_else(default_worker_count),
            column_family: self.family,
            column: self.column,
            lookup_keys: if self.lookup_keys.is_empty() {
                sample_lookup_keys()
            } else {
                self.lookup_keys
            },
            admin_endpoint: self.admin_endpoint,
            data_endpoint: self.data_endpoint,
        }
    }
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    let print_metrics = opt.print_metrics;
    let options = opt.options();

    let result = tableload::harness::connect(&options)
        .and_then(|store| tableload::harness::run(&options, store));

    if print_metrics {
        print!("{}", tableload::observability::metrics::render());
    }
    if let Err(err) = result {
        log::error!("{}", err);
        process::exit(1);
    }
}
