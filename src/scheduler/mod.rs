mod job_queue;
mod worker_pool;

pub use self::job_queue::JobQueue;
pub use self::worker_pool::{execute_batch, BatchContext, BatchResult, WorkerPool};
