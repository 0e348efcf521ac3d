use crate::bail;
use crate::errors::LoadError;

/// A unit of work: generate and write `rows` rows in a single bulk request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchJob {
    pub id: usize,
    pub rows: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadPlan {
    pub total_rows: usize,
    pub batch_count: usize,
    pub rows_per_batch: usize,
    pub worker_count: usize,
    pub bytes_per_row: usize,
}

impl LoadPlan {
    pub fn new(
        total_rows: usize,
        bytes_per_row: usize,
        batch_count: usize,
        worker_count: usize,
    ) -> Result<LoadPlan, LoadError> {
        let rows_per_batch = rows_per_batch(total_rows, batch_count)?;
        if worker_count == 0 {
            bail!(LoadError::InvalidPlan, "worker count must be positive");
        }
        Ok(LoadPlan {
            total_rows,
            batch_count,
            rows_per_batch,
            worker_count,
            bytes_per_row,
        })
    }

    /// Rows that will actually be written. Any remainder of
    /// `total_rows / batch_count` is dropped rather than spread over batches.
    pub fn realized_rows(&self) -> usize {
        self.rows_per_batch * self.batch_count
    }

    pub fn dropped_rows(&self) -> usize {
        self.total_rows - self.realized_rows()
    }

    pub fn jobs(&self) -> Vec<BatchJob> {
        (0..self.batch_count)
            .map(|id| BatchJob {
                id,
                rows: self.rows_per_batch,
            })
            .collect()
    }
}

/// Splits `total_rows` into `batch_count` equally sized jobs, rounding down.
pub fn decompose(total_rows: usize, batch_count: usize) -> Result<Vec<BatchJob>, LoadError> {
    let rows = rows_per_batch(total_rows, batch_count)?;
    Ok((0..batch_count).map(|id| BatchJob { id, rows }).collect())
}

fn rows_per_batch(total_rows: usize, batch_count: usize) -> Result<usize, LoadError> {
    if total_rows == 0 {
        bail!(LoadError::InvalidPlan, "total row count must be positive");
    }
    if batch_count == 0 {
        bail!(LoadError::InvalidPlan, "batch count must be positive");
    }
    if total_rows < batch_count {
        bail!(
            LoadError::InvalidPlan,
            "{} rows cannot fill {} batches",
            total_rows,
            batch_count
        );
    }
    Ok(total_rows / batch_count)
}
