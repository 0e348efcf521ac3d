pub mod plan;
pub mod row_gen;

pub use self::plan::{decompose, BatchJob, LoadPlan};
pub use self::row_gen::{KeySource, Row, RowGenerator, RowSpec, UuidKeySource};
