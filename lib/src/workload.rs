mod series_workload;

pub use series_workload::SeriesWorkload;

use crate::db::DB;
use crate::deadline::Deadline;
use crate::report::Outcome;
use async_trait::async_trait;

#[async_trait]
pub trait Workload: Send + Sync {
    /// Runs one write task to a terminal state.
    async fn do_insert<T: DB>(&self, db: &T, deadline: &Deadline) -> Outcome;
}
