use async_trait::async_trait;
use log::{debug, error};

use super::Workload;
use crate::db::DB;
use crate::deadline::Deadline;
use crate::error::Error;
use crate::generator::RecordGenerator;
use crate::properties::Properties;
use crate::record::TablePath;
use crate::report::Outcome;

/// Sleeps a random jitter, then upserts one random series record.
pub struct SeriesWorkload {
    generator: RecordGenerator,
    table: TablePath,
}

impl SeriesWorkload {
    pub fn new(props: &Properties) -> Self {
        Self {
            generator: RecordGenerator::new(props),
            table: props.table_path(),
        }
    }

    pub fn table(&self) -> &TablePath {
        &self.table
    }
}

#[async_trait]
impl Workload for SeriesWorkload {
    async fn do_insert<T: DB>(&self, db: &T, deadline: &Deadline) -> Outcome {
        let jitter = self.generator.jitter();
        if deadline.sleep(jitter).await.is_err() {
            debug!("deadline passed during {:?} jitter", jitter);
            return Outcome::Aborted;
        }

        let record = self.generator.next_record();
        match db.upsert(&self.table, &record, deadline).await {
            Ok(()) => Outcome::Done,
            Err(Error::DeadlineExceeded) => {
                debug!("deadline passed while writing series {}", record.series_id);
                Outcome::Aborted
            }
            Err(e) => {
                error!("error inserting series {}: {}", record.series_id, e);
                Outcome::Failed
            }
        }
    }
}
