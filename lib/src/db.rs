use async_trait::async_trait;
use log::info;

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::record::{SeriesRecord, TablePath};

/// Session and transaction provider for a database backend.
///
/// Implementations own retries: `upsert` may be re-applied on transient
/// failures until `deadline` expires, which is safe because writing the
/// same record twice leaves the same row.
#[async_trait]
pub trait DB: Send + Sync {
    /// Creates the series table. Returns `Error::TableExists` when the
    /// table is already there.
    async fn create_table(&self, table: &TablePath) -> Result<()>;

    async fn upsert(&self, table: &TablePath, record: &SeriesRecord, deadline: &Deadline)
        -> Result<()>;
}

/// Ensures `table` exists. An existing table is not an error; anything
/// else is returned as `Error::Schema`.
pub async fn init_schema<T: DB + ?Sized>(db: &T, table: &TablePath) -> Result<()> {
    match db.create_table(table).await {
        Ok(()) => {
            info!("created table {}", table);
            Ok(())
        }
        Err(Error::TableExists(_)) => {
            info!("table {} already exists", table);
            Ok(())
        }
        Err(Error::Schema(e)) => Err(Error::Schema(e)),
        Err(e) => Err(Error::Schema(Box::new(e))),
    }
}
