pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[source] BoxError),

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Schema error: {0}")]
    Schema(#[source] BoxError),

    #[error("Write error: {0}")]
    Write(#[source] BoxError),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Invalid properties: {0}")]
    Properties(String),
}
