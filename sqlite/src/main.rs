mod sqlite;

use anyhow::Result;
use sqlite::SQLite;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    burst::burst_main(|dsn| async move { SQLite::open(&dsn) }).await
}
