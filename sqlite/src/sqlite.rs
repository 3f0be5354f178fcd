use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use burst::db::DB;
use burst::deadline::Deadline;
use burst::error::{Error, Result};
use burst::record::{ColumnType, SeriesRecord, TablePath, COLUMNS, PRIMARY_KEY};
use itertools::Itertools;
use log::{debug, info};
use rusqlite::{named_params, Connection, ErrorCode, OptionalExtension};
use tokio::task::{self, JoinError};

const BUSY_TIMEOUT: Duration = Duration::from_millis(50);
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq, Eq)]
enum Target {
    Memory,
    File(PathBuf),
}

fn parse_dsn(dsn: &str) -> Result<Target> {
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .ok_or_else(|| Error::Connection(format!("unsupported connection string {dsn}").into()))?;
    match rest {
        "" => Err(Error::Connection(
            format!("missing database path in {dsn}").into(),
        )),
        ":memory:" => Ok(Target::Memory),
        path => Ok(Target::File(PathBuf::from(path))),
    }
}

/// Single SQLite connection shared by all write tasks.
///
/// rusqlite is blocking, so every statement runs on tokio's blocking pool
/// while holding the connection lock.
///
/// SQLite has no path namespace: only `TablePath::name` reaches the
/// database, the prefix shows up in logs only.
#[derive(Clone)]
pub struct SQLite {
    conn: Arc<Mutex<Connection>>,
}

impl SQLite {
    /// Opens `sqlite::memory:`, `sqlite://relative.db` or
    /// `sqlite:///absolute.db`.
    pub fn open(dsn: &str) -> Result<Self> {
        let target = parse_dsn(dsn)?;
        let conn = match &target {
            Target::Memory => Connection::open_in_memory(),
            Target::File(path) => Connection::open(path),
        }
        .map_err(|e| Error::Connection(Box::new(e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::Connection(Box::new(e)))?;
        if let Target::File(_) = target {
            let mode: String = conn
                .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
                .map_err(|e| Error::Connection(Box::new(e)))?;
            debug!("journal mode {}", mode);
        }
        info!("opened sqlite database {}", dsn);
        Ok(SQLite {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<R, F>(&self, f: F) -> Result<rusqlite::Result<R>, JoinError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<R> + Send + 'static,
    {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await
    }

    pub async fn count(&self, table: &TablePath) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.name());
        let n: i64 = self
            .with_conn(move |conn| conn.query_row(&sql, [], |row| row.get(0)))
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?
            .map_err(|e| Error::Connection(Box::new(e)))?;
        Ok(n as u64)
    }

    pub async fn read(&self, table: &TablePath, series_id: u64) -> Result<Option<SeriesRecord>> {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE {} = ?1",
            COLUMNS.iter().map(|c| c.name).join(", "),
            table.name(),
            PRIMARY_KEY
        );
        self.with_conn(move |conn| {
            conn.query_row(&sql, [series_id as i64], |row| {
                Ok(SeriesRecord {
                    series_id: row.get::<_, i64>(0)? as u64,
                    title: row.get(1)?,
                    series_info: row.get(2)?,
                    release_date: row.get(3)?,
                    comment: row.get(4)?,
                })
            })
            .optional()
        })
        .await
        .map_err(|e| Error::Connection(Box::new(e)))?
        .map_err(|e| Error::Connection(Box::new(e)))
    }
}

fn sql_type(kind: ColumnType) -> &'static str {
    match kind {
        ColumnType::Uint64 => "INTEGER",
        ColumnType::Text => "TEXT",
        // seconds since the epoch
        ColumnType::Datetime => "INTEGER",
    }
}

fn create_table_sql(table: &TablePath) -> String {
    let columns = COLUMNS
        .iter()
        .map(|c| {
            let null = if c.nullable { "" } else { " NOT NULL" };
            format!("{} {}{}", c.name, sql_type(c.kind), null)
        })
        .join(", ");
    format!(
        "CREATE TABLE \"{}\" ({}, PRIMARY KEY ({}))",
        table.name(),
        columns,
        PRIMARY_KEY
    )
}

fn upsert_sql(table: &TablePath) -> String {
    let names = COLUMNS.iter().map(|c| c.name).join(", ");
    let params = COLUMNS.iter().map(|c| format!(":{}", c.name)).join(", ");
    let updates = COLUMNS
        .iter()
        .filter(|c| c.name != PRIMARY_KEY)
        .map(|c| format!("{0} = excluded.{0}", c.name))
        .join(", ");
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {}",
        table.name(),
        names,
        params,
        PRIMARY_KEY,
        updates
    )
}

fn write_record(conn: &mut Connection, sql: &str, record: &SeriesRecord) -> rusqlite::Result<()> {
    // SQLite integers are signed; keep the bit pattern.
    let series_id = record.series_id as i64;
    let tx = conn.transaction()?;
    tx.execute(
        sql,
        named_params! {
            ":series_id": series_id,
            ":title": record.title,
            ":series_info": record.series_info,
            ":release_date": record.release_date,
            ":comment": record.comment,
        },
    )?;
    tx.commit()
}

fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn is_already_exists(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("already exists"))
}

#[async_trait]
impl DB for SQLite {
    async fn create_table(&self, table: &TablePath) -> Result<()> {
        let sql = create_table_sql(table);
        debug!("{}", sql);
        let res = self
            .with_conn(move |conn| conn.execute(&sql, []))
            .await
            .map_err(|e| Error::Schema(Box::new(e)))?;
        match res {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Err(Error::TableExists(table.to_string())),
            Err(e) => Err(Error::Schema(Box::new(e))),
        }
    }

    async fn upsert(
        &self,
        table: &TablePath,
        record: &SeriesRecord,
        deadline: &Deadline,
    ) -> Result<()> {
        let sql = Arc::new(upsert_sql(table));
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1;
        loop {
            let sql = sql.clone();
            let row = record.clone();
            let gate = deadline.clone();
            // A queued write may only get the lock after the deadline.
            let res = deadline
                .run(self.with_conn(move |conn| {
                    if gate.is_expired() {
                        return Ok(None);
                    }
                    write_record(conn, &sql, &row).map(Some)
                }))
                .await?
                .map_err(|e| Error::Write(Box::new(e)))?;
            match res {
                Ok(Some(())) => return Ok(()),
                Ok(None) => return Err(Error::DeadlineExceeded),
                Err(e) if is_transient(&e) => {
                    debug!(
                        "attempt {} for series {} failed: {}",
                        attempt, record.series_id, e
                    );
                    deadline.sleep(backoff).await?;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                Err(e) => return Err(Error::Write(Box::new(e))),
            }
        }
    }
}
