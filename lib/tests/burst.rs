use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use burst::db::{init_schema, DB};
use burst::deadline::Deadline;
use burst::error::{Error, Result};
use burst::properties::Properties;
use burst::record::{SeriesRecord, TablePath};
use burst::report::Outcome;
use burst::workload::{SeriesWorkload, Workload};
use burst::{burst_run, burst_run_until};

#[derive(Default)]
struct MemoryDb {
    tables: Mutex<HashSet<String>>,
    rows: Mutex<Vec<SeriesRecord>>,
    latency: Duration,
    fail_writes: bool,
}

impl MemoryDb {
    fn rows(&self) -> Vec<SeriesRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl DB for MemoryDb {
    async fn create_table(&self, table: &TablePath) -> Result<()> {
        if !self.tables.lock().unwrap().insert(table.to_string()) {
            return Err(Error::TableExists(table.to_string()));
        }
        Ok(())
    }

    async fn upsert(
        &self,
        _table: &TablePath,
        record: &SeriesRecord,
        deadline: &Deadline,
    ) -> Result<()> {
        deadline.sleep(self.latency).await?;
        if self.fail_writes {
            return Err(Error::Write("injected failure".into()));
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

fn workload(min_jitter_ms: u64, max_jitter_ms: u64) -> Arc<SeriesWorkload> {
    Arc::new(SeriesWorkload::new(&Properties {
        min_jitter_ms,
        max_jitter_ms,
        seed: Some(1),
        ..Properties::default()
    }))
}

#[tokio::test]
async fn init_schema_twice_is_ok() {
    let db = MemoryDb::default();
    let table = Properties::default().table_path();
    init_schema(&db, &table).await.unwrap();
    init_schema(&db, &table).await.unwrap();
    assert!(matches!(
        db.create_table(&table).await,
        Err(Error::TableExists(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn single_task_without_jitter_is_done() {
    let db = Arc::new(MemoryDb::default());
    let report = burst_run(db.clone(), workload(0, 0), 1, Duration::from_secs(2)).await;

    assert_eq!((report.done, report.aborted, report.failed), (1, 0, 0));
    assert!(report.runtime < Duration::from_secs(2));
    let rows = db.rows();
    assert_eq!(rows.len(), 1);
    let record = &rows[0];
    assert_eq!(record.title.len(), 10);
    assert!(record.title.bytes().all(|b| b.is_ascii_lowercase()));
    assert_eq!(record.series_info.len(), 10);
    assert!(record.series_info.bytes().all(|b| b.is_ascii_lowercase()));
    assert!(record.release_date < 60);
    assert_eq!(record.comment, "comment");
}

#[tokio::test(start_paused = true)]
async fn jitter_past_deadline_is_aborted() {
    let db = Arc::new(MemoryDb::default());
    let report = burst_run(db.clone(), workload(500, 500), 1, Duration::from_millis(10)).await;

    assert_eq!((report.done, report.aborted, report.failed), (0, 1, 0));
    assert!(db.rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_write_past_deadline_is_aborted() {
    let db = Arc::new(MemoryDb {
        latency: Duration::from_secs(5),
        ..MemoryDb::default()
    });
    let report = burst_run(db.clone(), workload(0, 0), 3, Duration::from_secs(1)).await;

    assert_eq!(report.aborted, 3);
    assert!(db.rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_writes_are_counted() {
    let db = Arc::new(MemoryDb {
        fail_writes: true,
        ..MemoryDb::default()
    });
    let report = burst_run(db, workload(0, 10), 4, Duration::from_secs(1)).await;

    assert_eq!((report.done, report.aborted, report.failed), (0, 0, 4));
}

#[tokio::test(start_paused = true)]
async fn hundred_tasks_all_terminate() {
    let db = Arc::new(MemoryDb {
        latency: Duration::from_millis(20),
        ..MemoryDb::default()
    });
    let report = burst_run(db.clone(), workload(0, 500), 100, Duration::from_secs(1)).await;

    assert_eq!(report.task_count, 100);
    assert_eq!(report.total(), 100);
    assert_eq!(report.done, 100);

    let rows = db.rows();
    assert_eq!(rows.len(), report.done);
    let ids: HashSet<_> = rows.iter().map(|r| r.series_id).collect();
    assert_eq!(ids.len(), rows.len());
}

#[tokio::test(start_paused = true)]
async fn submissions_never_exceed_tasks() {
    let db = Arc::new(MemoryDb::default());
    let report = burst_run(db.clone(), workload(0, 500), 50, Duration::from_millis(250)).await;

    assert_eq!(report.total(), 50);
    assert!(report.done > 0 && report.aborted > 0);
    assert_eq!(db.rows().len(), report.done);
}

#[tokio::test(start_paused = true)]
async fn cancelled_deadline_aborts_everything() {
    let db = Arc::new(MemoryDb::default());
    let deadline = Deadline::after(Duration::from_secs(60));
    deadline.cancel();
    let report = burst_run_until(db.clone(), workload(0, 100), 10, deadline).await;

    assert_eq!(report.aborted, 10);
    assert!(db.rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn single_insert_with_explicit_deadline() {
    let db = MemoryDb::default();
    let wl = workload(0, 0);
    let deadline = Deadline::after(Duration::from_millis(100));
    assert_eq!(wl.do_insert(&db, &deadline).await, Outcome::Done);
    assert_eq!(wl.table().to_string(), "/local/series");
    assert_eq!(db.rows().len(), 1);
}
