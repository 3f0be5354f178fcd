use crate::db::{init_schema, DB};
use crate::deadline::Deadline;
use crate::report::{Outcome, Report};
use crate::workload::{SeriesWorkload, Workload};
use anyhow::{Context, Result};
use futures::future::join_all;
use log::{error, info, warn};
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use properties::Properties;
use structopt::StructOpt;

pub mod db;
pub mod deadline;
pub mod error;
pub mod generator;
pub mod properties;
pub mod record;
pub mod report;
pub mod workload;

#[derive(StructOpt, Debug)]
#[structopt(name = "burst")]
pub struct Opt {
    /// TOML properties file; built-in defaults are used when omitted.
    #[structopt(short, long, parse(from_os_str))]
    pub workload: Option<PathBuf>,
    /// Connection string of the target database.
    #[structopt(short, long, default_value = "sqlite://burst.db")]
    pub database: String,
    /// Number of concurrent write tasks.
    #[structopt(short, long)]
    pub count: Option<u64>,
    /// Length of the burst window in milliseconds.
    #[structopt(long)]
    pub duration_ms: Option<u64>,
    #[structopt(long)]
    pub seed: Option<u64>,
}

impl Opt {
    /// Loads the properties file, if any, and applies command line overrides.
    pub fn properties(&self) -> Result<Properties> {
        let mut props = match &self.workload {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading workload {}", path.display()))?;
                Properties::from_toml(&raw)?
            }
            None => Properties::default(),
        };
        if let Some(count) = self.count {
            props.task_count = count;
        }
        if let Some(duration_ms) = self.duration_ms {
            props.duration_ms = duration_ms;
        }
        if self.seed.is_some() {
            props.seed = self.seed;
        }
        props.validate()?;
        Ok(props)
    }
}

/// Runs `task_count` write tasks against a deadline `duration` from now.
pub async fn burst_run<T: DB + 'static, W: Workload + 'static>(
    db: Arc<T>,
    wl: Arc<W>,
    task_count: usize,
    duration: Duration,
) -> Report {
    burst_run_until(db, wl, task_count, Deadline::after(duration)).await
}

/// Spawns `task_count` write tasks and waits until every one of them has
/// reached a terminal state.
pub async fn burst_run_until<T: DB + 'static, W: Workload + 'static>(
    db: Arc<T>,
    wl: Arc<W>,
    task_count: usize,
    deadline: Deadline,
) -> Report {
    info!(
        "starting {} write tasks, deadline in {} ms",
        task_count,
        deadline.remaining().as_millis()
    );
    let start = Instant::now();
    let tasks = (0..task_count).map(|_| {
        let db = db.clone();
        let wl = wl.clone();
        let deadline = deadline.clone();
        tokio::task::spawn(async move { wl.do_insert(&*db, &deadline).await })
    });
    let outcomes = join_all(tasks).await.into_iter().map(|res| {
        res.unwrap_or_else(|e| {
            error!("write task did not finish: {}", e);
            Outcome::Failed
        })
    });
    let report = Report::from_outcomes(outcomes, start.elapsed());
    info!(
        "burst finished: {} done, {} aborted, {} failed",
        report.done, report.aborted, report.failed
    );
    report
}

pub async fn burst_main<T, F, Fut>(connect: F) -> Result<()>
where
    T: DB + 'static,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = error::Result<T>>,
{
    let opt = Opt::from_args();
    let props = opt.properties()?;

    info!("connecting to {}", opt.database);
    let db = connect(opt.database.clone())
        .await
        .with_context(|| format!("connecting to {}", opt.database))?;

    let wl = SeriesWorkload::new(&props);
    init_schema(&db, wl.table())
        .await
        .with_context(|| format!("creating table {}", wl.table()))?;

    let deadline = Deadline::after(props.duration());
    let interrupt = {
        let deadline = deadline.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding writes");
                deadline.cancel();
            }
        })
    };

    let report = burst_run_until(
        Arc::new(db),
        Arc::new(wl),
        props.task_count as usize,
        deadline,
    )
    .await;
    interrupt.abort();

    println!("{}", report);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let opt = Opt::from_iter(["burst", "-c", "3", "--duration-ms", "250", "--seed", "9"]);
        let props = opt.properties().unwrap();
        assert_eq!(props.task_count, 3);
        assert_eq!(props.duration_ms, 250);
        assert_eq!(props.seed, Some(9));
        assert_eq!(opt.database, "sqlite://burst.db");
    }

    #[test]
    fn zero_count_is_rejected() {
        let opt = Opt::from_iter(["burst", "--count", "0"]);
        assert!(opt.properties().is_err());
    }

    #[test]
    fn missing_workload_file() {
        let opt = Opt::from_iter(["burst", "-w", "/nonexistent/burst.toml"]);
        assert!(opt.properties().is_err());
    }
}
