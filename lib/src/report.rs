use std::fmt;
use std::time::Duration;

/// Terminal state of one write task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The deadline passed before the write was confirmed.
    Aborted,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub task_count: usize,
    pub done: usize,
    pub aborted: usize,
    pub failed: usize,
    pub runtime: Duration,
}

impl Report {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome>, runtime: Duration) -> Self {
        let mut report = Report {
            task_count: 0,
            done: 0,
            aborted: 0,
            failed: 0,
            runtime,
        };
        for outcome in outcomes {
            report.task_count += 1;
            match outcome {
                Outcome::Done => report.done += 1,
                Outcome::Aborted => report.aborted += 1,
                Outcome::Failed => report.failed += 1,
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.done + self.aborted + self.failed
    }

    /// Completed writes per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.runtime.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.done as f64 / secs
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[OVERALL], TaskCount, {}", self.task_count)?;
        writeln!(f, "[OVERALL], RunTime(ms), {}", self.runtime.as_millis())?;
        writeln!(f, "[OVERALL], Throughput(ops/sec), {}", self.throughput())?;
        writeln!(f, "[INSERT], Done, {}", self.done)?;
        writeln!(f, "[INSERT], Aborted, {}", self.aborted)?;
        write!(f, "[INSERT], Failed, {}", self.failed)
    }
}
