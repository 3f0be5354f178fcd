use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Absolute point in time shared by every task of a burst.
///
/// Clones observe the same deadline and the same cancellation token, so
/// cancelling any clone expires all of them.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    token: CancellationToken,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self::at(Instant::now() + duration)
    }

    pub fn at(at: Instant) -> Self {
        Self {
            at,
            token: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        if self.token.is_cancelled() {
            return Duration::ZERO;
        }
        self.at.saturating_duration_since(Instant::now())
    }

    /// Resolves once the deadline passes or the token is cancelled.
    pub async fn expired(&self) {
        tokio::select! {
            _ = time::sleep_until(self.at) => {}
            _ = self.token.cancelled() => {}
        }
    }

    /// Drives `fut` until it completes or the deadline expires, whichever
    /// comes first. Ties go to the deadline.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        tokio::select! {
            biased;
            _ = self.expired() => Err(Error::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(time::sleep(duration)).await
    }
}
