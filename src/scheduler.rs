use crate::executor::SnapshotExecutor;
use crate::model::RepoIdentity;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Default period between collection cycles.
pub const COLLECT_INTERVAL: Duration = Duration::from_secs(300);

/// Runs a collection cycle at startup and then once per interval.
///
/// A cycle that overruns the interval is followed immediately by the next
/// one; missed ticks are not replayed.
pub struct CollectionScheduler {
    executor: Arc<SnapshotExecutor>,
    repos: Vec<RepoIdentity>,
    period: Duration,
}

impl CollectionScheduler {
    pub fn new(executor: Arc<SnapshotExecutor>, repos: Vec<RepoIdentity>) -> Self {
        Self {
            executor,
            repos,
            period: COLLECT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Runs cycles forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Runs cycles until `shutdown` resolves. An in-flight cycle is dropped
    /// when shutdown fires.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.executor.run_cycle(&self.repos) => cycles += 1,
            }
        }

        info!(cycles, "Collection scheduler stopped");
    }
}
