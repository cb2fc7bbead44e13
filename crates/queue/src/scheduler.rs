//! Scheduled maintenance.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use agora_common::AppResult;
use agora_core::{ModerationService, PurgeOutcome};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between purge runs.
    pub purge_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            purge_interval: Duration::from_secs(3600),
        }
    }
}

/// Executor for the periodic purge.
#[async_trait::async_trait]
pub trait PurgeExecutor: Send + Sync {
    /// Hard-delete soft-deleted content past the retention age.
    async fn purge(&self) -> AppResult<PurgeOutcome>;
}

#[async_trait::async_trait]
impl PurgeExecutor for ModerationService {
    async fn purge(&self) -> AppResult<PurgeOutcome> {
        Self::purge(self).await
    }
}

/// Run the scheduler with the given configuration and executor.
///
/// Spawns the periodic tasks and returns; the tasks run until the
/// process exits. Each run is independent and idempotent, so an
/// overlapping or repeated run changes nothing.
pub fn run_scheduler<E: PurgeExecutor + 'static>(config: &SchedulerConfig, executor: Arc<E>) {
    let purge_interval = config.purge_interval;

    tokio::spawn(async move {
        let mut interval = interval(purge_interval);
        loop {
            interval.tick().await;
            match executor.purge().await {
                Ok(outcome) => {
                    if outcome.posts_purged > 0 || outcome.threads_purged > 0 {
                        tracing::info!(
                            posts = outcome.posts_purged,
                            threads = outcome.threads_purged,
                            "Purge run finished"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Purge run failed");
                }
            }
        }
    });
}
