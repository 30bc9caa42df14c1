//! Drives [`Pool::check_connections`] on a fixed period.
use std::future::Future;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{Pool, Resource};

impl<T: Resource> Pool<T> {
    /// Run a maintenance pass every `period` until `shutdown` resolves or the pool is closed.
    ///
    /// The first pass runs one `period` after the call.
    /// A pass in progress when `shutdown` resolves is allowed to finish.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    #[tracing::instrument(skip_all, name = "pool_maintenance", fields(period = ?period))]
    pub async fn run_maintenance_until_shutdown(
        &self,
        period: Duration,
        shutdown: impl Future<Output = ()>,
    ) {
        assert!(!period.is_zero(), "the maintenance period must be non-zero");
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = shutdown.fuse();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // prefer handling a shutdown over starting yet another pass
                biased;

                _ = &mut shutdown => {
                    tracing::info!("pool maintenance received shutdown event");
                    break;
                }
                _ = ticker.tick() => {
                    if self.is_closed() {
                        break;
                    }
                    self.check_connections().await;
                }
            }
        }
    }

    /// Spawn [`Pool::run_maintenance_until_shutdown`] on the current tokio runtime.
    ///
    /// Maintenance stops when the returned handle is shut down or dropped.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, or if called outside of a tokio runtime.
    pub fn spawn_maintenance(&self, period: Duration) -> MaintenanceHandle {
        // Panic in the caller's task, not in the spawned one.
        assert!(!period.is_zero(), "the maintenance period must be non-zero");
        let (stop, stopped) = oneshot::channel::<()>();
        let pool = self.clone();
        let task = tokio::spawn(async move {
            pool.run_maintenance_until_shutdown(period, stopped.map(|_| ()))
                .await
        });
        MaintenanceHandle { stop, task }
    }
}

/// Controls a maintenance task started with [`Pool::spawn_maintenance`].
pub struct MaintenanceHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Stop the maintenance task and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Pool maintenance task failed: {}", e);
        }
    }

    /// Whether the maintenance task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
