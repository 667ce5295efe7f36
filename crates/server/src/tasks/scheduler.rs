//! Background task scheduler.
//!
//! GC runs daily at the configured hour (UTC); the lifecycle sweep runs
//! on its interval. Each job type runs in its own loop task and therefore
//! never overlaps its own previous run; different jobs may run
//! concurrently. Start and stop are idempotent, and stop waits for
//! in-flight runs to complete.

use crate::tasks::gc::GarbageCollector;
use crate::tasks::lifecycle::LifecycleSweep;
use coffre_core::config::GcConfig;
use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, Time};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

struct Running {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

/// The background task scheduler.
pub struct Scheduler {
    gc: Arc<GarbageCollector>,
    lifecycle: Arc<LifecycleSweep>,
    config: GcConfig,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(gc: GarbageCollector, lifecycle: LifecycleSweep, config: GcConfig) -> Self {
        Self {
            gc: Arc::new(gc),
            lifecycle: Arc::new(lifecycle),
            config,
            running: Mutex::new(None),
        }
    }

    /// Start the scheduler loops. A second start is a no-op.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }

        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::new();

        // Daily GC at the configured hour.
        {
            let gc = self.gc.clone();
            let gc_hour = self.config.gc_hour;
            let mut shutdown_rx = shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                loop {
                    let wait = until_next_hour(gc_hour, OffsetDateTime::now_utc());
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {
                            gc.run(OffsetDateTime::now_utc()).await;
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
            }));
        }

        // Hourly (by default) lifecycle sweep.
        {
            let lifecycle = self.lifecycle.clone();
            let interval = Duration::from_secs(self.config.lifecycle_interval_secs);
            let mut shutdown_rx = shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {
                            lifecycle.run(OffsetDateTime::now_utc()).await;
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
            }));
        }

        tracing::info!(
            gc_hour = self.config.gc_hour,
            lifecycle_interval_secs = self.config.lifecycle_interval_secs,
            "background task scheduler started"
        );
        *running = Some(Running { shutdown, handles });
    }

    /// Stop the scheduler, waiting for in-flight jobs. A second stop is a
    /// no-op.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        for handle in running.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "scheduler task failed during shutdown");
            }
        }
        tracing::info!("background task scheduler stopped");
    }

    /// Whether the scheduler loops are running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

/// Time until the next occurrence of `hour:00:00` UTC.
fn until_next_hour(hour: u8, now: OffsetDateTime) -> Duration {
    let at = Time::from_hms(hour, 0, 0).expect("validated gc_hour");
    let mut next = now.replace_time(at);
    if next <= now {
        next += time::Duration::days(1);
    }
    let delta = next - now;
    Duration::from_secs(delta.whole_seconds().max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let before = datetime!(2026-03-01 01:30:00 UTC);
        assert_eq!(
            until_next_hour(2, before),
            Duration::from_secs(30 * 60)
        );

        let after = datetime!(2026-03-01 02:00:00 UTC);
        assert_eq!(
            until_next_hour(2, after),
            Duration::from_secs(24 * 3600)
        );

        let evening = datetime!(2026-03-01 23:00:00 UTC);
        assert_eq!(
            until_next_hour(2, evening),
            Duration::from_secs(3 * 3600)
        );
    }
}
