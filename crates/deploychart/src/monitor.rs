//! Periodic chart refresh.
//!
//! The watch loop re-runs the pipeline on a fixed interval until it is told
//! to stop or the process receives Ctrl-C. A failed refresh is logged and the
//! loop carries on with the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::datastore::Datastore;
use crate::pipeline::{summarize, Pipeline};

/// Handle for stopping a running watch loop.
#[derive(Debug, Clone, Default)]
pub struct WatchHandle {
    stop_signal: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl WatchHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the loop to stop. A loop waiting for its next refresh stops
    /// at once; one in the middle of a refresh stops when it finishes.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Reset the stop signal.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    /// Wait up to `interval`, returning early if stopped.
    async fn pause(&self, interval: Duration) {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = self.wake.notified() => {}
        }
    }
}

/// Counts from a finished watch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Refreshes that completed.
    pub succeeded: usize,
    /// Refreshes that failed.
    pub failed: usize,
}

/// Refresh the chart every `interval` until stopped.
pub async fn watch(
    pipeline: &Pipeline,
    store: &Datastore,
    interval: Duration,
    handle: &WatchHandle,
) -> WatchSummary {
    let mut summary = WatchSummary::default();
    info!(
        "Watching {} features, refreshing every {}s",
        store.len(),
        interval.as_secs()
    );

    let interrupt = tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping after the current refresh");
                handle.stop();
            }
        }
    });

    while !handle.should_stop() {
        match pipeline.run_once(store).await {
            Ok(report) => {
                summary.succeeded += 1;
                info!(
                    "Refresh #{} wrote {}: {}",
                    summary.succeeded + summary.failed,
                    report.output_path.display(),
                    summarize(&report.status_counts)
                );
            }
            Err(e) if e.is_remote() => {
                summary.failed += 1;
                warn!("Refresh failed, retrying next interval: {e}");
            }
            Err(e) => {
                summary.failed += 1;
                error!("Refresh failed: {e}");
            }
        }

        if handle.should_stop() {
            break;
        }
        handle.pause(interval).await;
    }
    interrupt.abort();

    info!(
        "Watch stopped after {} refreshes ({} failed)",
        summary.succeeded + summary.failed,
        summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::device::SectorDevice;
    use crate::error::{Error, Result};
    use crate::install::{InstallRecord, InstallSource};
    use crate::probe::{Probe, ProbeKind, ProbeSet};
    use crate::render::MapRenderer;
    use crate::status::Status;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Fails every other fetch and stops the loop after `limit` fetches.
    #[derive(Debug)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        limit: usize,
        handle: WatchHandle,
    }

    #[async_trait]
    impl InstallSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self) -> Result<Vec<InstallRecord>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.limit {
                self.handle.stop();
            }
            if n % 2 == 0 {
                Err(Error::api("test", "flaky"))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[derive(Debug)]
    struct Never(ProbeKind);

    #[async_trait]
    impl Probe for Never {
        fn kind(&self) -> ProbeKind {
            self.0
        }

        async fn check(&self, _device: &SectorDevice) -> Status {
            Status::Unknown
        }
    }

    #[test]
    fn test_watch_handle() {
        let handle = WatchHandle::new();
        assert!(!handle.should_stop());

        let clone = handle.clone();
        clone.stop();
        assert!(handle.should_stop());

        handle.reset();
        assert!(!clone.should_stop());
    }

    #[tokio::test]
    async fn test_watch_survives_failures_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let handle = WatchHandle::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(
            Box::new(CountingSource {
                calls: Arc::clone(&calls),
                limit: 3,
                handle: handle.clone(),
            }),
            ProbeSet::new(Box::new(Never(ProbeKind::Ping)), Box::new(Never(ProbeKind::Login))),
            MapRenderer::new(MapConfig::default()),
            dir.path().join("chart.html"),
            1,
        );

        let summary = watch(
            &pipeline,
            &Datastore::default(),
            Duration::from_millis(5),
            &handle,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary, WatchSummary { succeeded: 2, failed: 1 });
    }

    #[tokio::test]
    async fn test_watch_does_nothing_when_already_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let handle = WatchHandle::new();
        handle.stop();
        let pipeline = Pipeline::new(
            Box::new(CountingSource {
                calls: Arc::new(AtomicUsize::new(0)),
                limit: 100,
                handle: handle.clone(),
            }),
            ProbeSet::new(Box::new(Never(ProbeKind::Ping)), Box::new(Never(ProbeKind::Login))),
            MapRenderer::new(MapConfig::default()),
            dir.path().join("chart.html"),
            1,
        );
        let summary = watch(&pipeline, &Datastore::default(), Duration::from_secs(60), &handle).await;
        assert_eq!(summary, WatchSummary::default());
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait() {
        let dir = tempfile::tempdir().unwrap();
        let handle = WatchHandle::new();
        let pipeline = Pipeline::new(
            Box::new(CountingSource {
                calls: Arc::new(AtomicUsize::new(0)),
                limit: 100,
                handle: handle.clone(),
            }),
            ProbeSet::new(Box::new(Never(ProbeKind::Ping)), Box::new(Never(ProbeKind::Login))),
            MapRenderer::new(MapConfig::default()),
            dir.path().join("chart.html"),
            1,
        );

        let stopper = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.stop();
        });

        let started = std::time::Instant::now();
        let summary = tokio::time::timeout(
            Duration::from_secs(10),
            watch(&pipeline, &Datastore::default(), Duration::from_secs(60), &handle),
        )
        .await
        .expect("watch should return soon after stop()");

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(summary, WatchSummary { succeeded: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_pause_returns_when_stopped_first() {
        let handle = WatchHandle::new();
        handle.stop();
        // The stored wake-up lets a pause that starts after stop() end at once
        tokio::time::timeout(Duration::from_secs(5), handle.pause(Duration::from_secs(60)))
            .await
            .unwrap();
    }
}
