use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::manager::UploadManager;

const TRACING_TARGET: &str = "veripay_upload::reaper";

/// Background worker that periodically removes idle upload sessions.
pub struct ReaperWorker {
    manager: Arc<UploadManager>,
    ttl: Duration,
    interval: Duration,
    cancellation: CancellationToken,
}

impl ReaperWorker {
    /// Creates a reaper using the manager's configured TTL and sweep
    /// interval.
    pub fn new(manager: Arc<UploadManager>, cancellation: CancellationToken) -> Self {
        let ttl = manager.config().session_ttl();
        let interval = manager.config().sweep_interval();
        Self {
            manager,
            ttl,
            interval,
            cancellation,
        }
    }

    /// Starts the sweep loop on the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::debug!(
            target: TRACING_TARGET,
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "upload reaper started",
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a fresh boot
        // does not sweep before anything can be idle.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = self.cancellation.cancelled() => {
                    tracing::debug!(target: TRACING_TARGET, "upload reaper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = self.manager.remove_expired(self.ttl).await;
                    if removed > 0 {
                        tracing::info!(
                            target: TRACING_TARGET,
                            removed,
                            "removed expired upload sessions",
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::config::UploadConfig;
    use crate::manager::IncomingChunk;

    use super::*;

    #[tokio::test]
    async fn cancellation_stops_the_worker() {
        let root = tempfile::tempdir().unwrap();
        let manager = Arc::new(UploadManager::new(UploadConfig {
            scratch_dir: root.path().join("tmp"),
            artifact_dir: root.path().join("out"),
            sweep_interval_secs: 3600,
            ..UploadConfig::default()
        }));

        let cancellation = CancellationToken::new();
        let handle = ReaperWorker::new(manager, cancellation.clone()).spawn();

        cancellation.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn worker_sweeps_on_its_interval() {
        let root = tempfile::tempdir().unwrap();
        let manager = Arc::new(UploadManager::new(UploadConfig {
            scratch_dir: root.path().join("tmp"),
            artifact_dir: root.path().join("out"),
            session_ttl_secs: 0,
            sweep_interval_secs: 1,
            ..UploadConfig::default()
        }));

        manager
            .submit(IncomingChunk {
                sid: "B100".to_owned(),
                file_name: "receipt.jpg".to_owned(),
                index: 0,
                total: 2,
                data: Bytes::from_static(b"a"),
            })
            .await
            .unwrap();

        let cancellation = CancellationToken::new();
        let handle = ReaperWorker::new(manager.clone(), cancellation.clone()).spawn();

        // The first tick is skipped, so the sweep lands after one interval.
        let reaped = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if manager.scratch_status().await.unwrap().sessions.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;
        assert!(reaped.is_ok(), "session was never reaped");

        cancellation.cancel();
        handle.await.unwrap();
    }
}
