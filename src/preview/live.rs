// Debounced processed preview for interactive parameter editing

use super::debounce::PreviewDebouncer;
use super::generator::{PreviewGenerator, PreviewRequest, ProcessedFrame};
use log::{debug, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreviewUpdate {
    Ready {
        #[serde(rename = "frameIndex")]
        frame_index: u64,
        #[serde(skip)]
        png: Vec<u8>,
    },
    Failed {
        timestamp: f64,
        message: String,
    },
}

impl From<ProcessedFrame> for PreviewUpdate {
    fn from(frame: ProcessedFrame) -> Self {
        PreviewUpdate::Ready {
            frame_index: frame.frame_index,
            png: frame.png,
        }
    }
}

/// Collapses bursts of requests into one worker run after a quiet period.
/// Results are broadcast; superseded requests produce nothing, including runs
/// that were already rendering when a newer request arrived.
pub struct LivePreview {
    debouncer: PreviewDebouncer<(u64, PreviewRequest)>,
    generation: Arc<AtomicU64>,
    updates: broadcast::Sender<PreviewUpdate>,
    dispatcher: JoinHandle<()>,
}

impl LivePreview {
    /// Must be called from within a tokio runtime.
    pub fn new(generator: Arc<PreviewGenerator>, delay: Duration) -> Self {
        let (debouncer, mut requests) = PreviewDebouncer::<(u64, PreviewRequest)>::new(delay);
        let (updates, _) = broadcast::channel(16);
        let generation = Arc::new(AtomicU64::new(0));

        let tx = updates.clone();
        let latest = generation.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some((issued, request)) = requests.recv().await {
                let generator = generator.clone();
                let tx = tx.clone();
                let latest = latest.clone();
                // Each run supersedes the previous one inside the generator
                tokio::spawn(async move {
                    let timestamp = request.timestamp;
                    let result = generator.processed_frame(request).await;
                    if latest.load(Ordering::SeqCst) != issued {
                        debug!("[Preview] Dropping result for {:.3}s, newer request pending", timestamp);
                        return;
                    }
                    match result {
                        Ok(Some(frame)) => {
                            let _ = tx.send(frame.into());
                        }
                        Ok(None) => debug!("[Preview] Request at {:.3}s superseded", timestamp),
                        Err(e) => {
                            warn!("[Preview] Preview at {:.3}s failed: {}", timestamp, e);
                            let _ = tx.send(PreviewUpdate::Failed {
                                timestamp,
                                message: e.to_string(),
                            });
                        }
                    }
                });
            }
        });

        Self {
            debouncer,
            generation,
            updates,
            dispatcher,
        }
    }

    /// Invalidates every earlier request at once, even one whose render is running.
    pub fn request(&self, request: PreviewRequest) {
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.debouncer.request((issued, request));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreviewUpdate> {
        self.updates.subscribe()
    }

    pub fn shutdown(&self) {
        self.debouncer.cancel();
        self.dispatcher.abort();
    }
}

impl Drop for LivePreview {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::installer::{BundleLayout, InstalledBundle, Platform};
    use crate::models::Settings;
    use crate::process_manager::WorkerLocator;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn generator(dir: &Path, worker_body: &str) -> Arc<PreviewGenerator> {
        let worker = dir.join("worker.sh");
        std::fs::write(&worker, format!("#!/bin/sh\n{}\n", worker_body)).unwrap();
        std::fs::set_permissions(&worker, std::fs::Permissions::from_mode(0o755)).unwrap();

        let bundle = InstalledBundle::new(
            BundleLayout::new(dir.join("deps"), Platform::LinuxX64),
            "test".to_string(),
        );
        Arc::new(PreviewGenerator::new(&bundle, WorkerLocator::with_override(worker), &Settings::default()).unwrap())
    }

    #[tokio::test]
    async fn test_burst_renders_once() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        let generator = generator(
            dir.path(),
            &format!("echo \"$5\" >> \"{}\"\nprintf 'PNG-%s' \"$5\"", runs.display()),
        );
        generator.set_source("/videos/tape01.avi", 10.0, None).await.unwrap();

        let live = LivePreview::new(generator.clone(), Duration::from_millis(50));
        let mut rx = live.subscribe();
        for timestamp in [1.0, 2.0, 3.0] {
            live.request(PreviewRequest {
                timestamp,
                ..Default::default()
            });
        }

        let update = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match update {
            PreviewUpdate::Ready { frame_index, png } => {
                assert_eq!(frame_index, 30);
                assert_eq!(png, b"PNG-30");
            }
            other => panic!("unexpected update: {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&runs).unwrap().lines().count(), 1);

        live.shutdown();
        generator.dispose().await;
    }

    #[tokio::test]
    async fn test_newer_request_drops_stale_frame() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "sleep 0.3\nprintf 'PNG-%s' \"$5\"");
        generator.set_source("/videos/tape01.avi", 10.0, None).await.unwrap();

        let live = LivePreview::new(generator.clone(), Duration::from_millis(300));
        let mut rx = live.subscribe();
        live.request(PreviewRequest {
            timestamp: 1.0,
            ..Default::default()
        });
        // First render is under way when the second request lands
        tokio::time::sleep(Duration::from_millis(350)).await;
        live.request(PreviewRequest {
            timestamp: 2.0,
            ..Default::default()
        });

        let update = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match update {
            PreviewUpdate::Ready { frame_index, png } => {
                assert_eq!(frame_index, 20);
                assert_eq!(png, b"PNG-20");
            }
            other => panic!("unexpected update: {:?}", other),
        }

        live.shutdown();
        generator.dispose().await;
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "echo 'no such plugin' >&2\nexit 2");
        generator.set_source("/videos/tape01.avi", 10.0, None).await.unwrap();

        let live = LivePreview::new(generator.clone(), Duration::from_millis(10));
        let mut rx = live.subscribe();
        live.request(PreviewRequest {
            timestamp: 0.5,
            ..Default::default()
        });

        let update = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match update {
            PreviewUpdate::Failed { timestamp, message } => {
                assert_eq!(timestamp, 0.5);
                assert!(message.contains("no such plugin"));
            }
            other => panic!("unexpected update: {:?}", other),
        }
        generator.dispose().await;
    }
}
