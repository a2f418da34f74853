// Preview commands
use crate::error::Result;
use crate::preview::{PreviewRequest, PreviewUpdate, ProcessedFrame, RawFrame, Thumbnail};
use crate::AppState;
use std::path::PathBuf;
use tokio::sync::broadcast;

pub async fn set_preview_source(
    state: &AppState,
    path: PathBuf,
    fps: f64,
    total_frames: Option<u64>,
) -> Result<()> {
    state.services()?.preview().set_source(path, fps, total_frames).await
}

/// `Ok(None)` means a newer request took over.
pub async fn get_raw_frame(state: &AppState, timestamp: f64) -> Result<Option<RawFrame>> {
    state.services()?.preview().raw_frame(timestamp).await
}

/// Renders immediately, superseding any render in flight.
pub async fn render_preview(state: &AppState, request: PreviewRequest) -> Result<Option<ProcessedFrame>> {
    state.services()?.preview().processed_frame(request).await
}

/// Queues a debounced render; the result arrives on [`subscribe_previews`].
pub fn request_preview(state: &AppState, request: PreviewRequest) -> Result<()> {
    state.services()?.live_preview().request(request);
    Ok(())
}

pub fn subscribe_previews(state: &AppState) -> Result<broadcast::Receiver<PreviewUpdate>> {
    Ok(state.services()?.live_preview().subscribe())
}

pub async fn get_thumbnails(state: &AppState, timestamps: Vec<f64>) -> Result<Vec<Thumbnail>> {
    state.services()?.preview().thumbnails(&timestamps).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::Settings;
    use crate::test_support::{installed_installer, missing_installer, state_with};

    #[tokio::test]
    async fn test_preview_needs_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), missing_installer(dir.path()));

        let result = set_preview_source(&state, PathBuf::from("/videos/a.avi"), 25.0, None).await;
        assert!(matches!(result, Err(Error::DependenciesNotReady(_))));
        assert!(request_preview(&state, PreviewRequest::default()).is_err());
    }

    #[tokio::test]
    async fn test_invalid_frame_rate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), installed_installer(dir.path()));

        let result = set_preview_source(&state, PathBuf::from("/videos/a.avi"), 0.0, None).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        state.dispose().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_preview_returns_worker_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let worker = dir.path().join("worker.sh");
        std::fs::write(&worker, "#!/bin/sh\nprintf 'PNG-%s' \"$5\"\n").unwrap();
        std::fs::set_permissions(&worker, std::fs::Permissions::from_mode(0o755)).unwrap();
        let settings = Settings {
            worker_path_override: Some(worker),
            ..Settings::default()
        };
        let state = state_with(dir.path(), settings, installed_installer(dir.path()));

        set_preview_source(&state, PathBuf::from("/videos/a.avi"), 25.0, Some(100))
            .await
            .unwrap();
        let frame = render_preview(
            &state,
            PreviewRequest {
                timestamp: 10.0,
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(frame.frame_index, 99);
        assert_eq!(frame.png, b"PNG-99");
        state.dispose().await;
    }
}
