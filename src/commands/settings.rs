// Settings commands with partial update support
use crate::error::Result;
use crate::file_manager::write_json_file;
use crate::models::{EncodingSettings, Settings};
use crate::AppState;
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsParams {
    /// Empty string clears the override.
    pub worker_path_override: Option<String>,
    pub worker_search_paths: Option<Vec<PathBuf>>,
    pub dependencies_dir: Option<String>,
    pub filters_dir: Option<String>,
    pub preview_cache_capacity: Option<usize>,
    pub thumbnail_concurrency: Option<usize>,
    pub preview_debounce_ms: Option<u64>,
    pub cancel_grace_ms: Option<u64>,
    pub default_encoding: Option<EncodingSettings>,
}

fn optional_path(value: String) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

pub fn get_settings(state: &AppState) -> Settings {
    state.settings()
}

/// Applies the given fields and persists the result. Path and executable changes take
/// effect on the next start.
pub fn update_settings(state: &AppState, params: UpdateSettingsParams) -> Result<Settings> {
    let mut current = state.settings();

    if let Some(worker_path_override) = params.worker_path_override {
        current.worker_path_override = optional_path(worker_path_override);
    }
    if let Some(worker_search_paths) = params.worker_search_paths {
        current.worker_search_paths = worker_search_paths;
    }
    if let Some(dependencies_dir) = params.dependencies_dir {
        current.dependencies_dir = optional_path(dependencies_dir);
    }
    if let Some(filters_dir) = params.filters_dir {
        current.filters_dir = optional_path(filters_dir);
    }
    if let Some(preview_cache_capacity) = params.preview_cache_capacity {
        current.preview_cache_capacity = preview_cache_capacity.max(1);
    }
    if let Some(thumbnail_concurrency) = params.thumbnail_concurrency {
        current.thumbnail_concurrency = thumbnail_concurrency.max(1);
    }
    if let Some(preview_debounce_ms) = params.preview_debounce_ms {
        current.preview_debounce_ms = preview_debounce_ms;
    }
    if let Some(cancel_grace_ms) = params.cancel_grace_ms {
        current.cancel_grace_ms = cancel_grace_ms;
    }
    if let Some(default_encoding) = params.default_encoding {
        current.default_encoding = default_encoding;
    }

    write_json_file(&state.paths().settings_path, &current)?;
    state.set_settings(current.clone());

    debug!("Updated settings: {:?}", current);

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::read_json_file;
    use crate::test_support::{missing_installer, state_with};

    #[tokio::test]
    async fn test_partial_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let initial = Settings {
            worker_path_override: Some(PathBuf::from("/opt/worker")),
            ..Settings::default()
        };
        let state = state_with(dir.path(), initial, missing_installer(dir.path()));

        let params: UpdateSettingsParams =
            serde_json::from_str(r#"{"preview_debounce_ms": 150, "worker_path_override": ""}"#).unwrap();
        let updated = update_settings(&state, params).unwrap();

        assert_eq!(updated.preview_debounce_ms, 150);
        assert_eq!(updated.worker_path_override, None);
        assert_eq!(updated.cancel_grace_ms, 500);
        assert_eq!(get_settings(&state), updated);

        let on_disk: Settings = read_json_file(&state.paths().settings_path).unwrap();
        assert_eq!(on_disk, updated);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), missing_installer(dir.path()));

        let updated = update_settings(
            &state,
            UpdateSettingsParams {
                preview_cache_capacity: Some(0),
                thumbnail_concurrency: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.preview_cache_capacity, 1);
        assert_eq!(updated.thumbnail_concurrency, 1);
    }
}
