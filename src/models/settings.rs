// Settings data models
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::video_job::EncodingSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Worker executable to use instead of the bundled one.
    pub worker_path_override: Option<PathBuf>,
    /// Extra locations to look for the worker, tried after the bundled path.
    pub worker_search_paths: Vec<PathBuf>,
    pub dependencies_dir: Option<PathBuf>,
    pub filters_dir: Option<PathBuf>,
    pub preview_cache_capacity: usize,
    pub thumbnail_concurrency: usize,
    pub preview_debounce_ms: u64,
    pub cancel_grace_ms: u64,
    pub default_encoding: EncodingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_path_override: None,
            worker_search_paths: Vec::new(),
            dependencies_dir: None,
            filters_dir: None,
            preview_cache_capacity: 64,
            thumbnail_concurrency: 4,
            preview_debounce_ms: 300,
            cancel_grace_ms: 500,
            default_encoding: EncodingSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"worker_search_paths": ["/opt/vapourbox/bin"]}"#).unwrap();
        assert_eq!(settings.worker_search_paths, vec![PathBuf::from("/opt/vapourbox/bin")]);
        assert_eq!(settings.preview_debounce_ms, 300);
        assert_eq!(settings.cancel_grace_ms, 500);
    }
}
