// Worker executable lookup

use crate::error::{Error, Result};
use crate::models::Settings;
use crate::utils::get_exe_dir;
use std::path::PathBuf;

pub const WORKER_NAME: &str = "vapourbox-worker";

pub fn worker_file_name() -> String {
    if cfg!(windows) {
        format!("{}.exe", WORKER_NAME)
    } else {
        WORKER_NAME.to_string()
    }
}

/// Search order: explicit override, bundled next to the executable, then configured paths.
#[derive(Debug, Clone, Default)]
pub struct WorkerLocator {
    override_path: Option<PathBuf>,
    bundled_dir: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl WorkerLocator {
    pub fn new(override_path: Option<PathBuf>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            override_path,
            bundled_dir: get_exe_dir(),
            search_paths,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.worker_path_override.clone(),
            settings.worker_search_paths.clone(),
        )
    }

    /// Only the override is consulted.
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            override_path: Some(path.into()),
            bundled_dir: None,
            search_paths: Vec::new(),
        }
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        let name = worker_file_name();
        let mut candidates = Vec::new();

        if let Some(path) = &self.override_path {
            candidates.push(path.clone());
        }

        if let Some(dir) = &self.bundled_dir {
            candidates.push(dir.join(&name));
            // macOS app bundles keep helpers in Contents/Resources
            if cfg!(target_os = "macos") {
                if let Some(contents) = dir.parent() {
                    candidates.push(contents.join("Resources").join(&name));
                }
            }
        }

        for path in &self.search_paths {
            if path.is_dir() {
                candidates.push(path.join(&name));
            } else {
                candidates.push(path.clone());
            }
        }

        candidates
    }

    pub fn locate(&self) -> Result<PathBuf> {
        let candidates = self.candidates();
        for candidate in &candidates {
            if candidate.is_file() {
                log::debug!("[Locator] Using worker at {:?}", candidate);
                return Ok(candidate.clone());
            }
        }

        Err(Error::ExecutableNotFound {
            name: WORKER_NAME.to_string(),
            searched: candidates,
        })
    }
}
