// Dependency bundle metadata and install state
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Bundled, read-only description of the expected tool bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyMetadata {
    pub version: String,
    pub release_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub github_repo: String,
    pub platforms: BTreeMap<String, PlatformArchive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformArchive {
    pub filename: String,
    pub sha256: String,
    pub size: u64,
}

/// Written last, only after a verified extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledMarker {
    pub version: String,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DependencyStatus {
    Installed,
    Missing,
    Outdated { installed: String, expected: String },
    Corrupted { missing: Vec<PathBuf> },
}

impl DependencyStatus {
    pub fn is_installed(&self) -> bool {
        matches!(self, DependencyStatus::Installed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InstallerState {
    Unknown,
    Checking,
    Installing,
    Checked { result: DependencyStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPhase {
    Downloading,
    Verifying,
    Extracting,
    Finalizing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallProgress {
    pub phase: InstallPhase,
    pub downloaded: u64,
    pub total: u64,
    pub percent: u32,
}

impl InstallProgress {
    pub fn new(phase: InstallPhase, downloaded: u64, total: u64) -> Self {
        let percent = if total > 0 {
            ((downloaded as f64 / total as f64) * 100.0).min(100.0) as u32
        } else {
            0
        };
        Self {
            phase,
            downloaded,
            total,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_format() {
        let metadata: DependencyMetadata = serde_json::from_str(
            r#"{
                "version": "1.2.0",
                "releaseTag": "deps-v1.2.0",
                "githubRepo": "vapourbox/vapourbox-deps",
                "platforms": {
                    "windows-x64": {"filename": "deps-windows-x64.zip", "sha256": "ab12", "size": 1024}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(metadata.release_date, None);
        assert_eq!(metadata.platforms["windows-x64"].size, 1024);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(InstallProgress::new(InstallPhase::Downloading, 512, 2048).percent, 25);
        assert_eq!(InstallProgress::new(InstallPhase::Downloading, 512, 0).percent, 0);
    }
}
