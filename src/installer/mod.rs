// Dependency bundle installer
// Checks, downloads, verifies and extracts the native tool bundle

pub mod download;
pub mod extract;
pub mod layout;

pub use download::{fetch_to_file, verify_checksum, ArchiveSource};
pub use extract::{extract_archive, ArchiveFormat};
pub use layout::{BundleLayout, Platform, MARKER_FILE_NAME};

use crate::error::{Error, Result};
use crate::file_manager::{read_json_file, write_json_file};
use crate::models::{
    DependencyMetadata, DependencyStatus, InstallPhase, InstallProgress, InstalledMarker,
    InstallerState, PlatformArchive,
};
use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Proof that a verified bundle is on disk. Needed to build anything that spawns tools.
#[derive(Debug, Clone)]
pub struct InstalledBundle {
    layout: BundleLayout,
    version: String,
}

impl InstalledBundle {
    pub(crate) fn new(layout: BundleLayout, version: String) -> Self {
        Self { layout, version }
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

pub struct DependencyInstaller {
    metadata: DependencyMetadata,
    layout: BundleLayout,
    state: Mutex<InstallerState>,
}

impl DependencyInstaller {
    /// Bundle for `platform` lives in `deps_root/<platform-id>`.
    pub fn new(metadata: DependencyMetadata, deps_root: &Path, platform: Platform) -> Self {
        Self {
            metadata,
            layout: BundleLayout::new(deps_root.join(platform.id()), platform),
            state: Mutex::new(InstallerState::Unknown),
        }
    }

    pub fn for_current_platform(metadata: DependencyMetadata, deps_root: &Path) -> Result<Self> {
        Ok(Self::new(metadata, deps_root, Platform::current()?))
    }

    pub fn from_metadata_file(metadata_path: &Path, deps_root: &Path) -> Result<Self> {
        let metadata: DependencyMetadata = read_json_file(metadata_path)?;
        Self::for_current_platform(metadata, deps_root)
    }

    pub fn state(&self) -> InstallerState {
        self.state.lock().clone()
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    pub fn metadata(&self) -> &DependencyMetadata {
        &self.metadata
    }

    pub fn platform_archive(&self) -> Result<&PlatformArchive> {
        let id = self.layout.platform().id();
        self.metadata
            .platforms
            .get(id)
            .ok_or_else(|| Error::UnsupportedPlatform(format!("no dependency archive for {}", id)))
    }

    pub fn check(&self) -> DependencyStatus {
        *self.state.lock() = InstallerState::Checking;
        let result = self.evaluate();
        info!("[Installer] Dependency check: {:?}", result);
        *self.state.lock() = InstallerState::Checked {
            result: result.clone(),
        };
        result
    }

    fn evaluate(&self) -> DependencyStatus {
        let marker_path = self.layout.marker_path();
        if !marker_path.exists() {
            return DependencyStatus::Missing;
        }

        let marker: InstalledMarker = match read_json_file(&marker_path) {
            Ok(marker) => marker,
            Err(e) => {
                warn!("[Installer] Unreadable version marker {:?}: {}", marker_path, e);
                return DependencyStatus::Corrupted {
                    missing: vec![marker_path],
                };
            }
        };

        if marker.version != self.metadata.version {
            return DependencyStatus::Outdated {
                installed: marker.version,
                expected: self.metadata.version.clone(),
            };
        }

        let missing = self.layout.missing_critical_files();
        if !missing.is_empty() {
            return DependencyStatus::Corrupted { missing };
        }

        DependencyStatus::Installed
    }

    /// Handle to the installed bundle, only when the check passes.
    pub fn bundle(&self) -> Result<InstalledBundle> {
        match self.check() {
            DependencyStatus::Installed => Ok(InstalledBundle::new(
                self.layout.clone(),
                self.metadata.version.clone(),
            )),
            other => Err(Error::DependenciesNotReady(describe_status(&other))),
        }
    }

    fn part_path(&self) -> PathBuf {
        let root = self.layout.root();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "deps".to_string());
        root.with_file_name(format!("{}.part", name))
    }

    /// Downloads (or copies) the archive, verifies it, and replaces the bundle directory.
    /// The version marker is written last.
    pub async fn install(
        &self,
        source: Option<ArchiveSource>,
        progress: Option<UnboundedSender<InstallProgress>>,
    ) -> Result<InstalledBundle> {
        *self.state.lock() = InstallerState::Installing;
        let result = self.run_install(source, progress).await;
        if let Err(e) = &result {
            warn!("[Installer] Install failed: {}", e);
        }
        self.check();
        result
    }

    async fn run_install(
        &self,
        source: Option<ArchiveSource>,
        progress: Option<UnboundedSender<InstallProgress>>,
    ) -> Result<InstalledBundle> {
        let archive = self.platform_archive()?.clone();
        let format = ArchiveFormat::from_file_name(&archive.filename)?;
        let source = match source {
            Some(source) => source,
            None => ArchiveSource::github_release(&self.metadata, &archive)?,
        };

        let target = self.layout.root().to_path_buf();
        let part = self.part_path();
        if let Some(parent) = part.parent() {
            fs::create_dir_all(parent)?;
        }

        info!("[Installer] Fetching {} -> {:?}", source.describe(), part);
        let digest = {
            let part = part.clone();
            let progress = progress.clone();
            let size = archive.size;
            tokio::task::spawn_blocking(move || fetch_to_file(&source, &part, size, progress.as_ref()))
                .await
                .map_err(|e| Error::InvalidArgument(format!("Download task failed: {}", e)))
        }
        .and_then(|r| r);

        let digest = match digest {
            Ok(digest) => digest,
            Err(e) => {
                let _ = fs::remove_file(&part);
                return Err(e);
            }
        };

        let downloaded = fs::metadata(&part).map(|m| m.len()).unwrap_or(0);
        send(&progress, InstallPhase::Verifying, downloaded, downloaded);
        if let Err(e) = verify_checksum(&archive.sha256, &digest) {
            let _ = fs::remove_file(&part);
            return Err(e);
        }

        send(&progress, InstallPhase::Extracting, downloaded, downloaded);
        let extracted = {
            let part = part.clone();
            let target = target.clone();
            tokio::task::spawn_blocking(move || -> Result<usize> {
                if target.exists() {
                    fs::remove_dir_all(&target)?;
                }
                fs::create_dir_all(&target)?;
                extract_archive(&part, format, &target)
            })
            .await
            .map_err(|e| Error::InvalidArgument(format!("Extraction task failed: {}", e)))
        }
        .and_then(|r| r);
        let _ = fs::remove_file(&part);

        let file_count = match extracted {
            Ok(count) => count,
            Err(e) => {
                let _ = fs::remove_dir_all(&target);
                return Err(e);
            }
        };
        info!("[Installer] Extracted {} files into {:?}", file_count, target);

        send(&progress, InstallPhase::Finalizing, downloaded, downloaded);
        let missing = self.layout.missing_critical_files();
        if !missing.is_empty() {
            let _ = fs::remove_dir_all(&target);
            return Err(Error::Archive(format!(
                "Archive is missing required files: {}",
                missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        mark_executables(&self.layout)?;

        write_json_file(
            &self.layout.marker_path(),
            &InstalledMarker {
                version: self.metadata.version.clone(),
                installed_at: Utc::now(),
            },
        )?;
        info!("[Installer] Installed dependencies {}", self.metadata.version);

        Ok(InstalledBundle::new(
            self.layout.clone(),
            self.metadata.version.clone(),
        ))
    }
}

fn send(progress: &Option<UnboundedSender<InstallProgress>>, phase: InstallPhase, done: u64, total: u64) {
    if let Some(tx) = progress {
        let _ = tx.send(InstallProgress::new(phase, done, total));
    }
}

#[cfg(unix)]
fn mark_executables(layout: &BundleLayout) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    for path in layout.executables() {
        if path.is_file() {
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(perms.mode() | 0o755);
            fs::set_permissions(&path, perms)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn mark_executables(_layout: &BundleLayout) -> Result<()> {
    Ok(())
}

pub fn describe_status(status: &DependencyStatus) -> String {
    match status {
        DependencyStatus::Installed => "installed".to_string(),
        DependencyStatus::Missing => "not installed".to_string(),
        DependencyStatus::Outdated { installed, expected } => {
            format!("version {} installed, {} required", installed, expected)
        }
        DependencyStatus::Corrupted { missing } => format!(
            "installation is damaged, missing {}",
            missing
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::Write;
    use tokio::sync::mpsc;
    use zip::write::SimpleFileOptions;

    fn write_bundle_zip(path: &Path) -> String {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        zip.add_directory("python/", options).unwrap();
        zip.add_directory("vapoursynth/plugins/", options).unwrap();
        for name in ["vapoursynth/vspipe", "ffmpeg/ffmpeg", "vapoursynth/plugins/libffms2.so"] {
            zip.start_file(name, options.unix_permissions(0o644)).unwrap();
            zip.write_all(b"binary").unwrap();
        }
        zip.finish().unwrap();

        format!("{:x}", Sha256::digest(fs::read(path).unwrap()))
    }

    fn installer(deps_root: &Path, sha256: &str) -> DependencyInstaller {
        let mut platforms = BTreeMap::new();
        platforms.insert(
            "linux-x64".to_string(),
            PlatformArchive {
                filename: "vapourbox-deps-linux-x64.zip".to_string(),
                sha256: sha256.to_string(),
                size: 0,
            },
        );
        let metadata = DependencyMetadata {
            version: "1.2.0".to_string(),
            release_tag: "deps-v1.2.0".to_string(),
            release_date: None,
            github_repo: "vapourbox/vapourbox-deps".to_string(),
            platforms,
        };
        DependencyInstaller::new(metadata, deps_root, Platform::LinuxX64)
    }

    fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = Vec::new();
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    files.extend(snapshot(&path));
                } else {
                    files.push((path.clone(), fs::read(&path).unwrap()));
                }
            }
        }
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_install_from_local_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let sha = write_bundle_zip(&archive);
        let installer = installer(&dir.path().join("deps"), &sha);
        assert_eq!(installer.check(), DependencyStatus::Missing);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let bundle = installer
            .install(Some(ArchiveSource::LocalFile(archive)), Some(tx))
            .await
            .unwrap();

        assert_eq!(bundle.version(), "1.2.0");
        assert!(installer.layout().marker_path().is_file());
        assert!(!installer.part_path().exists());
        assert_eq!(
            installer.state(),
            InstallerState::Checked {
                result: DependencyStatus::Installed
            }
        );

        let mut phases = Vec::new();
        while let Ok(p) = rx.try_recv() {
            if phases.last() != Some(&p.phase) {
                phases.push(p.phase);
            }
        }
        assert_eq!(
            phases,
            vec![
                InstallPhase::Downloading,
                InstallPhase::Verifying,
                InstallPhase::Extracting,
                InstallPhase::Finalizing
            ]
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(bundle.layout().vspipe_path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn test_checksum_mismatch_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        write_bundle_zip(&archive);
        let installer = installer(&dir.path().join("deps"), &"0".repeat(64));

        // Previous install of another version
        let root = installer.layout().root().to_path_buf();
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("old-tool"), "v1").unwrap();
        write_json_file(
            &installer.layout().marker_path(),
            &InstalledMarker {
                version: "1.0.0".to_string(),
                installed_at: Utc::now(),
            },
        )
        .unwrap();
        let before = snapshot(&root);

        let result = installer
            .install(Some(ArchiveSource::LocalFile(archive)), None)
            .await;

        assert!(matches!(result, Err(Error::IntegrityError { .. })));
        assert_eq!(snapshot(&root), before);
        assert!(!installer.part_path().exists());
        assert!(matches!(installer.check(), DependencyStatus::Outdated { .. }));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_on_fresh_dir_writes_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        write_bundle_zip(&archive);
        let installer = installer(&dir.path().join("deps"), "deadbeef");

        let result = installer
            .install(Some(ArchiveSource::LocalFile(archive)), None)
            .await;

        assert!(matches!(result, Err(Error::IntegrityError { .. })));
        assert!(!installer.layout().marker_path().exists());
        assert!(!installer.layout().root().exists());
        assert_eq!(installer.check(), DependencyStatus::Missing);
    }

    #[tokio::test]
    async fn test_deleted_critical_file_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let sha = write_bundle_zip(&archive);
        let installer = installer(&dir.path().join("deps"), &sha);
        installer
            .install(Some(ArchiveSource::LocalFile(archive)), None)
            .await
            .unwrap();

        let ffmpeg = installer.layout().ffmpeg_path();
        fs::remove_file(&ffmpeg).unwrap();

        assert_eq!(
            installer.check(),
            DependencyStatus::Corrupted {
                missing: vec![ffmpeg]
            }
        );
        assert!(matches!(installer.bundle(), Err(Error::DependenciesNotReady(_))));
    }

    #[tokio::test]
    async fn test_reinstall_replaces_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let sha = write_bundle_zip(&archive);
        let installer = installer(&dir.path().join("deps"), &sha);

        let stale = installer.layout().root().join("stale.dll");
        fs::create_dir_all(installer.layout().root()).unwrap();
        fs::write(&stale, "old").unwrap();

        installer
            .install(Some(ArchiveSource::LocalFile(archive)), None)
            .await
            .unwrap();
        assert!(!stale.exists());
        assert!(installer.bundle().is_ok());
    }

    #[tokio::test]
    async fn test_archive_without_tools_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            zip.start_file("README", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"nothing here").unwrap();
            zip.finish().unwrap();
        }
        let sha = format!("{:x}", Sha256::digest(fs::read(&archive).unwrap()));
        let installer = installer(&dir.path().join("deps"), &sha);

        let result = installer
            .install(Some(ArchiveSource::LocalFile(archive)), None)
            .await;
        assert!(matches!(result, Err(Error::Archive(_))));
        assert!(!installer.layout().marker_path().exists());
    }

    #[test]
    fn test_unknown_platform_archive() {
        let dir = tempfile::tempdir().unwrap();
        let installer = DependencyInstaller::new(
            installer(dir.path(), "").metadata().clone(),
            dir.path(),
            Platform::WindowsArm64,
        );
        assert!(matches!(
            installer.platform_archive(),
            Err(Error::UnsupportedPlatform(_))
        ));
    }
}
