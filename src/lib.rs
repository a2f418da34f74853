// VapourBox core: restoration pipeline model, worker supervision, previews and the tool bundle
pub mod commands;
pub mod error;
pub mod file_manager;
pub mod installer;
pub mod logging;
pub mod models;
pub mod preview;
pub mod process_manager;
pub mod utils;

pub use error::{Error, Result};

use file_manager::read_json_file_or_default;
use installer::{describe_status, DependencyInstaller, InstalledBundle};
use log::{info, warn};
use models::{FilterRegistry, Settings};
use parking_lot::Mutex;
use preview::{LivePreview, PreviewGenerator};
use process_manager::{Supervisor, WorkerLocator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Where the application keeps its files.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub settings_path: PathBuf,
    pub metadata_path: PathBuf,
    pub deps_dir: PathBuf,
    /// Schemas shipped with the executable. User schemas load afterwards and win on id clashes.
    pub bundled_filters_dir: Option<PathBuf>,
    pub filters_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl AppPaths {
    pub fn default_locations() -> Self {
        Self {
            settings_path: utils::get_settings_json_path(),
            metadata_path: utils::get_bundled_metadata_path(),
            deps_dir: utils::get_deps_dir(),
            bundled_filters_dir: utils::get_exe_dir().map(|dir| dir.join("filters")),
            filters_dir: utils::get_user_filters_dir(),
            logs_dir: utils::get_logs_dir(),
        }
    }
}

/// Everything that spawns tools. Only exists while a verified bundle is installed.
pub struct Services {
    bundle: InstalledBundle,
    supervisor: Supervisor,
    preview: Arc<PreviewGenerator>,
    live_preview: LivePreview,
}

impl Services {
    fn start(bundle: InstalledBundle, settings: &Settings) -> Result<Self> {
        let supervisor = Supervisor::new(
            &bundle,
            WorkerLocator::from_settings(settings),
            Duration::from_millis(settings.cancel_grace_ms),
        )?;
        let preview = Arc::new(PreviewGenerator::new(
            &bundle,
            WorkerLocator::from_settings(settings),
            settings,
        )?);
        let live_preview = LivePreview::new(preview.clone(), Duration::from_millis(settings.preview_debounce_ms));

        Ok(Self {
            bundle,
            supervisor,
            preview,
            live_preview,
        })
    }

    pub fn bundle(&self) -> &InstalledBundle {
        &self.bundle
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn preview(&self) -> &PreviewGenerator {
        &self.preview
    }

    pub fn live_preview(&self) -> &LivePreview {
        &self.live_preview
    }

    async fn shutdown(&self) {
        self.live_preview.shutdown();
        if self.supervisor.cancel().await {
            info!("[AppState] Cancelled running job during shutdown");
        }
        self.supervisor.close().await;
        self.preview.dispose().await;
    }
}

/// Application-wide state shared by every command.
pub struct AppState {
    paths: AppPaths,
    settings: Mutex<Settings>,
    installer: DependencyInstaller,
    filters: FilterRegistry,
    services: Mutex<Option<Arc<Services>>>,
}

impl AppState {
    /// Loads settings, filter schemas and dependency metadata, and starts the services when
    /// the bundle checks out. Must run inside a tokio runtime.
    pub fn init(paths: AppPaths) -> Result<Self> {
        let settings: Settings = read_json_file_or_default(&paths.settings_path)?;
        let deps_dir = settings
            .dependencies_dir
            .clone()
            .unwrap_or_else(|| paths.deps_dir.clone());
        let installer = DependencyInstaller::from_metadata_file(&paths.metadata_path, &deps_dir)?;

        Self::with_installer(paths, settings, installer)
    }

    pub(crate) fn with_installer(
        paths: AppPaths,
        settings: Settings,
        installer: DependencyInstaller,
    ) -> Result<Self> {
        let mut filters = FilterRegistry::new();
        if let Some(dir) = &paths.bundled_filters_dir {
            filters.load_from_directory(dir)?;
        }
        let user_filters = settings
            .filters_dir
            .clone()
            .unwrap_or_else(|| paths.filters_dir.clone());
        filters.load_from_directory(&user_filters)?;
        info!("[AppState] Loaded {} filter schemas", filters.len());

        let state = Self {
            paths,
            settings: Mutex::new(settings),
            installer,
            filters,
            services: Mutex::new(None),
        };

        match state.installer.bundle() {
            Ok(bundle) => {
                state.activate(bundle)?;
            }
            Err(e) => warn!("[AppState] Starting without tools: {}", e),
        }

        Ok(state)
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Running services keep the settings they were started with.
    pub(crate) fn set_settings(&self, settings: Settings) {
        *self.settings.lock() = settings;
    }

    pub fn installer(&self) -> &DependencyInstaller {
        &self.installer
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn has_services(&self) -> bool {
        self.services.lock().is_some()
    }

    pub fn services(&self) -> Result<Arc<Services>> {
        if let Some(services) = self.services.lock().as_ref() {
            return Ok(services.clone());
        }
        Err(Error::DependenciesNotReady(describe_status(&self.installer.check())))
    }

    pub(crate) fn activate(&self, bundle: InstalledBundle) -> Result<Arc<Services>> {
        let settings = self.settings();
        let services = Arc::new(Services::start(bundle, &settings)?);
        info!(
            "[AppState] Services started with bundle {}",
            services.bundle().version()
        );

        if let Some(previous) = self.services.lock().replace(services.clone()) {
            // Replaced without shutdown; its Drop impls still kill children
            warn!("[AppState] Replaced services for bundle {}", previous.bundle().version());
        }
        Ok(services)
    }

    pub(crate) async fn deactivate(&self) {
        let services = self.services.lock().take();
        if let Some(services) = services {
            services.shutdown().await;
        }
    }

    /// Cancels any running job, kills preview processes and removes temp directories.
    pub async fn dispose(&self) {
        info!("[AppState] Disposing");
        self.deactivate().await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::file_manager::write_json_file;
    use crate::installer::Platform;
    use crate::models::{DependencyMetadata, InstalledMarker, PlatformArchive};
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    pub fn metadata(version: &str) -> DependencyMetadata {
        let mut platforms = BTreeMap::new();
        platforms.insert(
            "linux-x64".to_string(),
            PlatformArchive {
                filename: "vapourbox-deps-linux-x64.zip".to_string(),
                sha256: "0".repeat(64),
                size: 0,
            },
        );
        DependencyMetadata {
            version: version.to_string(),
            release_tag: format!("deps-v{}", version),
            release_date: None,
            github_repo: "vapourbox/vapourbox-deps".to_string(),
            platforms,
        }
    }

    pub fn paths(dir: &Path) -> AppPaths {
        AppPaths {
            settings_path: dir.join("data").join("settings.json"),
            metadata_path: dir.join("dependencies.json"),
            deps_dir: dir.join("deps"),
            bundled_filters_dir: None,
            filters_dir: dir.join("filters"),
            logs_dir: dir.join("logs"),
        }
    }

    /// Lays out a bundle on disk that passes the installer check.
    pub fn installed_installer(dir: &Path) -> DependencyInstaller {
        let installer = DependencyInstaller::new(metadata("1.0.0"), &dir.join("deps"), Platform::LinuxX64);
        let layout = installer.layout();
        for path in [layout.vspipe_path(), layout.ffmpeg_path()] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "#!/bin/sh\n").unwrap();
        }
        fs::create_dir_all(layout.python_home()).unwrap();
        fs::create_dir_all(layout.plugin_dir()).unwrap();
        write_json_file(
            &layout.marker_path(),
            &InstalledMarker {
                version: "1.0.0".to_string(),
                installed_at: chrono::Utc::now(),
            },
        )
        .unwrap();
        installer
    }

    pub fn missing_installer(dir: &Path) -> DependencyInstaller {
        DependencyInstaller::new(metadata("1.0.0"), &dir.join("deps"), Platform::LinuxX64)
    }

    pub fn state_with(dir: &Path, settings: Settings, installer: DependencyInstaller) -> AppState {
        AppState::with_installer(paths(dir), settings, installer).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::file_manager::write_json_file;
    use crate::models::DependencyStatus;

    #[tokio::test]
    async fn test_missing_bundle_leaves_services_off() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), missing_installer(dir.path()));

        assert!(!state.has_services());
        assert!(matches!(state.services(), Err(Error::DependenciesNotReady(_))));
        state.dispose().await;
    }

    #[tokio::test]
    async fn test_installed_bundle_starts_services() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), installed_installer(dir.path()));

        let services = state.services().unwrap();
        assert_eq!(services.bundle().version(), "1.0.0");
        let work_dir = services.preview().work_dir().to_path_buf();
        assert!(work_dir.is_dir());
        drop(services);

        state.dispose().await;
        assert!(!state.has_services());
        assert!(!work_dir.exists());
    }

    #[tokio::test]
    async fn test_init_reads_settings_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        write_json_file(&paths.metadata_path, &metadata("2.0.0")).unwrap();
        let settings = Settings {
            dependencies_dir: Some(dir.path().join("custom-deps")),
            ..Settings::default()
        };
        write_json_file(&paths.settings_path, &settings).unwrap();

        match AppState::init(paths) {
            Ok(state) => {
                assert_eq!(state.settings(), settings);
                assert!(state.installer().layout().root().starts_with(dir.path().join("custom-deps")));
                assert_eq!(state.installer().check(), DependencyStatus::Missing);
                state.dispose().await;
            }
            // Hosts without a published bundle cannot build an installer
            Err(e) => assert!(matches!(e, Error::UnsupportedPlatform(_))),
        }
    }

    #[tokio::test]
    async fn test_user_filters_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let filters = dir.path().join("filters");
        std::fs::create_dir_all(&filters).unwrap();
        std::fs::write(
            filters.join("deband.json"),
            r#"{"id": "deband", "version": "1.0.0", "name": "Deband", "order": 50,
                "parameters": {"range": {"type": "integer", "default": 15}}}"#,
        )
        .unwrap();
        std::fs::write(filters.join("broken.json"), "{ not json").unwrap();

        let state = state_with(dir.path(), Settings::default(), missing_installer(dir.path()));
        assert_eq!(state.filters().len(), 1);
        assert!(state.filters().get("deband").is_some());
    }
}
