// Dependency bundle commands
use crate::error::{Error, Result};
use crate::installer::ArchiveSource;
use crate::models::{DependencyStatus, InstallProgress, InstallerState};
use crate::AppState;
use log::{info, warn};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Re-checks the bundle on disk. Starts the services if it became usable.
pub fn check_dependencies(state: &AppState) -> Result<DependencyStatus> {
    let status = state.installer().check();
    if status.is_installed() && !state.has_services() {
        state.activate(state.installer().bundle()?)?;
    }
    Ok(status)
}

pub fn get_installer_state(state: &AppState) -> InstallerState {
    state.installer().state()
}

/// Installs the bundle from the release download, or from a local archive when `from` is set.
/// Refused while a job is running; preview processes are stopped for the duration.
pub async fn install_dependencies(
    state: &AppState,
    from: Option<PathBuf>,
    progress: Option<UnboundedSender<InstallProgress>>,
) -> Result<DependencyStatus> {
    if let Ok(services) = state.services() {
        if services.supervisor().state().is_active() {
            return Err(Error::AlreadyRunning);
        }
    }
    state.deactivate().await;

    let source = from.map(ArchiveSource::LocalFile);
    match state.installer().install(source, progress).await {
        Ok(bundle) => {
            info!("[Dependencies] Installed bundle {}", bundle.version());
            state.activate(bundle)?;
            Ok(DependencyStatus::Installed)
        }
        Err(e) => {
            // A failed verify leaves the previous bundle in place
            if let Ok(bundle) = state.installer().bundle() {
                warn!("[Dependencies] Install failed, keeping bundle {}", bundle.version());
                state.activate(bundle)?;
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;
    use crate::test_support::{installed_installer, missing_installer, state_with};

    #[tokio::test]
    async fn test_check_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), missing_installer(dir.path()));

        assert_eq!(check_dependencies(&state).unwrap(), DependencyStatus::Missing);
        assert_eq!(
            get_installer_state(&state),
            InstallerState::Checked {
                result: DependencyStatus::Missing
            }
        );
        assert!(!state.has_services());
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), Settings::default(), installed_installer(dir.path()));
        let archive = dir.path().join("not-the-bundle.zip");
        std::fs::write(&archive, b"garbage").unwrap();

        let result = install_dependencies(&state, Some(archive), None).await;

        assert!(matches!(result, Err(Error::IntegrityError { .. })));
        assert!(state.has_services());
        assert_eq!(check_dependencies(&state).unwrap(), DependencyStatus::Installed);
        state.dispose().await;
    }
}
