use crate::error::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

static APP_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

pub fn get_app_data_dir() -> PathBuf {
    APP_DATA_DIR
        .get_or_init(|| {
            let base_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."));
            base_dir.join("VapourBox")
        })
        .clone()
}

pub fn get_data_dir() -> PathBuf {
    get_app_data_dir().join("data")
}

pub fn get_logs_dir() -> PathBuf {
    get_app_data_dir().join("logs")
}

/// Default root for installed dependency bundles.
pub fn get_deps_dir() -> PathBuf {
    get_app_data_dir().join("deps")
}

pub fn get_user_filters_dir() -> PathBuf {
    get_app_data_dir().join("filters")
}

pub fn get_settings_json_path() -> PathBuf {
    get_data_dir().join("settings.json")
}

pub fn get_exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Dependency metadata shipped beside the executable.
pub fn get_bundled_metadata_path() -> PathBuf {
    get_exe_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dependencies.json")
}

/// Creates a fresh temp directory owned by a single component instance.
pub fn create_instance_temp_dir(prefix: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir()
        .join("vapourbox")
        .join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn initialize_data_directories() -> Result<()> {
    let directories = [get_data_dir(), get_logs_dir(), get_deps_dir(), get_user_filters_dir()];

    for dir in &directories {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            log::info!("Created directory: {:?}", dir);
        }
    }

    log::info!("Data directories initialized at: {:?}", get_app_data_dir());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_temp_dirs_are_distinct() {
        let a = create_instance_temp_dir("preview").unwrap();
        let b = create_instance_temp_dir("preview").unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
        fs::remove_dir_all(a).unwrap();
        fs::remove_dir_all(b).unwrap();
    }

    #[test]
    fn test_settings_live_under_app_dir() {
        assert!(get_settings_json_path().starts_with(get_app_data_dir()));
        assert!(get_app_data_dir().ends_with("VapourBox"));
    }
}
