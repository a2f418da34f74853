// Hermetic environment for the worker and bundled tools

use crate::installer::{BundleLayout, InstalledBundle};
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command;

/// Environment variables and tool paths derived from an installed bundle.
#[derive(Debug, Clone)]
pub struct ToolEnvironment {
    vars: Vec<(String, OsString)>,
    vspipe: PathBuf,
    ffmpeg: PathBuf,
}

impl ToolEnvironment {
    pub fn from_bundle(bundle: &InstalledBundle) -> Self {
        Self::from_layout(bundle.layout())
    }

    pub(crate) fn from_layout(layout: &BundleLayout) -> Self {
        let mut vars: Vec<(String, OsString)> = vec![
            ("PYTHONNOUSERSITE".to_string(), OsString::from("1")),
            ("PYTHONHOME".to_string(), layout.python_home().into_os_string()),
        ];

        if let Ok(python_path) = std::env::join_paths(layout.python_path_entries()) {
            vars.push(("PYTHONPATH".to_string(), python_path));
        }

        vars.push((
            "VAPOURSYNTH_PLUGIN_PATH".to_string(),
            layout.plugin_dir().into_os_string(),
        ));
        vars.push((
            "NNEDI3CL_WEIGHTS_PATH".to_string(),
            layout.nnedi3_weights_path().into_os_string(),
        ));

        let mut search_path = layout.bin_dirs();
        if let Some(existing) = std::env::var_os("PATH") {
            search_path.extend(std::env::split_paths(&existing));
        }
        if let Ok(joined) = std::env::join_paths(search_path) {
            vars.push(("PATH".to_string(), joined));
        }

        if layout.platform().is_macos() {
            vars.push((
                "DYLD_LIBRARY_PATH".to_string(),
                layout.vapoursynth_dir().into_os_string(),
            ));
        }

        Self {
            vars,
            vspipe: layout.vspipe_path(),
            ffmpeg: layout.ffmpeg_path(),
        }
    }

    pub fn apply(&self, cmd: &mut Command) {
        for (key, value) in &self.vars {
            cmd.env(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&OsString> {
        self.vars.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn vspipe(&self) -> &PathBuf {
        &self.vspipe
    }

    pub fn ffmpeg(&self) -> &PathBuf {
        &self.ffmpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::Platform;

    #[test]
    fn test_path_is_prepended_with_bundle_dirs() {
        let layout = BundleLayout::new("/opt/vb/linux-x64", Platform::LinuxX64);
        let env = ToolEnvironment::from_layout(&layout);

        let path = env.get("PATH").unwrap();
        let first: Vec<PathBuf> = std::env::split_paths(path).take(2).collect();
        assert_eq!(first, vec![layout.ffmpeg_dir(), layout.vapoursynth_dir()]);
        assert_eq!(env.get("PYTHONNOUSERSITE").unwrap(), "1");
        assert!(env.get("DYLD_LIBRARY_PATH").is_none());
    }

    #[test]
    fn test_macos_sets_library_path() {
        let layout = BundleLayout::new("/Applications/VapourBox/deps/macos-arm64", Platform::MacosArm64);
        let env = ToolEnvironment::from_layout(&layout);

        assert_eq!(
            env.get("DYLD_LIBRARY_PATH").unwrap(),
            &layout.vapoursynth_dir().into_os_string()
        );
        assert_eq!(
            env.get("VAPOURSYNTH_PLUGIN_PATH").unwrap(),
            &layout.plugin_dir().into_os_string()
        );
    }
}
