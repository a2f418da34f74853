// On-disk layout of an extracted dependency bundle

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub const MARKER_FILE_NAME: &str = "installed_version.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacosArm64,
    MacosX64,
    WindowsX64,
    WindowsArm64,
    LinuxX64,
}

impl Platform {
    pub fn current() -> Result<Platform> {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        match (os, arch) {
            ("macos", "aarch64") => Ok(Platform::MacosArm64),
            ("macos", "x86_64") => Ok(Platform::MacosX64),
            ("windows", "x86_64") => Ok(Platform::WindowsX64),
            ("windows", "aarch64") => Ok(Platform::WindowsArm64),
            ("linux", "x86_64") => Ok(Platform::LinuxX64),
            _ => Err(Error::UnsupportedPlatform(format!("{}-{}", os, arch))),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Platform::MacosArm64 => "macos-arm64",
            Platform::MacosX64 => "macos-x64",
            Platform::WindowsX64 => "windows-x64",
            Platform::WindowsArm64 => "windows-arm64",
            Platform::LinuxX64 => "linux-x64",
        }
    }

    pub fn from_id(id: &str) -> Option<Platform> {
        [
            Platform::MacosArm64,
            Platform::MacosX64,
            Platform::WindowsX64,
            Platform::WindowsArm64,
            Platform::LinuxX64,
        ]
        .into_iter()
        .find(|p| p.id() == id)
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::WindowsX64 | Platform::WindowsArm64)
    }

    pub fn is_macos(&self) -> bool {
        matches!(self, Platform::MacosArm64 | Platform::MacosX64)
    }

    fn exe_name(&self, stem: &str) -> String {
        if self.is_windows() {
            format!("{}.exe", stem)
        } else {
            stem.to_string()
        }
    }
}

/// Paths inside one platform's bundle directory.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleLayout {
    root: PathBuf,
    platform: Platform,
}

impl BundleLayout {
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn marker_path(&self) -> PathBuf {
        self.root.join(MARKER_FILE_NAME)
    }

    pub fn vapoursynth_dir(&self) -> PathBuf {
        self.root.join("vapoursynth")
    }

    pub fn ffmpeg_dir(&self) -> PathBuf {
        self.root.join("ffmpeg")
    }

    pub fn vspipe_path(&self) -> PathBuf {
        let vs_dir = self.vapoursynth_dir();
        if self.platform.is_windows() {
            // Portable VapourSynth ships VSPipe.exe; older bundles use lowercase
            let upper = vs_dir.join("VSPipe.exe");
            if upper.exists() {
                return upper;
            }
            return vs_dir.join("vspipe.exe");
        }
        vs_dir.join("vspipe")
    }

    pub fn ffmpeg_path(&self) -> PathBuf {
        self.ffmpeg_dir().join(self.platform.exe_name("ffmpeg"))
    }

    pub fn python_home(&self) -> PathBuf {
        if self.platform.is_macos() {
            self.root
                .join("python")
                .join("Python.framework")
                .join("Versions")
                .join("Current")
        } else if self.platform.is_windows() {
            self.vapoursynth_dir()
        } else {
            self.root.join("python")
        }
    }

    pub fn python_path_entries(&self) -> Vec<PathBuf> {
        if self.platform.is_windows() {
            return vec![self.vapoursynth_dir().join("Lib").join("site-packages")];
        }

        let mut entries = vec![self.root.join("python-packages")];
        let lib_dir = self.python_home().join("lib");
        if let Ok(read_dir) = std::fs::read_dir(&lib_dir) {
            let mut versions: Vec<PathBuf> = read_dir
                .flatten()
                .filter(|e| e.file_name().to_string_lossy().starts_with("python3"))
                .map(|e| e.path().join("site-packages"))
                .collect();
            versions.sort();
            entries.extend(versions.into_iter().rev());
        }
        entries
    }

    pub fn plugin_dir(&self) -> PathBuf {
        if self.platform.is_windows() {
            self.vapoursynth_dir().join("vs-plugins")
        } else {
            self.vapoursynth_dir().join("plugins")
        }
    }

    pub fn nnedi3_weights_path(&self) -> PathBuf {
        if self.platform.is_windows() {
            self.plugin_dir().join("nnedi3_weights.bin")
        } else {
            self.root
                .join("resources")
                .join("NNEDI3CL")
                .join("nnedi3_weights.bin")
        }
    }

    /// Directories prepended to PATH for subprocesses.
    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.ffmpeg_dir(), self.vapoursynth_dir()];
        if self.platform.is_macos() {
            dirs.push(self.python_home().join("bin"));
        }
        dirs
    }

    /// Files whose absence means the bundle is unusable.
    pub fn critical_files(&self) -> Vec<PathBuf> {
        vec![
            self.vspipe_path(),
            self.ffmpeg_path(),
            self.python_home(),
            self.plugin_dir(),
        ]
    }

    /// Files that must carry the executable bit after extraction.
    pub fn executables(&self) -> Vec<PathBuf> {
        let mut files = vec![self.vspipe_path(), self.ffmpeg_path()];
        let ffprobe = self.ffmpeg_dir().join(self.platform.exe_name("ffprobe"));
        if ffprobe.exists() {
            files.push(ffprobe);
        }
        if self.platform.is_macos() {
            let bin = self.python_home().join("bin");
            if let Ok(read_dir) = std::fs::read_dir(&bin) {
                files.extend(read_dir.flatten().map(|e| e.path()).filter(|p| p.is_file()));
            }
        }
        files
    }

    pub fn missing_critical_files(&self) -> Vec<PathBuf> {
        self.critical_files()
            .into_iter()
            .filter(|p| !p.exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_ids() {
        assert_eq!(Platform::WindowsX64.id(), "windows-x64");
        assert_eq!(Platform::from_id("macos-arm64"), Some(Platform::MacosArm64));
        assert_eq!(Platform::from_id("solaris-sparc"), None);
    }

    #[test]
    fn test_windows_layout() {
        let layout = BundleLayout::new("C:/deps/windows-x64", Platform::WindowsX64);
        assert!(layout.ffmpeg_path().ends_with("ffmpeg/ffmpeg.exe"));
        assert!(layout.vspipe_path().ends_with("vapoursynth/vspipe.exe"));
        assert!(layout.plugin_dir().ends_with("vs-plugins"));
        assert_eq!(layout.python_home(), layout.vapoursynth_dir());
        assert!(layout.nnedi3_weights_path().starts_with(layout.plugin_dir()));
    }

    #[test]
    fn test_macos_layout_finds_site_packages() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BundleLayout::new(dir.path(), Platform::MacosArm64);
        let site = layout.python_home().join("lib").join("python3.12").join("site-packages");
        std::fs::create_dir_all(&site).unwrap();

        let entries = layout.python_path_entries();
        assert_eq!(entries[0], dir.path().join("python-packages"));
        assert_eq!(entries[1], site);
        assert!(layout.bin_dirs().contains(&layout.python_home().join("bin")));
    }

    #[test]
    fn test_missing_critical_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BundleLayout::new(dir.path(), Platform::LinuxX64);
        assert_eq!(layout.missing_critical_files().len(), layout.critical_files().len());

        std::fs::create_dir_all(layout.plugin_dir()).unwrap();
        std::fs::create_dir_all(layout.python_home()).unwrap();
        std::fs::create_dir_all(layout.ffmpeg_dir()).unwrap();
        std::fs::write(layout.vspipe_path(), "").unwrap();
        std::fs::write(layout.ffmpeg_path(), "").unwrap();
        assert!(layout.missing_critical_files().is_empty());
    }
}
