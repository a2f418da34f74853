// Archive extraction for dependency bundles

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn from_file_name(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else {
            Err(Error::Archive(format!("Unsupported archive type: {}", name)))
        }
    }
}

/// Extracts every entry of `archive` under `dest`. Returns the number of files written.
pub fn extract_archive(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest),
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
    }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| Error::Archive(format!("Unsafe path in archive: {}", entry.name())))?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
        written += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))?;
            }
        }
    }

    Ok(written)
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<usize> {
    let decoder = GzDecoder::new(File::open(archive_path)?);
    let mut archive = tar::Archive::new(decoder);
    let mut written = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let relative = safe_relative(&path)
            .ok_or_else(|| Error::Archive(format!("Unsafe path in archive: {}", path.display())))?;
        let out_path = dest.join(relative);

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let is_file = entry.header().entry_type().is_file();
        entry.unpack(&out_path)?;
        if is_file {
            written += 1;
        }
    }

    Ok(written)
}

/// Normal components only; rejects absolute paths and `..`.
fn safe_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default().unix_permissions(0o755))
                .unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(ArchiveFormat::from_file_name("deps-win.ZIP").unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_file_name("deps-mac.tar.gz").unwrap(), ArchiveFormat::TarGz);
        assert!(ArchiveFormat::from_file_name("deps.7z").is_err());
    }

    #[test]
    fn test_zip_extracts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("deps.zip");
        write_zip(&archive, &[("ffmpeg/ffmpeg", b"bin"), ("vapoursynth/plugins/readme.txt", b"x")]);

        let dest = dir.path().join("out");
        assert_eq!(extract_archive(&archive, ArchiveFormat::Zip, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("ffmpeg/ffmpeg")).unwrap(), b"bin");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("ffmpeg/ffmpeg")).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_zip_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escaped.txt", b"gotcha")]);

        let dest = dir.path().join("out");
        let result = extract_archive(&archive, ArchiveFormat::Zip, &dest);
        assert!(matches!(result, Err(Error::Archive(_))));
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_tar_gz_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("deps.tar.gz");
        {
            let encoder = flate2::write::GzEncoder::new(
                File::create(&archive).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(encoder);
            let data = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "vapoursynth/vspipe", &data[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = dir.path().join("out");
        assert_eq!(extract_archive(&archive, ArchiveFormat::TarGz, &dest).unwrap(), 1);
        assert!(dest.join("vapoursynth/vspipe").is_file());
    }

    #[test]
    fn test_safe_relative() {
        assert_eq!(safe_relative(Path::new("./a/b")), Some(PathBuf::from("a/b")));
        assert_eq!(safe_relative(Path::new("/etc/passwd")), None);
        assert_eq!(safe_relative(Path::new("a/../../b")), None);
    }
}
