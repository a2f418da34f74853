// Checksummed streaming download of the bundle archive

use crate::error::{Error, Result};
use crate::models::{DependencyMetadata, InstallPhase, InstallProgress, PlatformArchive};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveSource {
    Http(Url),
    /// Pre-downloaded archive, still verified against the expected checksum.
    LocalFile(PathBuf),
}

impl ArchiveSource {
    pub fn github_release(metadata: &DependencyMetadata, archive: &PlatformArchive) -> Result<Self> {
        let url = format!(
            "https://github.com/{}/releases/download/{}/{}",
            metadata.github_repo, metadata.release_tag, archive.filename
        );
        Url::parse(&url)
            .map(ArchiveSource::Http)
            .map_err(|e| Error::InvalidArgument(format!("Invalid download URL {}: {}", url, e)))
    }

    pub fn describe(&self) -> String {
        match self {
            ArchiveSource::Http(url) => url.to_string(),
            ArchiveSource::LocalFile(path) => path.display().to_string(),
        }
    }
}

/// Streams `source` into `dest`, returning the lowercase hex sha256 of the bytes written.
/// Blocking; run it on a blocking thread.
pub fn fetch_to_file(
    source: &ArchiveSource,
    dest: &Path,
    expected_size: u64,
    progress: Option<&UnboundedSender<InstallProgress>>,
) -> Result<String> {
    let (reader, total): (Box<dyn Read>, u64) = match source {
        ArchiveSource::Http(url) => {
            let response = ureq::get(url.as_str())
                .call()
                .map_err(|e| Error::NetworkError(e.to_string()))?;
            let total = response
                .header("Content-Length")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(expected_size);
            (Box::new(response.into_reader()), total)
        }
        ArchiveSource::LocalFile(path) => {
            let file = File::open(path)?;
            let total = file.metadata().map(|m| m.len()).unwrap_or(expected_size);
            (Box::new(file), total)
        }
    };

    let mut writer = BufWriter::new(File::create(dest)?);
    let digest = copy_and_hash(reader, &mut writer, |downloaded| {
        if let Some(tx) = progress {
            let _ = tx.send(InstallProgress::new(InstallPhase::Downloading, downloaded, total));
        }
    })
    .map_err(|e| match source {
        ArchiveSource::Http(_) => Error::NetworkError(e.to_string()),
        ArchiveSource::LocalFile(_) => Error::Io(e),
    })?;

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(digest)
}

fn copy_and_hash<R: Read, W: Write>(
    mut reader: R,
    writer: &mut W,
    mut on_chunk: impl FnMut(u64),
) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
        downloaded += n as u64;
        on_chunk(downloaded);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn verify_checksum(expected: &str, actual: &str) -> Result<()> {
    if expected.trim().eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(Error::IntegrityError {
            expected: expected.trim().to_lowercase(),
            actual: actual.to_string(),
        })
    }
}
