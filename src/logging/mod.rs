//! Logging setup for VapourBox
//! Mirrors log output into a dated file under the logs directory and handles 7-day retention

use log::info;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const LOG_RETENTION_DAYS: u64 = 7;

/// Copies every record to stderr and the day's log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// `vapourbox-YYYY-MM-DD.log` for the current local date.
pub fn log_file_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(format!("vapourbox-{}.log", chrono::Local::now().format("%Y-%m-%d")))
}

/// Opens today's log file for appending, creating `logs_dir` if needed.
pub fn open_log_file(logs_dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(logs_dir)?;
    let path = log_file_path(logs_dir);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Initializes the global logger. `RUST_LOG` overrides the default `info` filter.
/// With `logs_dir` set, records also go to today's file there; stderr alone otherwise.
pub fn init(logs_dir: Option<&Path>) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    if let Some(dir) = logs_dir {
        match open_log_file(dir) {
            Ok((_, file)) => {
                builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
            }
            Err(e) => eprintln!("Could not open log file in {:?}: {}", dir, e),
        }
    }

    let _ = builder.try_init();
}

/// Removes `*.log` files in `logs_dir` older than `retention_days`. Returns how many were removed.
pub fn cleanup_old_logs(logs_dir: &Path, retention_days: u64) -> usize {
    if !logs_dir.exists() {
        return 0;
    }

    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    if let Ok(entries) = fs::read_dir(logs_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "log") {
                if let Ok(meta) = fs::metadata(&path) {
                    if let Ok(modified) = meta.modified() {
                        if let Ok(age) = now.duration_since(modified) {
                            if age > retention && fs::remove_file(&path).is_ok() {
                                info!("Cleaned up old log: {:?}", path.file_name());
                                removed += 1;
                            }
                        }
                    }
                }
            }
        }
    }

    removed
}
