// Crate-wide error type
use serde::{Serialize, Serializer};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{name} not found (searched: {})", format_searched(.searched))]
    ExecutableNotFound { name: String, searched: Vec<PathBuf> },

    #[error("A job is already running")]
    AlreadyRunning,

    #[error("Failed to parse worker output: {0}")]
    ProtocolParse(String),

    #[error("Worker exited with code {code}{}", format_tail(.log_tail))]
    WorkerExitFailure { code: i32, log_tail: Vec<String> },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    IntegrityError { expected: String, actual: String },

    #[error("Download failed: {0}")]
    NetworkError(String),

    #[error("Parameter '{parameter}' rejected for {pass}: {reason}")]
    SchemaMismatch {
        pass: String,
        parameter: String,
        reason: String,
    },

    #[error("Invalid trim range: start frame {start} is after end frame {end}")]
    InvalidTrimRange { start: u64, end: u64 },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Dependencies are not installed ({0})")]
    DependenciesNotReady(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema_mismatch(
        pass: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::SchemaMismatch {
            pass: pass.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

// Surfaced to the UI as a plain message
impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e.to_string())
    }
}

fn format_searched(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_tail(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_failure_carries_log_tail() {
        let err = Error::WorkerExitFailure {
            code: 137,
            log_tail: vec!["Loading plugins".to_string(), "Out of memory".to_string()],
        };
        let text = err.to_string();
        assert!(text.starts_with("Worker exited with code 137"));
        assert!(text.ends_with("Out of memory"));
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&Error::AlreadyRunning).unwrap();
        assert_eq!(json, "\"A job is already running\"");
    }
}
