// Worker stdout protocol: one JSON object per line, discriminated by "type"

use crate::models::{LogLevel, ProgressInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Progress {
        frame: i64,
        #[serde(rename = "totalFrames")]
        total_frames: i64,
        fps: f64,
        eta: f64,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    Error {
        message: String,
    },
    Complete {
        success: bool,
        #[serde(rename = "outputPath", default, skip_serializing_if = "Option::is_none")]
        output_path: Option<String>,
    },
}

const KNOWN_TYPES: [&str; 4] = ["progress", "log", "error", "complete"];

impl WorkerMessage {
    pub fn progress_info(&self) -> Option<ProgressInfo> {
        match self {
            WorkerMessage::Progress {
                frame,
                total_frames,
                fps,
                eta,
            } => Some(ProgressInfo::new(*frame, *total_frames, *fps, *eta)),
            _ => None,
        }
    }
}

/// Classification of a single stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Message(WorkerMessage),
    /// Not protocol JSON; forwarded as an unstructured log line.
    PlainText(String),
    /// A recognized record type with missing or mistyped fields.
    Malformed { kind: String, reason: String },
}

pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return ParsedLine::PlainText(trimmed.to_string()),
    };

    let kind = match value.get("type").and_then(|t| t.as_str()) {
        Some(kind) if KNOWN_TYPES.contains(&kind) => kind.to_string(),
        _ => return ParsedLine::PlainText(trimmed.to_string()),
    };

    match serde_json::from_value::<WorkerMessage>(value) {
        Ok(message) => ParsedLine::Message(message),
        Err(e) => ParsedLine::Malformed {
            kind,
            reason: e.to_string(),
        },
    }
}
