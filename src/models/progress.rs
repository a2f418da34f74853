// Progress and log records surfaced from worker runs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub frame: i64,
    pub total_frames: i64,
    pub fps: f64,
    /// Seconds remaining.
    pub eta: f64,
}

impl ProgressInfo {
    pub fn new(frame: i64, total_frames: i64, fps: f64, eta: f64) -> Self {
        Self {
            frame,
            total_frames,
            fps,
            eta,
        }
    }

    /// Completion fraction in 0.0..=1.0; 0 when the total is unknown.
    pub fn progress(&self) -> f64 {
        if self.total_frames <= 0 {
            return 0.0;
        }
        (self.frame as f64 / self.total_frames as f64).clamp(0.0, 1.0)
    }

    pub fn percent_complete(&self) -> u8 {
        (self.progress() * 100.0) as u8
    }

    pub fn eta_formatted(&self) -> String {
        if self.eta <= 0.0 || !self.eta.is_finite() {
            return "--".to_string();
        }

        let total_secs = self.eta as u64;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        if hours > 0 {
            format!("{}h {:02}m {:02}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {:02}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    pub fn fps_formatted(&self) -> String {
        if self.fps <= 0.0 || !self.fps.is_finite() {
            return "-- fps".to_string();
        }
        format!("{:.1} fps", self.fps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_log_level(&self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub source: LogSource,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, source: LogSource) -> Self {
        Self {
            level,
            message: message.into(),
            source,
            timestamp: Utc::now(),
        }
    }
}
