// Video job handed to the worker, plus encoder settings
use crate::error::Result;
use crate::file_manager::{read_json_file, write_json_file};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::deinterlace::QtgmcParameters;
use super::pipeline::RestorationPipeline;

/// Immutable once handed to a subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    pub id: Uuid,
    pub input_path: String,
    pub output_path: String,
    /// Mirror of `restorationPipeline.deinterlace` for older workers.
    pub qtgmc_parameters: QtgmcParameters,
    pub restoration_pipeline: RestorationPipeline,
    pub encoding_settings: EncodingSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_field_order: Option<FieldOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_frame_rate: Option<f64>,
}

impl VideoJob {
    pub fn load(path: &Path) -> Result<Self> {
        read_json_file(path)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_json_file(path, self)
    }

    /// Number of frames the job will produce, when known.
    pub fn frame_count(&self) -> Option<u64> {
        let end = self.end_frame.or_else(|| self.total_frames.map(|t| t.saturating_sub(1)))?;
        let start = self.start_frame.unwrap_or(0);
        Some(end.saturating_sub(start) + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingSettings {
    #[serde(default)]
    pub codec: VideoCodec,
    #[serde(default = "default_encoder_preset")]
    pub encoder_preset: String,
    /// CRF for x264/x265; ignored by lossless and ProRes codecs.
    #[serde(default = "default_quality")]
    pub quality: i32,
    #[serde(default = "default_true")]
    pub audio_copy: bool,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: i32,
    #[serde(default, alias = "customFfmpegArgs")]
    pub custom_args: String,
    #[serde(default)]
    pub container: ContainerFormat,
}

fn default_encoder_preset() -> String {
    "medium".to_string()
}

fn default_quality() -> i32 {
    18
}

fn default_true() -> bool {
    true
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> i32 {
    192
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::default(),
            encoder_preset: default_encoder_preset(),
            quality: default_quality(),
            audio_copy: true,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            custom_args: String::new(),
            container: ContainerFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoCodec {
    #[default]
    #[serde(rename = "libx264")]
    H264,
    #[serde(rename = "libx265")]
    H265,
    #[serde(rename = "ffv1")]
    Ffv1,
    #[serde(rename = "prores_ks -profile:v 0")]
    ProResProxy,
    #[serde(rename = "prores_ks -profile:v 1")]
    ProResLt,
    #[serde(rename = "prores_ks -profile:v 2")]
    ProRes422,
    #[serde(rename = "prores_ks -profile:v 3")]
    ProResHq,
}

impl VideoCodec {
    pub fn prores_profile(&self) -> Option<i32> {
        match self {
            VideoCodec::ProResProxy => Some(0),
            VideoCodec::ProResLt => Some(1),
            VideoCodec::ProRes422 => Some(2),
            VideoCodec::ProResHq => Some(3),
            _ => None,
        }
    }

    pub fn preferred_container(&self) -> ContainerFormat {
        match self {
            VideoCodec::Ffv1 => ContainerFormat::Avi,
            c if c.prores_profile().is_some() => ContainerFormat::Mov,
            _ => ContainerFormat::Mp4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Mp4,
    Mov,
    Mkv,
    Avi,
}

impl ContainerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "mkv",
            ContainerFormat::Avi => "avi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOrder {
    #[serde(rename = "tff")]
    TopFieldFirst,
    #[serde(rename = "bff")]
    BottomFieldFirst,
    Progressive,
    Unknown,
}

impl FieldOrder {
    /// `Some(true)` for TFF, `Some(false)` for BFF, `None` otherwise.
    pub fn tff_value(&self) -> Option<bool> {
        match self {
            FieldOrder::TopFieldFirst => Some(true),
            FieldOrder::BottomFieldFirst => Some(false),
            FieldOrder::Progressive | FieldOrder::Unknown => None,
        }
    }
}
