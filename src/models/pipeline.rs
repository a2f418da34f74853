// Restoration pipeline: the fixed, ordered set of passes
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

use super::chroma_fix::ChromaFixParameters;
use super::color_correction::ColorCorrectionParameters;
use super::crop_resize::CropResizeParameters;
use super::deband::DebandParameters;
use super::deblock::DeblockParameters;
use super::dehalo::DehaloParameters;
use super::deinterlace::QtgmcParameters;
use super::dynamic::{DynamicParameters, DynamicRecord};
use super::noise_reduction::NoiseReductionParameters;
use super::sharpen::SharpenParameters;
use super::video_job::{EncodingSettings, FieldOrder, VideoJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassKind {
    Deinterlace,
    NoiseReduction,
    Dehalo,
    Deblock,
    Deband,
    Sharpen,
    ColorCorrection,
    ChromaFixes,
    CropResize,
}

impl PassKind {
    /// Execution order used by the worker.
    pub const ALL: [PassKind; 9] = [
        PassKind::Deinterlace,
        PassKind::NoiseReduction,
        PassKind::Dehalo,
        PassKind::Deblock,
        PassKind::Deband,
        PassKind::Sharpen,
        PassKind::ColorCorrection,
        PassKind::ChromaFixes,
        PassKind::CropResize,
    ];

    pub fn filter_id(&self) -> &'static str {
        match self {
            PassKind::Deinterlace => "deinterlace",
            PassKind::NoiseReduction => "noiseReduction",
            PassKind::Dehalo => "dehalo",
            PassKind::Deblock => "deblock",
            PassKind::Deband => "deband",
            PassKind::Sharpen => "sharpen",
            PassKind::ColorCorrection => "colorCorrection",
            PassKind::ChromaFixes => "chromaFixes",
            PassKind::CropResize => "cropResize",
        }
    }

    pub fn from_filter_id(id: &str) -> Option<PassKind> {
        Self::ALL.iter().copied().find(|p| p.filter_id() == id)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PassKind::Deinterlace => "Deinterlace",
            PassKind::NoiseReduction => "Noise Reduction",
            PassKind::Dehalo => "Dehalo",
            PassKind::Deblock => "Deblock",
            PassKind::Deband => "Deband",
            PassKind::Sharpen => "Sharpen",
            PassKind::ColorCorrection => "Color Correction",
            PassKind::ChromaFixes => "Chroma Fixes",
            PassKind::CropResize => "Crop / Resize",
        }
    }
}

/// One pass's full typed record, tagged by pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassParameters {
    Deinterlace(QtgmcParameters),
    NoiseReduction(NoiseReductionParameters),
    Dehalo(DehaloParameters),
    Deblock(DeblockParameters),
    Deband(DebandParameters),
    Sharpen(SharpenParameters),
    ColorCorrection(ColorCorrectionParameters),
    ChromaFixes(ChromaFixParameters),
    CropResize(CropResizeParameters),
}

impl PassParameters {
    pub fn kind(&self) -> PassKind {
        match self {
            PassParameters::Deinterlace(_) => PassKind::Deinterlace,
            PassParameters::NoiseReduction(_) => PassKind::NoiseReduction,
            PassParameters::Dehalo(_) => PassKind::Dehalo,
            PassParameters::Deblock(_) => PassKind::Deblock,
            PassParameters::Deband(_) => PassKind::Deband,
            PassParameters::Sharpen(_) => PassKind::Sharpen,
            PassParameters::ColorCorrection(_) => PassKind::ColorCorrection,
            PassParameters::ChromaFixes(_) => PassKind::ChromaFixes,
            PassParameters::CropResize(_) => PassKind::CropResize,
        }
    }

    pub fn to_dynamic(&self) -> DynamicParameters {
        match self {
            PassParameters::Deinterlace(p) => p.to_dynamic(),
            PassParameters::NoiseReduction(p) => p.to_dynamic(),
            PassParameters::Dehalo(p) => p.to_dynamic(),
            PassParameters::Deblock(p) => p.to_dynamic(),
            PassParameters::Deband(p) => p.to_dynamic(),
            PassParameters::Sharpen(p) => p.to_dynamic(),
            PassParameters::ColorCorrection(p) => p.to_dynamic(),
            PassParameters::ChromaFixes(p) => p.to_dynamic(),
            PassParameters::CropResize(p) => p.to_dynamic(),
        }
    }

    pub fn from_dynamic(pass: PassKind, params: &DynamicParameters) -> Result<Self> {
        Ok(match pass {
            PassKind::Deinterlace => PassParameters::Deinterlace(QtgmcParameters::from_dynamic(params)?),
            PassKind::NoiseReduction => {
                PassParameters::NoiseReduction(NoiseReductionParameters::from_dynamic(params)?)
            }
            PassKind::Dehalo => PassParameters::Dehalo(DehaloParameters::from_dynamic(params)?),
            PassKind::Deblock => PassParameters::Deblock(DeblockParameters::from_dynamic(params)?),
            PassKind::Deband => PassParameters::Deband(DebandParameters::from_dynamic(params)?),
            PassKind::Sharpen => PassParameters::Sharpen(SharpenParameters::from_dynamic(params)?),
            PassKind::ColorCorrection => {
                PassParameters::ColorCorrection(ColorCorrectionParameters::from_dynamic(params)?)
            }
            PassKind::ChromaFixes => PassParameters::ChromaFixes(ChromaFixParameters::from_dynamic(params)?),
            PassKind::CropResize => PassParameters::CropResize(CropResizeParameters::from_dynamic(params)?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationPipeline {
    #[serde(default)]
    pub deinterlace: QtgmcParameters,
    #[serde(default)]
    pub noise_reduction: NoiseReductionParameters,
    #[serde(default)]
    pub dehalo: DehaloParameters,
    #[serde(default)]
    pub deblock: DeblockParameters,
    #[serde(default)]
    pub deband: DebandParameters,
    #[serde(default)]
    pub sharpen: SharpenParameters,
    #[serde(default)]
    pub color_correction: ColorCorrectionParameters,
    #[serde(default)]
    pub chroma_fixes: ChromaFixParameters,
    #[serde(default)]
    pub crop_resize: CropResizeParameters,
}

/// Submission-time inputs that are not part of the pipeline itself.
#[derive(Debug, Clone, Default)]
pub struct JobOverrides {
    pub input_path: String,
    pub output_path: String,
    pub encoding: EncodingSettings,
    pub detected_field_order: Option<FieldOrder>,
    /// User choice; wins over detection when it names a field order.
    pub field_order_override: Option<FieldOrder>,
    pub start_frame: Option<u64>,
    pub end_frame: Option<u64>,
    pub total_frames: Option<u64>,
    pub input_frame_rate: Option<f64>,
}

impl RestorationPipeline {
    fn enabled_flag(&mut self, pass: PassKind) -> &mut bool {
        match pass {
            PassKind::Deinterlace => &mut self.deinterlace.enabled,
            PassKind::NoiseReduction => &mut self.noise_reduction.enabled,
            PassKind::Dehalo => &mut self.dehalo.enabled,
            PassKind::Deblock => &mut self.deblock.enabled,
            PassKind::Deband => &mut self.deband.enabled,
            PassKind::Sharpen => &mut self.sharpen.enabled,
            PassKind::ColorCorrection => &mut self.color_correction.enabled,
            PassKind::ChromaFixes => &mut self.chroma_fixes.enabled,
            PassKind::CropResize => &mut self.crop_resize.enabled,
        }
    }

    /// Flips only the flag; the pass's other values are untouched.
    pub fn set_pass_enabled(&mut self, pass: PassKind, enabled: bool) {
        *self.enabled_flag(pass) = enabled;
    }

    pub fn is_pass_enabled(&self, pass: PassKind) -> bool {
        match pass {
            PassKind::Deinterlace => self.deinterlace.enabled,
            PassKind::NoiseReduction => self.noise_reduction.enabled,
            PassKind::Dehalo => self.dehalo.enabled,
            PassKind::Deblock => self.deblock.enabled,
            PassKind::Deband => self.deband.enabled,
            PassKind::Sharpen => self.sharpen.enabled,
            PassKind::ColorCorrection => self.color_correction.enabled,
            PassKind::ChromaFixes => self.chroma_fixes.enabled,
            PassKind::CropResize => self.crop_resize.enabled,
        }
    }

    pub fn enabled_passes(&self) -> Vec<PassKind> {
        PassKind::ALL
            .iter()
            .copied()
            .filter(|p| self.is_pass_enabled(*p))
            .collect()
    }

    pub fn pass_parameters(&self, pass: PassKind) -> PassParameters {
        match pass {
            PassKind::Deinterlace => PassParameters::Deinterlace(self.deinterlace.clone()),
            PassKind::NoiseReduction => PassParameters::NoiseReduction(self.noise_reduction.clone()),
            PassKind::Dehalo => PassParameters::Dehalo(self.dehalo.clone()),
            PassKind::Deblock => PassParameters::Deblock(self.deblock.clone()),
            PassKind::Deband => PassParameters::Deband(self.deband.clone()),
            PassKind::Sharpen => PassParameters::Sharpen(self.sharpen.clone()),
            PassKind::ColorCorrection => PassParameters::ColorCorrection(self.color_correction.clone()),
            PassKind::ChromaFixes => PassParameters::ChromaFixes(self.chroma_fixes.clone()),
            PassKind::CropResize => PassParameters::CropResize(self.crop_resize.clone()),
        }
    }

    /// Replaces the whole record for the pass named by `params`, including its flag.
    pub fn set_pass_parameters(&mut self, params: PassParameters) {
        match params {
            PassParameters::Deinterlace(p) => self.deinterlace = p,
            PassParameters::NoiseReduction(p) => self.noise_reduction = p,
            PassParameters::Dehalo(p) => self.dehalo = p,
            PassParameters::Deblock(p) => self.deblock = p,
            PassParameters::Deband(p) => self.deband = p,
            PassParameters::Sharpen(p) => self.sharpen = p,
            PassParameters::ColorCorrection(p) => self.color_correction = p,
            PassParameters::ChromaFixes(p) => self.chroma_fixes = p,
            PassParameters::CropResize(p) => self.crop_resize = p,
        }
    }

    pub fn to_dynamic_parameters(&self, pass: PassKind) -> DynamicParameters {
        self.pass_parameters(pass).to_dynamic()
    }

    /// Returns a copy of the pipeline with `pass` replaced by the converted bag.
    pub fn from_dynamic_parameters(&self, pass: PassKind, params: &DynamicParameters) -> Result<Self> {
        let mut updated = self.clone();
        updated.set_pass_parameters(PassParameters::from_dynamic(pass, params)?);
        Ok(updated)
    }

    /// Snapshots the pipeline into a job with field order resolved.
    pub fn to_job(&self, overrides: JobOverrides) -> Result<VideoJob> {
        if let (Some(start), Some(end)) = (overrides.start_frame, overrides.end_frame) {
            if start > end {
                return Err(Error::InvalidTrimRange { start, end });
            }
        }

        let mut pipeline = self.clone();
        let resolved_tff = overrides
            .field_order_override
            .and_then(|o| o.tff_value())
            .or_else(|| overrides.detected_field_order.and_then(|o| o.tff_value()));
        if resolved_tff.is_some() {
            pipeline.deinterlace.tff = resolved_tff;
        }

        Ok(VideoJob {
            id: uuid::Uuid::new_v4(),
            input_path: overrides.input_path,
            output_path: overrides.output_path,
            qtgmc_parameters: pipeline.deinterlace.clone(),
            restoration_pipeline: pipeline,
            encoding_settings: overrides.encoding,
            total_frames: overrides.total_frames,
            start_frame: overrides.start_frame,
            end_frame: overrides.end_frame,
            detected_field_order: overrides.detected_field_order,
            input_frame_rate: overrides.input_frame_rate,
        })
    }
}
