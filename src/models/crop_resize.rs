// Crop and resize pass
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum ResizeKernel {
        #[default]
        Spline36 => "spline36",
        Lanczos => "lanczos",
        Bicubic => "bicubic",
        Bilinear => "bilinear",
        Nnedi3 => "nnedi3",
        Eedi3 => "eedi3",
    }
}

param_choice! {
    /// Integer upscale algorithms.
    pub enum UpscaleMethod {
        #[default]
        Nnedi3Rpow2 => "nnedi3Rpow2",
        Eedi3Rpow2 => "eedi3Rpow2",
        Spline36 => "spline36",
    }
}

param_choice! {
    pub enum CropResizePreset {
        #[default]
        Off => "off",
        RemoveOverscan => "removeOverscan",
        Resize720p => "resize720p",
        Resize1080p => "resize1080p",
        Resize4k => "resize4k",
        Custom => "custom",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropResizeParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub preset: CropResizePreset,
    #[serde(default)]
    pub crop_enabled: bool,
    #[serde(default)]
    pub crop_left: i32,
    #[serde(default)]
    pub crop_right: i32,
    #[serde(default)]
    pub crop_top: i32,
    #[serde(default)]
    pub crop_bottom: i32,
    #[serde(default)]
    pub resize_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_height: Option<i32>,
    #[serde(default)]
    pub kernel: ResizeKernel,
    #[serde(default = "default_true")]
    pub maintain_aspect: bool,
    #[serde(default)]
    pub use_integer_upscale: bool,
    #[serde(default)]
    pub upscale_method: UpscaleMethod,
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: i32,
}

fn default_true() -> bool { true }
fn default_upscale_factor() -> i32 { 2 }

impl Default for CropResizeParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: CropResizePreset::default(),
            crop_enabled: false,
            crop_left: 0,
            crop_right: 0,
            crop_top: 0,
            crop_bottom: 0,
            resize_enabled: false,
            target_width: None,
            target_height: None,
            kernel: ResizeKernel::default(),
            maintain_aspect: true,
            use_integer_upscale: false,
            upscale_method: UpscaleMethod::default(),
            upscale_factor: default_upscale_factor(),
        }
    }
}

impl CropResizeParameters {
    pub fn total_horizontal_crop(&self) -> i32 {
        self.crop_left + self.crop_right
    }

    pub fn total_vertical_crop(&self) -> i32 {
        self.crop_top + self.crop_bottom
    }
}

impl DynamicRecord for CropResizeParameters {
    const PASS: PassKind = PassKind::CropResize;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            preset,
            crop_enabled,
            crop_left,
            crop_right,
            crop_top,
            crop_bottom,
            resize_enabled,
            target_width,
            target_height,
            kernel,
            maintain_aspect,
            use_integer_upscale,
            upscale_method,
            upscale_factor,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, None)
            .with("preset", preset.as_str())
            .with("cropEnabled", *crop_enabled)
            .with("cropLeft", *crop_left)
            .with("cropRight", *crop_right)
            .with("cropTop", *crop_top)
            .with("cropBottom", *crop_bottom)
            .with("resizeEnabled", *resize_enabled)
            .with("targetWidth", *target_width)
            .with("targetHeight", *target_height)
            .with("kernel", kernel.as_str())
            .with("maintainAspect", *maintain_aspect)
            .with("useIntegerUpscale", *use_integer_upscale)
            .with("upscaleMethod", upscale_method.as_str())
            .with("upscaleFactor", *upscale_factor)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;
        r.no_method()?;

        let parsed = Self {
            enabled: r.enabled(),
            preset: r.choice("preset", d.preset)?,
            crop_enabled: r.bool("cropEnabled", d.crop_enabled)?,
            crop_left: r.int("cropLeft", d.crop_left)?,
            crop_right: r.int("cropRight", d.crop_right)?,
            crop_top: r.int("cropTop", d.crop_top)?,
            crop_bottom: r.int("cropBottom", d.crop_bottom)?,
            resize_enabled: r.bool("resizeEnabled", d.resize_enabled)?,
            target_width: r.opt_int("targetWidth")?,
            target_height: r.opt_int("targetHeight")?,
            kernel: r.choice("kernel", d.kernel)?,
            maintain_aspect: r.bool("maintainAspect", d.maintain_aspect)?,
            use_integer_upscale: r.bool("useIntegerUpscale", d.use_integer_upscale)?,
            upscale_method: r.choice("upscaleMethod", d.upscale_method)?,
            upscale_factor: r.int("upscaleFactor", d.upscale_factor)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dynamic::ParamValue;

    #[test]
    fn test_crop_totals() {
        let params = CropResizeParameters {
            crop_left: 8,
            crop_right: 8,
            crop_top: 4,
            crop_bottom: 12,
            ..Default::default()
        };
        assert_eq!(params.total_horizontal_crop(), 16);
        assert_eq!(params.total_vertical_crop(), 16);
    }

    #[test]
    fn test_absent_target_size_stays_absent() {
        let params = CropResizeParameters {
            resize_enabled: true,
            target_width: Some(1280),
            ..Default::default()
        };
        let dynamic = params.to_dynamic();
        assert_eq!(dynamic.get("targetHeight"), Some(&ParamValue::Unset));

        let back = CropResizeParameters::from_dynamic(&dynamic).unwrap();
        assert_eq!(back.target_width, Some(1280));
        assert_eq!(back.target_height, None);
    }
}
