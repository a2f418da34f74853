// Color correction pass
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum ColorCorrectionPreset {
        #[default]
        Off => "off",
        BroadcastSafe => "broadcastSafe",
        EnhanceColors => "enhanceColors",
        Desaturate => "desaturate",
        Custom => "custom",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorCorrectionParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub preset: ColorCorrectionPreset,
    #[serde(default)]
    pub brightness: f64,
    #[serde(default = "default_one")]
    pub contrast: f64,
    #[serde(default)]
    pub hue: f64,
    #[serde(default = "default_one")]
    pub saturation: f64,
    #[serde(default)]
    pub coring: bool,
    #[serde(default)]
    pub apply_levels: bool,
    #[serde(default)]
    pub input_low: i32,
    #[serde(default = "default_255")]
    pub input_high: i32,
    #[serde(default)]
    pub output_low: i32,
    #[serde(default = "default_255")]
    pub output_high: i32,
    #[serde(default = "default_one")]
    pub gamma: f64,
}

fn default_one() -> f64 { 1.0 }
fn default_255() -> i32 { 255 }

impl Default for ColorCorrectionParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: ColorCorrectionPreset::default(),
            brightness: 0.0,
            contrast: 1.0,
            hue: 0.0,
            saturation: 1.0,
            coring: false,
            apply_levels: false,
            input_low: 0,
            input_high: 255,
            output_low: 0,
            output_high: 255,
            gamma: 1.0,
        }
    }
}

impl DynamicRecord for ColorCorrectionParameters {
    const PASS: PassKind = PassKind::ColorCorrection;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            preset,
            brightness,
            contrast,
            hue,
            saturation,
            coring,
            apply_levels,
            input_low,
            input_high,
            output_low,
            output_high,
            gamma,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, None)
            .with("preset", preset.as_str())
            .with("brightness", *brightness)
            .with("contrast", *contrast)
            .with("hue", *hue)
            .with("saturation", *saturation)
            .with("coring", *coring)
            .with("applyLevels", *apply_levels)
            .with("inputLow", *input_low)
            .with("inputHigh", *input_high)
            .with("outputLow", *output_low)
            .with("outputHigh", *output_high)
            .with("gamma", *gamma)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;
        r.no_method()?;

        let parsed = Self {
            enabled: r.enabled(),
            preset: r.choice("preset", d.preset)?,
            brightness: r.float("brightness", d.brightness)?,
            contrast: r.float("contrast", d.contrast)?,
            hue: r.float("hue", d.hue)?,
            saturation: r.float("saturation", d.saturation)?,
            coring: r.bool("coring", d.coring)?,
            apply_levels: r.bool("applyLevels", d.apply_levels)?,
            input_low: r.int("inputLow", d.input_low)?,
            input_high: r.int("inputHigh", d.input_high)?,
            output_low: r.int("outputLow", d.output_low)?,
            output_high: r.int("outputHigh", d.output_high)?,
            gamma: r.float("gamma", d.gamma)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_are_camel_case() {
        let json = serde_json::to_string(&ColorCorrectionPreset::BroadcastSafe).unwrap();
        assert_eq!(json, "\"broadcastSafe\"");
    }

    #[test]
    fn test_bad_preset_is_schema_mismatch() {
        let dynamic = ColorCorrectionParameters::default()
            .to_dynamic()
            .with("preset", "sepia");
        let err = ColorCorrectionParameters::from_dynamic(&dynamic).unwrap_err();
        assert!(err.to_string().contains("sepia"));
    }
}
