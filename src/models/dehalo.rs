// Halo removal pass
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum DehaloMethod {
        #[default]
        DehaloAlpha => "DeHalo_alpha",
        FineDehalo => "FineDehalo",
        Yahr => "YAHR",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehaloParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: DehaloMethod,
    #[serde(default = "default_radius")]
    pub rx: f64,
    #[serde(default = "default_radius")]
    pub ry: f64,
    #[serde(default = "default_strength")]
    pub dark_str: f64,
    #[serde(default = "default_strength")]
    pub bright_str: f64,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: i32,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: i32,
    #[serde(default = "default_yahr_blur")]
    pub yahr_blur: i32,
    #[serde(default = "default_yahr_depth")]
    pub yahr_depth: i32,
}

fn default_radius() -> f64 { 2.0 }
fn default_strength() -> f64 { 1.0 }
fn default_low_threshold() -> i32 { 50 }
fn default_high_threshold() -> i32 { 100 }
fn default_yahr_blur() -> i32 { 2 }
fn default_yahr_depth() -> i32 { 32 }

impl Default for DehaloParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            method: DehaloMethod::default(),
            rx: default_radius(),
            ry: default_radius(),
            dark_str: default_strength(),
            bright_str: default_strength(),
            low_threshold: default_low_threshold(),
            high_threshold: default_high_threshold(),
            yahr_blur: default_yahr_blur(),
            yahr_depth: default_yahr_depth(),
        }
    }
}

impl DynamicRecord for DehaloParameters {
    const PASS: PassKind = PassKind::Dehalo;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            method,
            rx,
            ry,
            dark_str,
            bright_str,
            low_threshold,
            high_threshold,
            yahr_blur,
            yahr_depth,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, Some(method.as_str()))
            .with("rx", *rx)
            .with("ry", *ry)
            .with("darkStr", *dark_str)
            .with("brightStr", *bright_str)
            .with("lowThreshold", *low_threshold)
            .with("highThreshold", *high_threshold)
            .with("yahrBlur", *yahr_blur)
            .with("yahrDepth", *yahr_depth)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;

        let parsed = Self {
            enabled: r.enabled(),
            method: r.method(d.method)?,
            rx: r.float("rx", d.rx)?,
            ry: r.float("ry", d.ry)?,
            dark_str: r.float("darkStr", d.dark_str)?,
            bright_str: r.float("brightStr", d.bright_str)?,
            low_threshold: r.int("lowThreshold", d.low_threshold)?,
            high_threshold: r.int("highThreshold", d.high_threshold)?,
            yahr_blur: r.int("yahrBlur", d.yahr_blur)?,
            yahr_depth: r.int("yahrDepth", d.yahr_depth)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
