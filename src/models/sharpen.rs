// Sharpening pass
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum SharpenMethod {
        #[default]
        LsfMod => "LSFmod",
        Cas => "CAS",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharpenParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: SharpenMethod,
    #[serde(default = "default_strength")]
    pub strength: i32,
    #[serde(default = "default_shoot")]
    pub overshoot: i32,
    #[serde(default = "default_shoot")]
    pub undershoot: i32,
    #[serde(default)]
    pub soft_edge: i32,
    #[serde(default = "default_cas_sharpness")]
    pub cas_sharpness: f64,
}

fn default_strength() -> i32 { 100 }
fn default_shoot() -> i32 { 1 }
fn default_cas_sharpness() -> f64 { 0.5 }

impl Default for SharpenParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            method: SharpenMethod::default(),
            strength: default_strength(),
            overshoot: default_shoot(),
            undershoot: default_shoot(),
            soft_edge: 0,
            cas_sharpness: default_cas_sharpness(),
        }
    }
}

impl DynamicRecord for SharpenParameters {
    const PASS: PassKind = PassKind::Sharpen;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            method,
            strength,
            overshoot,
            undershoot,
            soft_edge,
            cas_sharpness,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, Some(method.as_str()))
            .with("strength", *strength)
            .with("overshoot", *overshoot)
            .with("undershoot", *undershoot)
            .with("softEdge", *soft_edge)
            .with("casSharpness", *cas_sharpness)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;

        let parsed = Self {
            enabled: r.enabled(),
            method: r.method(d.method)?,
            strength: r.int("strength", d.strength)?,
            overshoot: r.int("overshoot", d.overshoot)?,
            undershoot: r.int("undershoot", d.undershoot)?,
            soft_edge: r.int("softEdge", d.soft_edge)?,
            cas_sharpness: r.float("casSharpness", d.cas_sharpness)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
