// Banding removal pass (f3kdb)
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{DynamicParameters, DynamicRecord, ParamReader};
use super::pipeline::PassKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebandParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_range")]
    pub range: i32,
    #[serde(default = "default_threshold")]
    pub y: i32,
    #[serde(default = "default_threshold")]
    pub cb: i32,
    #[serde(default = "default_threshold")]
    pub cr: i32,
    #[serde(default = "default_grain")]
    pub grain_y: i32,
    #[serde(default = "default_grain")]
    pub grain_c: i32,
    #[serde(default = "default_dynamic_grain")]
    pub dynamic_grain: bool,
    #[serde(default = "default_output_depth")]
    pub output_depth: i32,
}

fn default_range() -> i32 { 15 }
fn default_threshold() -> i32 { 32 }
fn default_grain() -> i32 { 24 }
fn default_dynamic_grain() -> bool { true }
fn default_output_depth() -> i32 { 16 }

impl Default for DebandParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            range: default_range(),
            y: default_threshold(),
            cb: default_threshold(),
            cr: default_threshold(),
            grain_y: default_grain(),
            grain_c: default_grain(),
            dynamic_grain: default_dynamic_grain(),
            output_depth: default_output_depth(),
        }
    }
}

impl DynamicRecord for DebandParameters {
    const PASS: PassKind = PassKind::Deband;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            range,
            y,
            cb,
            cr,
            grain_y,
            grain_c,
            dynamic_grain,
            output_depth,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, None)
            .with("range", *range)
            .with("y", *y)
            .with("cb", *cb)
            .with("cr", *cr)
            .with("grainY", *grain_y)
            .with("grainC", *grain_c)
            .with("dynamicGrain", *dynamic_grain)
            .with("outputDepth", *output_depth)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;
        r.no_method()?;

        let parsed = Self {
            enabled: r.enabled(),
            range: r.int("range", d.range)?,
            y: r.int("y", d.y)?,
            cb: r.int("cb", d.cb)?,
            cr: r.int("cr", d.cr)?,
            grain_y: r.int("grainY", d.grain_y)?,
            grain_c: r.int("grainC", d.grain_c)?,
            dynamic_grain: r.bool("dynamicGrain", d.dynamic_grain)?,
            output_depth: r.int("outputDepth", d.output_depth)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
