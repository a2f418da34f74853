// Temporal noise reduction pass
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum NoiseReductionMethod {
        #[default]
        SmDegrain => "smDegrain",
        McTemporalDenoise => "mcTemporalDenoise",
        QtgmcBuiltin => "qtgmcBuiltin",
    }
}

param_choice! {
    pub enum NoiseReductionPreset {
        #[default]
        Off => "off",
        Light => "light",
        Moderate => "moderate",
        Heavy => "heavy",
        Custom => "custom",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseReductionParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub preset: NoiseReductionPreset,
    #[serde(default)]
    pub method: NoiseReductionMethod,
    #[serde(default = "default_sm_degrain_tr", rename = "smDegrainTr")]
    pub sm_degrain_tr: i32,
    #[serde(default = "default_sm_degrain_th_sad", rename = "smDegrainThSAD")]
    pub sm_degrain_th_sad: i32,
    #[serde(default = "default_sm_degrain_th_sadc", rename = "smDegrainThSADC")]
    pub sm_degrain_th_sadc: i32,
    #[serde(default = "default_true", rename = "smDegrainRefine")]
    pub sm_degrain_refine: bool,
    #[serde(default = "default_sm_degrain_prefilter", rename = "smDegrainPrefilter")]
    pub sm_degrain_prefilter: i32,
    #[serde(default = "default_mc_temporal_sigma")]
    pub mc_temporal_sigma: f64,
    #[serde(default = "default_mc_temporal_radius")]
    pub mc_temporal_radius: i32,
    #[serde(default = "default_mc_temporal_profile")]
    pub mc_temporal_profile: String,
    #[serde(default)]
    pub qtgmc_ez_denoise: f64,
    #[serde(default)]
    pub qtgmc_ez_keep_grain: f64,
}

fn default_true() -> bool { true }
fn default_sm_degrain_tr() -> i32 { 2 }
fn default_sm_degrain_th_sad() -> i32 { 300 }
fn default_sm_degrain_th_sadc() -> i32 { 150 }
fn default_sm_degrain_prefilter() -> i32 { 2 }
fn default_mc_temporal_sigma() -> f64 { 4.0 }
fn default_mc_temporal_radius() -> i32 { 2 }
fn default_mc_temporal_profile() -> String { "fast".to_string() }

impl Default for NoiseReductionParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: NoiseReductionPreset::default(),
            method: NoiseReductionMethod::default(),
            sm_degrain_tr: default_sm_degrain_tr(),
            sm_degrain_th_sad: default_sm_degrain_th_sad(),
            sm_degrain_th_sadc: default_sm_degrain_th_sadc(),
            sm_degrain_refine: true,
            sm_degrain_prefilter: default_sm_degrain_prefilter(),
            mc_temporal_sigma: default_mc_temporal_sigma(),
            mc_temporal_radius: default_mc_temporal_radius(),
            mc_temporal_profile: default_mc_temporal_profile(),
            qtgmc_ez_denoise: 0.0,
            qtgmc_ez_keep_grain: 0.0,
        }
    }
}

impl DynamicRecord for NoiseReductionParameters {
    const PASS: PassKind = PassKind::NoiseReduction;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            preset,
            method,
            sm_degrain_tr,
            sm_degrain_th_sad,
            sm_degrain_th_sadc,
            sm_degrain_refine,
            sm_degrain_prefilter,
            mc_temporal_sigma,
            mc_temporal_radius,
            mc_temporal_profile,
            qtgmc_ez_denoise,
            qtgmc_ez_keep_grain,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, Some(method.as_str()))
            .with("preset", preset.as_str())
            .with("smDegrainTr", *sm_degrain_tr)
            .with("smDegrainThSAD", *sm_degrain_th_sad)
            .with("smDegrainThSADC", *sm_degrain_th_sadc)
            .with("smDegrainRefine", *sm_degrain_refine)
            .with("smDegrainPrefilter", *sm_degrain_prefilter)
            .with("mcTemporalSigma", *mc_temporal_sigma)
            .with("mcTemporalRadius", *mc_temporal_radius)
            .with("mcTemporalProfile", mc_temporal_profile)
            .with("qtgmcEzDenoise", *qtgmc_ez_denoise)
            .with("qtgmcEzKeepGrain", *qtgmc_ez_keep_grain)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;

        let parsed = Self {
            enabled: r.enabled(),
            method: r.method(d.method)?,
            preset: r.choice("preset", d.preset)?,
            sm_degrain_tr: r.int("smDegrainTr", d.sm_degrain_tr)?,
            sm_degrain_th_sad: r.int("smDegrainThSAD", d.sm_degrain_th_sad)?,
            sm_degrain_th_sadc: r.int("smDegrainThSADC", d.sm_degrain_th_sadc)?,
            sm_degrain_refine: r.bool("smDegrainRefine", d.sm_degrain_refine)?,
            sm_degrain_prefilter: r.int("smDegrainPrefilter", d.sm_degrain_prefilter)?,
            mc_temporal_sigma: r.float("mcTemporalSigma", d.mc_temporal_sigma)?,
            mc_temporal_radius: r.int("mcTemporalRadius", d.mc_temporal_radius)?,
            mc_temporal_profile: r.string("mcTemporalProfile", &d.mc_temporal_profile)?,
            qtgmc_ez_denoise: r.float("qtgmcEzDenoise", d.qtgmc_ez_denoise)?,
            qtgmc_ez_keep_grain: r.float("qtgmcEzKeepGrain", d.qtgmc_ez_keep_grain)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
