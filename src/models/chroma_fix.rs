// Chroma repair pass: bleeding, dot crawl, vertical chroma blending
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum ChromaFixPreset {
        #[default]
        Off => "off",
        VhsCleanup => "vhsCleanup",
        BroadcastFix => "broadcastFix",
        AnalogRepair => "analogRepair",
        Custom => "custom",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromaFixParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub preset: ChromaFixPreset,
    #[serde(default)]
    pub apply_chroma_bleeding_fix: bool,
    #[serde(default = "default_bleed_offset")]
    pub chroma_bleed_cx: i32,
    #[serde(default = "default_bleed_offset")]
    pub chroma_bleed_cy: i32,
    #[serde(default = "default_bleed_blur")]
    pub chroma_bleed_c_blur: f64,
    #[serde(default = "default_one")]
    pub chroma_bleed_strength: f64,
    #[serde(default)]
    pub apply_de_crawl: bool,
    #[serde(default = "default_de_crawl_thresh")]
    pub de_crawl_y_thresh: i32,
    #[serde(default = "default_de_crawl_thresh")]
    pub de_crawl_c_thresh: i32,
    #[serde(default = "default_de_crawl_max_diff")]
    pub de_crawl_max_diff: i32,
    #[serde(default)]
    pub apply_vinverse: bool,
    #[serde(default = "default_vinverse_sstr")]
    pub vinverse_sstr: f64,
    #[serde(default = "default_255")]
    pub vinverse_amnt: i32,
    #[serde(default = "default_vinverse_scl")]
    pub vinverse_scl: i32,
}

fn default_bleed_offset() -> i32 { 4 }
fn default_bleed_blur() -> f64 { 0.7 }
fn default_one() -> f64 { 1.0 }
fn default_de_crawl_thresh() -> i32 { 10 }
fn default_de_crawl_max_diff() -> i32 { 50 }
fn default_vinverse_sstr() -> f64 { 2.7 }
fn default_255() -> i32 { 255 }
fn default_vinverse_scl() -> i32 { 12 }

impl Default for ChromaFixParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: ChromaFixPreset::default(),
            apply_chroma_bleeding_fix: false,
            chroma_bleed_cx: default_bleed_offset(),
            chroma_bleed_cy: default_bleed_offset(),
            chroma_bleed_c_blur: default_bleed_blur(),
            chroma_bleed_strength: default_one(),
            apply_de_crawl: false,
            de_crawl_y_thresh: default_de_crawl_thresh(),
            de_crawl_c_thresh: default_de_crawl_thresh(),
            de_crawl_max_diff: default_de_crawl_max_diff(),
            apply_vinverse: false,
            vinverse_sstr: default_vinverse_sstr(),
            vinverse_amnt: default_255(),
            vinverse_scl: default_vinverse_scl(),
        }
    }
}

impl DynamicRecord for ChromaFixParameters {
    const PASS: PassKind = PassKind::ChromaFixes;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            preset,
            apply_chroma_bleeding_fix,
            chroma_bleed_cx,
            chroma_bleed_cy,
            chroma_bleed_c_blur,
            chroma_bleed_strength,
            apply_de_crawl,
            de_crawl_y_thresh,
            de_crawl_c_thresh,
            de_crawl_max_diff,
            apply_vinverse,
            vinverse_sstr,
            vinverse_amnt,
            vinverse_scl,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, None)
            .with("preset", preset.as_str())
            .with("applyChromaBleedingFix", *apply_chroma_bleeding_fix)
            .with("chromaBleedCx", *chroma_bleed_cx)
            .with("chromaBleedCy", *chroma_bleed_cy)
            .with("chromaBleedCBlur", *chroma_bleed_c_blur)
            .with("chromaBleedStrength", *chroma_bleed_strength)
            .with("applyDeCrawl", *apply_de_crawl)
            .with("deCrawlYThresh", *de_crawl_y_thresh)
            .with("deCrawlCThresh", *de_crawl_c_thresh)
            .with("deCrawlMaxDiff", *de_crawl_max_diff)
            .with("applyVinverse", *apply_vinverse)
            .with("vinverseSstr", *vinverse_sstr)
            .with("vinverseAmnt", *vinverse_amnt)
            .with("vinverseScl", *vinverse_scl)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;
        r.no_method()?;

        let parsed = Self {
            enabled: r.enabled(),
            preset: r.choice("preset", d.preset)?,
            apply_chroma_bleeding_fix: r.bool("applyChromaBleedingFix", d.apply_chroma_bleeding_fix)?,
            chroma_bleed_cx: r.int("chromaBleedCx", d.chroma_bleed_cx)?,
            chroma_bleed_cy: r.int("chromaBleedCy", d.chroma_bleed_cy)?,
            chroma_bleed_c_blur: r.float("chromaBleedCBlur", d.chroma_bleed_c_blur)?,
            chroma_bleed_strength: r.float("chromaBleedStrength", d.chroma_bleed_strength)?,
            apply_de_crawl: r.bool("applyDeCrawl", d.apply_de_crawl)?,
            de_crawl_y_thresh: r.int("deCrawlYThresh", d.de_crawl_y_thresh)?,
            de_crawl_c_thresh: r.int("deCrawlCThresh", d.de_crawl_c_thresh)?,
            de_crawl_max_diff: r.int("deCrawlMaxDiff", d.de_crawl_max_diff)?,
            apply_vinverse: r.bool("applyVinverse", d.apply_vinverse)?,
            vinverse_sstr: r.float("vinverseSstr", d.vinverse_sstr)?,
            vinverse_amnt: r.int("vinverseAmnt", d.vinverse_amnt)?,
            vinverse_scl: r.int("vinverseScl", d.vinverse_scl)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
