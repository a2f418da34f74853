// Block artifact removal pass
use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    pub enum DeblockMethod {
        #[default]
        DeblockQed => "Deblock_QED",
        Deblock => "Deblock",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeblockParameters {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: DeblockMethod,
    #[serde(default = "default_quant1")]
    pub quant1: i32,
    #[serde(default = "default_quant2")]
    pub quant2: i32,
    #[serde(default = "default_a_offset")]
    pub a_offset1: i32,
    #[serde(default = "default_a_offset")]
    pub a_offset2: i32,
    #[serde(default = "default_block_size")]
    pub block_size: i32,
    #[serde(default = "default_overlap")]
    pub overlap: i32,
}

fn default_quant1() -> i32 { 24 }
fn default_quant2() -> i32 { 26 }
fn default_a_offset() -> i32 { 1 }
fn default_block_size() -> i32 { 8 }
fn default_overlap() -> i32 { 4 }

impl Default for DeblockParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            method: DeblockMethod::default(),
            quant1: default_quant1(),
            quant2: default_quant2(),
            a_offset1: default_a_offset(),
            a_offset2: default_a_offset(),
            block_size: default_block_size(),
            overlap: default_overlap(),
        }
    }
}

impl DynamicRecord for DeblockParameters {
    const PASS: PassKind = PassKind::Deblock;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled,
            method,
            quant1,
            quant2,
            a_offset1,
            a_offset2,
            block_size,
            overlap,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, Some(method.as_str()))
            .with("quant1", *quant1)
            .with("quant2", *quant2)
            .with("aOffset1", *a_offset1)
            .with("aOffset2", *a_offset2)
            .with("blockSize", *block_size)
            .with("overlap", *overlap)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;

        let parsed = Self {
            enabled: r.enabled(),
            method: r.method(d.method)?,
            quant1: r.int("quant1", d.quant1)?,
            quant2: r.int("quant2", d.quant2)?,
            a_offset1: r.int("aOffset1", d.a_offset1)?,
            a_offset2: r.int("aOffset2", d.a_offset2)?,
            block_size: r.int("blockSize", d.block_size)?,
            overlap: r.int("overlap", d.overlap)?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
