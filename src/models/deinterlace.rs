//! QTGMC deinterlace pass.
//!
//! Optional fields left as `None` are omitted from the job file so the
//! worker falls back to the values implied by `preset`.

use crate::error::Result;
use serde::{Deserialize, Serialize};

use super::dynamic::{param_choice, DynamicParameters, DynamicRecord, ParamChoice, ParamReader};
use super::pipeline::PassKind;

param_choice! {
    /// QTGMC speed/quality presets, slowest first.
    pub enum QtgmcPreset {
        Placebo => "Placebo",
        VerySlow => "Very Slow",
        #[default]
        Slower => "Slower",
        Slow => "Slow",
        Medium => "Medium",
        Fast => "Fast",
        Faster => "Faster",
        VeryFast => "Very Fast",
        SuperFast => "Super Fast",
        UltraFast => "Ultra Fast",
        Draft => "Draft",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtgmcParameters {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub preset: QtgmcPreset,
    #[serde(default)]
    pub input_type: i32,
    /// Derived from detected or overridden field order at submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tff: Option<bool>,
    #[serde(default = "default_one")]
    pub fps_divisor: i32,

    // Temporal radii
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tr0: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tr1: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tr2: Option<i32>,

    // Repair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep0: Option<i32>,
    #[serde(default)]
    pub rep1: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep2: Option<i32>,
    #[serde(default = "default_true")]
    pub rep_chroma: bool,

    // Interpolation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edi_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn_size: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nn_neurons: Option<i32>,
    #[serde(default = "default_one")]
    pub edi_qual: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edi_max_d: Option<i32>,
    #[serde(default)]
    pub chroma_edi: String,

    // Motion analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_size: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_param: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pel_search: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma_motion: Option<bool>,
    #[serde(default)]
    pub true_motion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsad: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_new: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_level: Option<i32>,
    #[serde(default = "default_true")]
    pub global_motion: bool,
    #[serde(default)]
    pub dct: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_pel: Option<i32>,
    #[serde(default = "default_two")]
    pub sub_pel_interp: i32,
    #[serde(default = "default_th_sad1")]
    pub th_sad1: i32,
    #[serde(default = "default_th_sad2")]
    pub th_sad2: i32,
    #[serde(default = "default_th_scd1")]
    pub th_scd1: i32,
    #[serde(default = "default_th_scd2")]
    pub th_scd2: i32,

    // Sharpening
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s_mode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl_mode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl_rad: Option<i32>,
    #[serde(default)]
    pub s_ovs: i32,
    #[serde(default)]
    pub sv_thin: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srch_clip_pp: Option<i32>,

    // Noise handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_process: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ez_denoise: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ez_keep_grain: Option<f64>,
    #[serde(default = "default_noise_preset")]
    pub noise_preset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denoiser: Option<String>,
    #[serde(default = "default_one")]
    pub fft_threads: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denoise_mc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_tr: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(default)]
    pub chroma_noise: bool,
    #[serde(default)]
    pub show_noise: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grain_restore: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_restore: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_deint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilize_noise: Option<bool>,

    // Source matching
    #[serde(default)]
    pub source_match: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_edi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_preset2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_edi2: Option<String>,
    #[serde(default = "default_one")]
    pub match_tr2: i32,
    #[serde(default = "default_match_enhance")]
    pub match_enhance: f64,
    #[serde(default)]
    pub lossless: i32,

    // Misc
    #[serde(default)]
    pub border: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precise: Option<bool>,
    #[serde(default)]
    pub force_tr: i32,
    #[serde(default = "default_str")]
    pub str: f64,
    #[serde(default = "default_amp")]
    pub amp: f64,
    #[serde(default)]
    pub fast_ma: bool,
    #[serde(default)]
    pub e_search_p: bool,
    #[serde(default)]
    pub refine_motion: bool,
    #[serde(default)]
    pub opencl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<i32>,
}

fn default_true() -> bool { true }
fn default_one() -> i32 { 1 }
fn default_two() -> i32 { 2 }
fn default_th_sad1() -> i32 { 640 }
fn default_th_sad2() -> i32 { 256 }
fn default_th_scd1() -> i32 { 180 }
fn default_th_scd2() -> i32 { 98 }
fn default_noise_preset() -> String { "Fast".to_string() }
fn default_match_enhance() -> f64 { 0.5 }
fn default_str() -> f64 { 2.0 }
fn default_amp() -> f64 { 0.0625 }

impl Default for QtgmcParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            preset: QtgmcPreset::default(),
            input_type: 0,
            tff: None,
            fps_divisor: 1,
            tr0: None,
            tr1: None,
            tr2: None,
            rep0: None,
            rep1: 0,
            rep2: None,
            rep_chroma: true,
            edi_mode: None,
            nn_size: None,
            nn_neurons: None,
            edi_qual: 1,
            edi_max_d: None,
            chroma_edi: String::new(),
            block_size: None,
            overlap: None,
            search: None,
            search_param: None,
            pel_search: None,
            chroma_motion: None,
            true_motion: false,
            lambda: None,
            lsad: None,
            p_new: None,
            p_level: None,
            global_motion: true,
            dct: 0,
            sub_pel: None,
            sub_pel_interp: 2,
            th_sad1: default_th_sad1(),
            th_sad2: default_th_sad2(),
            th_scd1: default_th_scd1(),
            th_scd2: default_th_scd2(),
            sharpness: None,
            s_mode: None,
            sl_mode: None,
            sl_rad: None,
            s_ovs: 0,
            sv_thin: 0.0,
            sbb: None,
            srch_clip_pp: None,
            noise_process: None,
            ez_denoise: None,
            ez_keep_grain: None,
            noise_preset: default_noise_preset(),
            denoiser: None,
            fft_threads: 1,
            denoise_mc: None,
            noise_tr: None,
            sigma: None,
            chroma_noise: false,
            show_noise: 0.0,
            grain_restore: None,
            noise_restore: None,
            noise_deint: None,
            stabilize_noise: None,
            source_match: 0,
            match_preset: None,
            match_edi: None,
            match_preset2: None,
            match_edi2: None,
            match_tr2: 1,
            match_enhance: default_match_enhance(),
            lossless: 0,
            border: false,
            precise: None,
            force_tr: 0,
            str: default_str(),
            amp: default_amp(),
            fast_ma: false,
            e_search_p: false,
            refine_motion: false,
            opencl: false,
            device: None,
        }
    }
}

impl DynamicRecord for QtgmcParameters {
    const PASS: PassKind = PassKind::Deinterlace;

    fn to_dynamic(&self) -> DynamicParameters {
        let Self {
            enabled, preset, input_type, tff, fps_divisor,
            tr0, tr1, tr2, rep0, rep1, rep2, rep_chroma,
            edi_mode, nn_size, nn_neurons, edi_qual, edi_max_d, chroma_edi,
            block_size, overlap, search, search_param, pel_search, chroma_motion,
            true_motion, lambda, lsad, p_new, p_level, global_motion, dct,
            sub_pel, sub_pel_interp, th_sad1, th_sad2, th_scd1, th_scd2,
            sharpness, s_mode, sl_mode, sl_rad, s_ovs, sv_thin, sbb, srch_clip_pp,
            noise_process, ez_denoise, ez_keep_grain, noise_preset, denoiser,
            fft_threads, denoise_mc, noise_tr, sigma, chroma_noise, show_noise,
            grain_restore, noise_restore, noise_deint, stabilize_noise,
            source_match, match_preset, match_edi, match_preset2, match_edi2,
            match_tr2, match_enhance, lossless,
            border, precise, force_tr, str, amp, fast_ma, e_search_p,
            refine_motion, opencl, device,
        } = self;

        DynamicParameters::new(Self::PASS, *enabled, None)
            .with("preset", preset.as_str())
            .with("inputType", *input_type)
            .with("tff", *tff)
            .with("fpsDivisor", *fps_divisor)
            .with("tr0", *tr0)
            .with("tr1", *tr1)
            .with("tr2", *tr2)
            .with("rep0", *rep0)
            .with("rep1", *rep1)
            .with("rep2", *rep2)
            .with("repChroma", *rep_chroma)
            .with("ediMode", edi_mode.clone())
            .with("nnSize", *nn_size)
            .with("nnNeurons", *nn_neurons)
            .with("ediQual", *edi_qual)
            .with("ediMaxD", *edi_max_d)
            .with("chromaEdi", chroma_edi)
            .with("blockSize", *block_size)
            .with("overlap", *overlap)
            .with("search", *search)
            .with("searchParam", *search_param)
            .with("pelSearch", *pel_search)
            .with("chromaMotion", *chroma_motion)
            .with("trueMotion", *true_motion)
            .with("lambda", *lambda)
            .with("lsad", *lsad)
            .with("pNew", *p_new)
            .with("pLevel", *p_level)
            .with("globalMotion", *global_motion)
            .with("dct", *dct)
            .with("subPel", *sub_pel)
            .with("subPelInterp", *sub_pel_interp)
            .with("thSad1", *th_sad1)
            .with("thSad2", *th_sad2)
            .with("thScd1", *th_scd1)
            .with("thScd2", *th_scd2)
            .with("sharpness", *sharpness)
            .with("sMode", *s_mode)
            .with("slMode", *sl_mode)
            .with("slRad", *sl_rad)
            .with("sOvs", *s_ovs)
            .with("svThin", *sv_thin)
            .with("sbb", *sbb)
            .with("srchClipPp", *srch_clip_pp)
            .with("noiseProcess", *noise_process)
            .with("ezDenoise", *ez_denoise)
            .with("ezKeepGrain", *ez_keep_grain)
            .with("noisePreset", noise_preset)
            .with("denoiser", denoiser.clone())
            .with("fftThreads", *fft_threads)
            .with("denoiseMc", *denoise_mc)
            .with("noiseTr", *noise_tr)
            .with("sigma", *sigma)
            .with("chromaNoise", *chroma_noise)
            .with("showNoise", *show_noise)
            .with("grainRestore", *grain_restore)
            .with("noiseRestore", *noise_restore)
            .with("noiseDeint", noise_deint.clone())
            .with("stabilizeNoise", *stabilize_noise)
            .with("sourceMatch", *source_match)
            .with("matchPreset", match_preset.clone())
            .with("matchEdi", match_edi.clone())
            .with("matchPreset2", match_preset2.clone())
            .with("matchEdi2", match_edi2.clone())
            .with("matchTr2", *match_tr2)
            .with("matchEnhance", *match_enhance)
            .with("lossless", *lossless)
            .with("border", *border)
            .with("precise", *precise)
            .with("forceTr", *force_tr)
            .with("str", *str)
            .with("amp", *amp)
            .with("fastMa", *fast_ma)
            .with("eSearchP", *e_search_p)
            .with("refineMotion", *refine_motion)
            .with("opencl", *opencl)
            .with("device", *device)
    }

    fn from_dynamic(params: &DynamicParameters) -> Result<Self> {
        let d = Self::default();
        let mut r = ParamReader::new(Self::PASS, params)?;
        r.no_method()?;

        let parsed = Self {
            enabled: r.enabled(),
            preset: r.choice("preset", d.preset)?,
            input_type: r.int("inputType", d.input_type)?,
            tff: r.opt_bool("tff")?,
            fps_divisor: r.int("fpsDivisor", d.fps_divisor)?,
            tr0: r.opt_int("tr0")?,
            tr1: r.opt_int("tr1")?,
            tr2: r.opt_int("tr2")?,
            rep0: r.opt_int("rep0")?,
            rep1: r.int("rep1", d.rep1)?,
            rep2: r.opt_int("rep2")?,
            rep_chroma: r.bool("repChroma", d.rep_chroma)?,
            edi_mode: r.opt_string("ediMode")?,
            nn_size: r.opt_int("nnSize")?,
            nn_neurons: r.opt_int("nnNeurons")?,
            edi_qual: r.int("ediQual", d.edi_qual)?,
            edi_max_d: r.opt_int("ediMaxD")?,
            chroma_edi: r.string("chromaEdi", &d.chroma_edi)?,
            block_size: r.opt_int("blockSize")?,
            overlap: r.opt_int("overlap")?,
            search: r.opt_int("search")?,
            search_param: r.opt_int("searchParam")?,
            pel_search: r.opt_int("pelSearch")?,
            chroma_motion: r.opt_bool("chromaMotion")?,
            true_motion: r.bool("trueMotion", d.true_motion)?,
            lambda: r.opt_int("lambda")?,
            lsad: r.opt_int("lsad")?,
            p_new: r.opt_int("pNew")?,
            p_level: r.opt_int("pLevel")?,
            global_motion: r.bool("globalMotion", d.global_motion)?,
            dct: r.int("dct", d.dct)?,
            sub_pel: r.opt_int("subPel")?,
            sub_pel_interp: r.int("subPelInterp", d.sub_pel_interp)?,
            th_sad1: r.int("thSad1", d.th_sad1)?,
            th_sad2: r.int("thSad2", d.th_sad2)?,
            th_scd1: r.int("thScd1", d.th_scd1)?,
            th_scd2: r.int("thScd2", d.th_scd2)?,
            sharpness: r.opt_float("sharpness")?,
            s_mode: r.opt_int("sMode")?,
            sl_mode: r.opt_int("slMode")?,
            sl_rad: r.opt_int("slRad")?,
            s_ovs: r.int("sOvs", d.s_ovs)?,
            sv_thin: r.float("svThin", d.sv_thin)?,
            sbb: r.opt_int("sbb")?,
            srch_clip_pp: r.opt_int("srchClipPp")?,
            noise_process: r.opt_int("noiseProcess")?,
            ez_denoise: r.opt_float("ezDenoise")?,
            ez_keep_grain: r.opt_float("ezKeepGrain")?,
            noise_preset: r.string("noisePreset", &d.noise_preset)?,
            denoiser: r.opt_string("denoiser")?,
            fft_threads: r.int("fftThreads", d.fft_threads)?,
            denoise_mc: r.opt_bool("denoiseMc")?,
            noise_tr: r.opt_int("noiseTr")?,
            sigma: r.opt_float("sigma")?,
            chroma_noise: r.bool("chromaNoise", d.chroma_noise)?,
            show_noise: r.float("showNoise", d.show_noise)?,
            grain_restore: r.opt_float("grainRestore")?,
            noise_restore: r.opt_float("noiseRestore")?,
            noise_deint: r.opt_string("noiseDeint")?,
            stabilize_noise: r.opt_bool("stabilizeNoise")?,
            source_match: r.int("sourceMatch", d.source_match)?,
            match_preset: r.opt_string("matchPreset")?,
            match_edi: r.opt_string("matchEdi")?,
            match_preset2: r.opt_string("matchPreset2")?,
            match_edi2: r.opt_string("matchEdi2")?,
            match_tr2: r.int("matchTr2", d.match_tr2)?,
            match_enhance: r.float("matchEnhance", d.match_enhance)?,
            lossless: r.int("lossless", d.lossless)?,
            border: r.bool("border", d.border)?,
            precise: r.opt_bool("precise")?,
            force_tr: r.int("forceTr", d.force_tr)?,
            str: r.float("str", d.str)?,
            amp: r.float("amp", d.amp)?,
            fast_ma: r.bool("fastMa", d.fast_ma)?,
            e_search_p: r.bool("eSearchP", d.e_search_p)?,
            refine_motion: r.bool("refineMotion", d.refine_motion)?,
            opencl: r.bool("opencl", d.opencl)?,
            device: r.opt_int("device")?,
        };

        r.finish()?;
        Ok(parsed)
    }
}
