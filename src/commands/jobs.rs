// Processing job commands
use crate::error::Result;
use crate::models::{EncodingSettings, FieldOrder, JobOverrides, RestorationPipeline, VideoJob};
use crate::process_manager::{CompletionEvent, SupervisorEvent, SupervisorState};
use crate::AppState;
use log::info;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobParams {
    pub input_path: String,
    pub output_path: String,
    #[serde(default)]
    pub pipeline: RestorationPipeline,
    /// Falls back to the default encoding from settings.
    pub encoding: Option<EncodingSettings>,
    pub detected_field_order: Option<FieldOrder>,
    pub field_order_override: Option<FieldOrder>,
    pub start_frame: Option<u64>,
    pub end_frame: Option<u64>,
    pub total_frames: Option<u64>,
    pub input_frame_rate: Option<f64>,
}

pub fn build_job(state: &AppState, params: SubmitJobParams) -> Result<VideoJob> {
    let encoding = params
        .encoding
        .unwrap_or_else(|| state.settings().default_encoding);

    params.pipeline.to_job(JobOverrides {
        input_path: params.input_path,
        output_path: params.output_path,
        encoding,
        detected_field_order: params.detected_field_order,
        field_order_override: params.field_order_override,
        start_frame: params.start_frame,
        end_frame: params.end_frame,
        total_frames: params.total_frames,
        input_frame_rate: params.input_frame_rate,
    })
}

pub fn load_job_file(path: &Path) -> Result<VideoJob> {
    VideoJob::load(path)
}

/// Hands the job to the worker. Subscribe first to see every event of the run.
pub fn start_job(state: &AppState, job: &VideoJob) -> Result<()> {
    state.services()?.supervisor().start(job)?;
    info!("[Jobs] Started job {} ({})", job.id, job.input_path);
    Ok(())
}

pub fn submit_job(state: &AppState, params: SubmitJobParams) -> Result<VideoJob> {
    let job = build_job(state, params)?;
    start_job(state, &job)?;
    Ok(job)
}

/// Returns false when no job was running.
pub async fn cancel_job(state: &AppState) -> Result<bool> {
    Ok(state.services()?.supervisor().cancel().await)
}

pub fn get_job_state(state: &AppState) -> SupervisorState {
    state
        .services()
        .map(|s| s.supervisor().state())
        .unwrap_or(SupervisorState::Idle)
}

pub fn subscribe_job_events(state: &AppState) -> Result<broadcast::Receiver<SupervisorEvent>> {
    Ok(state.services()?.supervisor().subscribe())
}

pub async fn wait_for_job(state: &AppState) -> Result<Option<CompletionEvent>> {
    Ok(state.services()?.supervisor().wait().await)
}
