// Single-frame previews
// Raw frames come from the renderer (vspipe piped into ffmpeg), processed frames from the worker

use super::cache::{frame_index, FrameCache};
use super::slot::RequestSlot;
use crate::error::{Error, Result};
use crate::file_manager::write_json_file;
use crate::installer::InstalledBundle;
use crate::models::{FieldOrder, JobOverrides, RestorationPipeline, Settings};
use crate::process_manager::{signal, ToolEnvironment, WorkerLocator};
use crate::utils::create_instance_temp_dir;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
struct PreviewSource {
    path: PathBuf,
    fps: f64,
    total_frames: Option<u64>,
    script: PathBuf,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub frame_index: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    pub frame_index: u64,
    pub png: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// Position in the requested timestamp list.
    pub index: usize,
    pub timestamp: f64,
    pub png: Vec<u8>,
}

/// Snapshot of everything a processed preview depends on, taken when the request is made.
#[derive(Debug, Clone, Default)]
pub struct PreviewRequest {
    pub timestamp: f64,
    pub pipeline: RestorationPipeline,
    pub detected_field_order: Option<FieldOrder>,
    pub field_order_override: Option<FieldOrder>,
}

struct ProcessOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr_tail: Vec<String>,
}

struct Inner {
    environment: ToolEnvironment,
    locator: WorkerLocator,
    grace: Duration,
    work_dir: PathBuf,
    root: CancellationToken,
    source: Mutex<Option<PreviewSource>>,
    cache: Mutex<FrameCache>,
    raw_slot: RequestSlot,
    processed_slot: RequestSlot,
    thumbnail_permits: Semaphore,
    thumbnail_limit: u32,
}

pub struct PreviewGenerator {
    inner: Arc<Inner>,
}

impl PreviewGenerator {
    pub fn new(bundle: &InstalledBundle, locator: WorkerLocator, settings: &Settings) -> Result<Self> {
        let root = CancellationToken::new();
        let work_dir = create_instance_temp_dir("preview")?;
        std::fs::create_dir_all(work_dir.join("frames"))?;
        let thumbnail_limit = u32::try_from(settings.thumbnail_concurrency.max(1)).unwrap_or(4);

        Ok(Self {
            inner: Arc::new(Inner {
                environment: ToolEnvironment::from_bundle(bundle),
                locator,
                grace: Duration::from_millis(settings.cancel_grace_ms),
                work_dir,
                raw_slot: RequestSlot::new(root.clone()),
                processed_slot: RequestSlot::new(root.clone()),
                root,
                source: Mutex::new(None),
                cache: Mutex::new(FrameCache::new(settings.preview_cache_capacity)),
                thumbnail_permits: Semaphore::new(thumbnail_limit as usize),
                thumbnail_limit,
            }),
        })
    }

    pub(crate) fn work_dir(&self) -> &Path {
        &self.inner.work_dir
    }

    /// Switches to a new source video. Cancels raw extraction and empties the cache.
    pub async fn set_source(&self, path: impl Into<PathBuf>, fps: f64, total_frames: Option<u64>) -> Result<()> {
        if self.inner.root.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::InvalidArgument(format!("Invalid frame rate: {}", fps)));
        }

        self.inner.raw_slot.cancel_current().await;

        let path = path.into();
        let previous = self.inner.source.lock().clone();
        let generation = previous.as_ref().map_or(0, |s| s.generation + 1);
        let script = self.inner.work_dir.join(format!("source-{}.vpy", generation));
        tokio::fs::write(&script, source_script(&path)?).await?;

        self.inner.cache.lock().clear();
        *self.inner.source.lock() = Some(PreviewSource {
            path: path.clone(),
            fps,
            total_frames,
            script,
            generation,
        });
        if let Some(previous) = previous {
            let _ = tokio::fs::remove_file(previous.script).await;
        }

        info!("[Preview] Source set to {:?} ({} fps)", path, fps);
        Ok(())
    }

    pub fn cached_frames(&self) -> usize {
        self.inner.cache.lock().len()
    }

    /// Unprocessed frame nearest `timestamp`. `Ok(None)` when superseded by a newer request.
    pub async fn raw_frame(&self, timestamp: f64) -> Result<Option<RawFrame>> {
        let guard = self.inner.raw_slot.supersede().await;
        if guard.is_cancelled() {
            return Ok(None);
        }

        let source = self.inner.current_source()?;
        let index = frame_index(timestamp, source.fps, source.total_frames);
        let path = self.inner.cached_or_extract(&source, index, guard.token()).await?;

        if guard.is_cancelled() {
            return Ok(None);
        }
        Ok(path.map(|path| RawFrame {
            frame_index: index,
            path,
        }))
    }

    /// Runs the worker in preview mode for one frame. `Ok(None)` when superseded or disposed.
    pub async fn processed_frame(&self, request: PreviewRequest) -> Result<Option<ProcessedFrame>> {
        let guard = self.inner.processed_slot.supersede().await;
        if guard.is_cancelled() {
            return Ok(None);
        }

        let source = self.inner.current_source()?;
        let index = frame_index(request.timestamp, source.fps, source.total_frames);
        let job = request.pipeline.to_job(JobOverrides {
            input_path: source.path.to_string_lossy().to_string(),
            detected_field_order: request.detected_field_order,
            field_order_override: request.field_order_override,
            total_frames: source.total_frames,
            input_frame_rate: Some(source.fps),
            ..Default::default()
        })?;

        let worker = self.inner.locator.locate()?;
        let job_path = self.inner.work_dir.join(format!("preview-{}.json", job.id));
        write_json_file(&job_path, &job)?;

        let result = self
            .inner
            .run_preview_worker(&worker, &job_path, index, guard.token())
            .await;
        let _ = tokio::fs::remove_file(&job_path).await;

        let Some(png) = result? else {
            return Ok(None);
        };
        if guard.is_cancelled() {
            return Ok(None);
        }

        debug!("[Preview] Frame {} rendered ({} bytes)", index, png.len());
        Ok(Some(ProcessedFrame {
            frame_index: index,
            png,
        }))
    }

    /// Raw frames for a scrubber strip. Failed frames are left out; order follows `timestamps`.
    pub async fn thumbnails(&self, timestamps: &[f64]) -> Result<Vec<Thumbnail>> {
        let source = self.inner.current_source()?;
        let batch = self.inner.root.child_token();
        let mut tasks = JoinSet::new();

        for (index, &timestamp) in timestamps.iter().enumerate() {
            let inner = self.inner.clone();
            let source = source.clone();
            let token = batch.clone();

            tasks.spawn(async move {
                let _permit = inner.thumbnail_permits.acquire().await.ok()?;
                let frame = frame_index(timestamp, source.fps, source.total_frames);

                let path = match inner.cached_or_extract(&source, frame, &token).await {
                    Ok(Some(path)) => path,
                    Ok(None) => return None,
                    Err(e) => {
                        warn!("[Preview] Thumbnail at {:.3}s failed: {}", timestamp, e);
                        return None;
                    }
                };

                match tokio::fs::read(&path).await {
                    Ok(png) => Some(Thumbnail {
                        index,
                        timestamp,
                        png,
                    }),
                    Err(e) => {
                        warn!("[Preview] Could not read thumbnail {:?}: {}", path, e);
                        None
                    }
                }
            });
        }

        // Abandoning the batch stops its extractions
        let _cancel_on_drop = batch.drop_guard();

        let mut thumbnails = Vec::with_capacity(timestamps.len());
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Some(thumbnail)) = joined {
                thumbnails.push(thumbnail);
            }
        }
        thumbnails.sort_by_key(|t| t.index);
        Ok(thumbnails)
    }

    /// Kills every in-flight subprocess and removes the working directory.
    pub async fn dispose(&self) {
        info!("[Preview] Disposing preview generator");
        self.inner.root.cancel();
        self.inner.raw_slot.cancel_current().await;
        self.inner.processed_slot.cancel_current().await;

        // Thumbnail tasks hold a permit until their processes are reaped
        let _ = self
            .inner
            .thumbnail_permits
            .acquire_many(self.inner.thumbnail_limit)
            .await;
        self.inner.thumbnail_permits.close();

        self.inner.cache.lock().clear();
        let _ = tokio::fs::remove_dir_all(&self.inner.work_dir).await;
    }
}

impl Drop for PreviewGenerator {
    fn drop(&mut self) {
        self.inner.root.cancel();
        let _ = std::fs::remove_dir_all(&self.inner.work_dir);
    }
}

impl Inner {
    fn current_source(&self) -> Result<PreviewSource> {
        self.source
            .lock()
            .clone()
            .ok_or_else(|| Error::InvalidArgument("No source video set".to_string()))
    }

    async fn cached_or_extract(
        &self,
        source: &PreviewSource,
        index: u64,
        token: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        if let Some(path) = self.cache.lock().get(index) {
            return Ok(Some(path));
        }

        let extracted = self.extract_frame(source, index, token).await?;
        if let Some(path) = &extracted {
            let current = self.source.lock().as_ref().map(|s| s.generation);
            // Frames from a replaced source are returned but never cached
            if current == Some(source.generation) {
                self.cache.lock().insert(index, path.clone());
            }
        }
        Ok(extracted)
    }

    async fn extract_frame(
        &self,
        source: &PreviewSource,
        index: u64,
        token: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        if token.is_cancelled() {
            return Ok(None);
        }

        let frames = self.work_dir.join("frames");
        let out = frames.join(format!("g{}-f{}.png", source.generation, index));
        // Concurrent extractions of one frame each write their own file
        let partial = frames.join(format!(
            "g{}-f{}-{}.partial.png",
            source.generation,
            index,
            uuid::Uuid::new_v4().simple()
        ));

        let result = self.run_renderer(source, index, &partial, token).await;
        if !matches!(result, Ok(Some(_))) {
            let _ = tokio::fs::remove_file(&partial).await;
            return result;
        }
        if let Err(e) = tokio::fs::rename(&partial, &out).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        Ok(Some(out))
    }

    async fn run_renderer(
        &self,
        source: &PreviewSource,
        index: u64,
        out: &Path,
        token: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        let vspipe_path = require_tool("vspipe", self.environment.vspipe())?;
        let ffmpeg_path = require_tool("ffmpeg", self.environment.ffmpeg())?;
        let frame = index.to_string();

        let mut vspipe_cmd = Command::new(vspipe_path);
        vspipe_cmd
            .args(["-c", "y4m", "--start", frame.as_str(), "--end", frame.as_str()])
            .arg(&source.script)
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.environment.apply(&mut vspipe_cmd);
        signal::configure_command(&mut vspipe_cmd);
        let mut vspipe = vspipe_cmd.spawn()?;

        let y4m: Stdio = vspipe
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "renderer stdout unavailable"))?
            .try_into()?;

        let mut ffmpeg_cmd = Command::new(ffmpeg_path);
        ffmpeg_cmd
            .args([
                "-hide_banner", "-loglevel", "error", "-f", "yuv4mpegpipe", "-i", "-",
                "-frames:v", "1", "-update", "1", "-f", "image2", "-vcodec", "png", "-y",
            ])
            .arg(out)
            .stdin(y4m)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        self.environment.apply(&mut ffmpeg_cmd);
        signal::configure_command(&mut ffmpeg_cmd);
        let mut ffmpeg = ffmpeg_cmd.spawn()?;

        let outcome = tokio::select! {
            outputs = async { tokio::join!(collect_output(&mut vspipe), collect_output(&mut ffmpeg)) } => Some(outputs),
            _ = token.cancelled() => None,
        };

        let Some((vspipe_output, ffmpeg_output)) = outcome else {
            signal::terminate(&mut ffmpeg, self.grace).await;
            signal::terminate(&mut vspipe, self.grace).await;
            return Ok(None);
        };

        ensure_success(&vspipe_output?)?;
        let ffmpeg_output = ffmpeg_output?;
        ensure_success(&ffmpeg_output)?;

        if token.is_cancelled() {
            return Ok(None);
        }
        if !out.is_file() {
            let mut log_tail = ffmpeg_output.stderr_tail;
            log_tail.push(format!("no image written for frame {}", index));
            return Err(Error::WorkerExitFailure { code: 0, log_tail });
        }
        Ok(Some(out.to_path_buf()))
    }

    async fn run_preview_worker(
        &self,
        worker: &Path,
        job_path: &Path,
        index: u64,
        token: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        let mut cmd = Command::new(worker);
        cmd.arg("--config")
            .arg(job_path)
            .arg("--preview")
            .arg("--frame")
            .arg(index.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.environment.apply(&mut cmd);
        signal::configure_command(&mut cmd);

        if token.is_cancelled() {
            return Ok(None);
        }
        let mut child = cmd.spawn()?;
        debug!("[Preview] Worker pid {:?} rendering frame {}", child.id(), index);

        let outcome = tokio::select! {
            output = collect_output(&mut child) => Some(output),
            _ = token.cancelled() => None,
        };

        let Some(output) = outcome else {
            signal::terminate(&mut child, self.grace).await;
            debug!("[Preview] Frame {} superseded", index);
            return Ok(None);
        };

        let output = output?;
        ensure_success(&output)?;
        Ok(Some(output.stdout))
    }
}

fn require_tool<'a>(name: &str, path: &'a Path) -> Result<&'a Path> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ExecutableNotFound {
            name: name.to_string(),
            searched: vec![path.to_path_buf()],
        })
    }
}

fn ensure_success(output: &ProcessOutput) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::WorkerExitFailure {
            code: signal::exit_code(&output.status),
            log_tail: output.stderr_tail.clone(),
        })
    }
}

/// Reads stdout to the end and keeps the last stderr lines, then reaps the child.
async fn collect_output(child: &mut Child) -> io::Result<ProcessOutput> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let read_stdout = async move {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout {
            out.read_to_end(&mut buf).await?;
        }
        Ok::<_, io::Error>(buf)
    };

    let read_stderr = async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(err) = stderr {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("[Preview] {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        tail.into_iter().collect::<Vec<_>>()
    };

    let (stdout, stderr_tail) = tokio::join!(read_stdout, read_stderr);
    let status = child.wait().await?;
    Ok(ProcessOutput {
        status,
        stdout: stdout?,
        stderr_tail,
    })
}

/// Minimal VapourSynth script that only loads the source.
fn source_script(path: &Path) -> Result<String> {
    // A JSON string literal is also a valid Python string literal
    let literal = serde_json::to_string(&path.to_string_lossy())?;
    Ok(format!(
        "import vapoursynth as vs\ncore = vs.core\nclip = core.ffms2.Source(source={})\nclip.set_output()\n",
        literal
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::installer::{BundleLayout, Platform};
    use crate::process_manager::signal::is_alive;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn generator(dir: &Path, worker_body: &str) -> PreviewGenerator {
        let layout = BundleLayout::new(dir.join("deps"), Platform::LinuxX64);
        let calls = dir.join("vspipe-calls");
        write_script(
            &layout.vspipe_path(),
            &format!(
                "echo \"$4\" >> \"{}\"\nif [ \"$4\" = \"13\" ]; then echo 'frame 13 unreadable' >&2; exit 1; fi\nprintf 'Y4M-%s' \"$4\"",
                calls.display()
            ),
        );
        write_script(&layout.ffmpeg_path(), "for last in \"$@\"; do :; done\ncat > \"$last\"");

        let worker = dir.join("worker.sh");
        write_script(&worker, worker_body);

        let bundle = InstalledBundle::new(layout, "test".to_string());
        PreviewGenerator::new(&bundle, WorkerLocator::with_override(worker), &Settings::default()).unwrap()
    }

    async fn wait_for_pid(path: &Path) -> u32 {
        for _ in 0..250 {
            if let Ok(text) = tokio::fs::read_to_string(path).await {
                if let Ok(pid) = text.trim().parse() {
                    return pid;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("worker never started: {:?}", path);
    }

    #[tokio::test]
    async fn test_raw_frames_cached_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "exit 0");
        generator.set_source("/videos/tape01.avi", 24.0, Some(1000)).await.unwrap();

        let first = generator.raw_frame(1.0).await.unwrap().unwrap();
        let second = generator.raw_frame(1.01).await.unwrap().unwrap();

        assert_eq!(first.frame_index, 24);
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first.path).unwrap(), b"Y4M-24");
        let calls = std::fs::read_to_string(dir.path().join("vspipe-calls")).unwrap();
        assert_eq!(calls.lines().count(), 1);
        assert_eq!(generator.cached_frames(), 1);
    }

    #[tokio::test]
    async fn test_new_source_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "exit 0");
        generator.set_source("/videos/a.avi", 24.0, None).await.unwrap();
        generator.raw_frame(0.5).await.unwrap().unwrap();

        generator.set_source("/videos/b.avi", 25.0, None).await.unwrap();
        assert_eq!(generator.cached_frames(), 0);
        assert!(generator.work_dir().join("source-1.vpy").is_file());
        assert!(!generator.work_dir().join("source-0.vpy").exists());
    }

    #[tokio::test]
    async fn test_requests_need_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "exit 0");
        assert!(matches!(
            generator.raw_frame(1.0).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_thumbnails_skip_failures_and_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "exit 0");
        generator.set_source("/videos/tape01.avi", 24.0, None).await.unwrap();

        let thumbs = generator.thumbnails(&[0.0, 13.0 / 24.0, 1.0]).await.unwrap();

        let summary: Vec<(usize, Vec<u8>)> = thumbs.into_iter().map(|t| (t.index, t.png)).collect();
        assert_eq!(
            summary,
            vec![(0, b"Y4M-0".to_vec()), (2, b"Y4M-24".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_cancelled_extraction_keeps_shared_frame() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(generator(dir.path(), "exit 0"));
        let stalled = dir.path().join("stalled");
        // First call stalls, later calls answer at once
        write_script(
            &BundleLayout::new(dir.path().join("deps"), Platform::LinuxX64).vspipe_path(),
            &format!(
                "if [ ! -e \"{0}\" ]; then touch \"{0}\"; sleep 5; fi\nprintf 'Y4M-%s' \"$4\"",
                stalled.display()
            ),
        );
        generator.set_source("/videos/tape01.avi", 24.0, None).await.unwrap();

        let slow = tokio::spawn({
            let generator = generator.clone();
            async move { generator.raw_frame(1.0).await }
        });
        for _ in 0..250 {
            if stalled.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(stalled.exists());

        let thumbs = generator.thumbnails(&[1.0]).await.unwrap();
        assert_eq!(thumbs[0].png, b"Y4M-24");

        generator.raw_frame(2.0).await.unwrap().unwrap();
        assert!(slow.await.unwrap().unwrap().is_none());

        let cached = generator.raw_frame(1.0).await.unwrap().unwrap();
        assert_eq!(std::fs::read(&cached.path).unwrap(), b"Y4M-24");
        let leftovers = std::fs::read_dir(generator.work_dir().join("frames"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".partial."))
            .count();
        assert_eq!(leftovers, 0);
        generator.dispose().await;
    }

    #[tokio::test]
    async fn test_newer_preview_supersedes_older() {
        let dir = tempfile::tempdir().unwrap();
        let worker = format!(
            "echo $$ > \"{}/pid-$5\"\nif [ \"$5\" = \"24\" ]; then sleep 30; fi\nprintf 'PNG-%s' \"$5\"",
            dir.path().display()
        );
        let generator = Arc::new(generator(dir.path(), &worker));
        generator.set_source("/videos/tape01.avi", 24.0, None).await.unwrap();

        let older = {
            let generator = generator.clone();
            tokio::spawn(async move {
                generator
                    .processed_frame(PreviewRequest {
                        timestamp: 1.0,
                        ..Default::default()
                    })
                    .await
            })
        };
        let older_pid = wait_for_pid(&dir.path().join("pid-24")).await;

        let newer = generator
            .processed_frame(PreviewRequest {
                timestamp: 2.0,
                ..Default::default()
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(newer.frame_index, 48);
        assert_eq!(newer.png, b"PNG-48");
        assert_eq!(older.await.unwrap().unwrap(), None);
        assert!(!is_alive(older_pid));
    }

    #[tokio::test]
    async fn test_preview_uses_request_field_order() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(
            dir.path(),
            r#"if grep -q '"tff": true' "$2"; then printf TFF; else printf BFF; fi"#,
        );
        generator.set_source("/videos/tape01.avi", 29.97, None).await.unwrap();

        let mut request = PreviewRequest {
            timestamp: 3.0,
            field_order_override: Some(FieldOrder::TopFieldFirst),
            ..Default::default()
        };
        let tff = generator.processed_frame(request.clone()).await.unwrap().unwrap();
        request.field_order_override = Some(FieldOrder::BottomFieldFirst);
        let bff = generator.processed_frame(request).await.unwrap().unwrap();

        assert_eq!(tff.png, b"TFF");
        assert_eq!(bff.png, b"BFF");
    }

    #[tokio::test]
    async fn test_worker_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), "echo 'Failed to load plugin' >&2\nexit 3");
        generator.set_source("/videos/tape01.avi", 24.0, None).await.unwrap();

        match generator.processed_frame(PreviewRequest::default()).await {
            Err(Error::WorkerExitFailure { code, log_tail }) => {
                assert_eq!(code, 3);
                assert_eq!(log_tail, vec!["Failed to load plugin".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispose_kills_worker_and_removes_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let worker = format!("echo $$ > \"{}/pid\"\nsleep 30", dir.path().display());
        let generator = Arc::new(generator(dir.path(), &worker));
        generator.set_source("/videos/tape01.avi", 24.0, None).await.unwrap();

        let pending = {
            let generator = generator.clone();
            tokio::spawn(async move { generator.processed_frame(PreviewRequest::default()).await })
        };
        let pid = wait_for_pid(&dir.path().join("pid")).await;

        generator.dispose().await;

        assert_eq!(pending.await.unwrap().unwrap(), None);
        assert!(!is_alive(pid));
        assert!(!generator.work_dir().exists());
        assert!(matches!(
            generator.set_source("/videos/other.avi", 24.0, None).await,
            Err(Error::Cancelled)
        ));
    }
}
