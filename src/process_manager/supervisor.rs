// Worker process supervisor
// Runs one restoration job at a time and turns worker output into events

use super::environment::ToolEnvironment;
use super::locator::WorkerLocator;
use super::protocol::{parse_line, ParsedLine, WorkerMessage};
use super::signal;
use crate::error::{Error, Result};
use crate::file_manager::write_json_file;
use crate::installer::InstalledBundle;
use crate::models::{LogEntry, LogLevel, LogSource, ProgressInfo, VideoJob};
use crate::utils::create_instance_temp_dir;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const LOG_TAIL_LINES: usize = 20;
const EVENT_CAPACITY: usize = 256;
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Completed,
    Failed,
    Cancelling,
    Cancelled,
}

impl SupervisorState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SupervisorState::Starting | SupervisorState::Running | SupervisorState::Cancelling
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub job_id: Uuid,
    pub success: bool,
    pub cancelled: bool,
    pub exit_code: Option<i32>,
    pub output_path: Option<String>,
    pub error: Option<String>,
    pub log_tail: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum SupervisorEvent {
    Progress(ProgressInfo),
    Log(LogEntry),
    Error(String),
    Complete(CompletionEvent),
}

struct ActiveRun {
    token: CancellationToken,
    done: watch::Receiver<Option<CompletionEvent>>,
}

struct Inner {
    state: SupervisorState,
    run: Option<ActiveRun>,
}

/// State shared between the stream readers and the exit monitor of one run.
struct RunShared {
    events: broadcast::Sender<SupervisorEvent>,
    tail: Mutex<VecDeque<String>>,
    reported: Mutex<Option<(bool, Option<String>)>>,
    last_error: Mutex<Option<String>>,
}

impl RunShared {
    fn emit(&self, event: SupervisorEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn push_tail(&self, line: &str) {
        let mut tail = self.tail.lock();
        if tail.len() == LOG_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }

    fn log(&self, level: LogLevel, message: String, source: LogSource) {
        log::log!(level.as_log_level(), "[Worker] {}", message);
        self.push_tail(&message);
        self.emit(SupervisorEvent::Log(LogEntry::new(level, message, source)));
    }
}

struct RunContext {
    job_id: Uuid,
    job_path: PathBuf,
    child: Child,
    token: CancellationToken,
    grace: Duration,
    shared: Arc<RunShared>,
    readers: Vec<JoinHandle<()>>,
    inner: Arc<Mutex<Inner>>,
    done: watch::Sender<Option<CompletionEvent>>,
}

pub struct Supervisor {
    environment: ToolEnvironment,
    locator: WorkerLocator,
    grace: Duration,
    work_dir: PathBuf,
    events: Mutex<Option<broadcast::Sender<SupervisorEvent>>>,
    inner: Arc<Mutex<Inner>>,
}

impl Supervisor {
    pub fn new(bundle: &InstalledBundle, locator: WorkerLocator, cancel_grace: Duration) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            environment: ToolEnvironment::from_bundle(bundle),
            locator,
            grace: cancel_grace,
            work_dir: create_instance_temp_dir("supervisor")?,
            events: Mutex::new(Some(events)),
            inner: Arc::new(Mutex::new(Inner {
                state: SupervisorState::Idle,
                run: None,
            })),
        })
    }

    pub fn state(&self) -> SupervisorState {
        self.inner.lock().state
    }

    /// After `close()` the returned receiver is already at end-of-stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        match self.events.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub fn start(&self, job: &VideoJob) -> Result<()> {
        // Held through spawn so a concurrent start always sees a non-idle state
        let mut inner = self.inner.lock();
        if inner.state.is_active() {
            return Err(Error::AlreadyRunning);
        }

        let events = self
            .events
            .lock()
            .clone()
            .ok_or_else(|| Error::InvalidArgument("Supervisor has been closed".to_string()))?;

        inner.state = SupervisorState::Starting;
        match self.spawn_run(job, events) {
            Ok(run) => {
                inner.state = SupervisorState::Running;
                inner.run = Some(run);
                Ok(())
            }
            Err(e) => {
                inner.state = SupervisorState::Idle;
                Err(e)
            }
        }
    }

    fn spawn_run(&self, job: &VideoJob, events: broadcast::Sender<SupervisorEvent>) -> Result<ActiveRun> {
        let worker = self.locator.locate()?;

        let job_path = self.work_dir.join(format!("job-{}.json", job.id));
        write_json_file(&job_path, job)?;

        let mut cmd = Command::new(&worker);
        cmd.arg("--config")
            .arg(&job_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.environment.apply(&mut cmd);
        signal::configure_command(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let _ = std::fs::remove_file(&job_path);
                return Err(e.into());
            }
        };

        info!(
            "[Supervisor] Started {:?} (pid {:?}) for job {}",
            worker,
            child.id(),
            job.id
        );

        let shared = Arc::new(RunShared {
            events,
            tail: Mutex::new(VecDeque::with_capacity(LOG_TAIL_LINES)),
            reported: Mutex::new(None),
            last_error: Mutex::new(None),
        });

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(read_stdout(BufReader::new(stdout), shared.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(read_stderr(BufReader::new(stderr), shared.clone())));
        }

        let token = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(None);

        tokio::spawn(monitor(RunContext {
            job_id: job.id,
            job_path,
            child,
            token: token.clone(),
            grace: self.grace,
            shared,
            readers,
            inner: self.inner.clone(),
            done: done_tx,
        }));

        Ok(ActiveRun {
            token,
            done: done_rx,
        })
    }

    /// Stops the running job. Returns false when nothing was running.
    pub async fn cancel(&self) -> bool {
        let mut done = {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, SupervisorState::Starting | SupervisorState::Running) {
                return false;
            }
            let Some(run) = inner.run.as_ref() else {
                return false;
            };
            // Cancelled under the lock so the monitor cannot finish in between
            run.token.cancel();
            let done = run.done.clone();
            inner.state = SupervisorState::Cancelling;
            done
        };

        info!("[Supervisor] Cancelling current job");
        let _ = done.wait_for(|c| c.is_some()).await;
        true
    }

    /// Completion of the current (or most recent) job.
    pub async fn wait(&self) -> Option<CompletionEvent> {
        let mut done = self.inner.lock().run.as_ref()?.done.clone();
        done.wait_for(|c| c.is_some()).await.ok().and_then(|c| c.clone())
    }

    /// Cancels any running job and ends every subscriber's stream.
    pub async fn close(&self) {
        self.cancel().await;
        self.events.lock().take();
        let _ = tokio::fs::remove_dir_all(&self.work_dir).await;
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(run) = self.inner.lock().run.as_ref() {
            run.token.cancel();
        }
        let _ = std::fs::remove_dir_all(&self.work_dir);
    }
}

/// Reads one line, replacing invalid UTF-8 rather than failing.
async fn next_line<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String> {
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(String::from_utf8_lossy(buf).trim_end().to_string()),
    }
}

async fn read_stdout<R: AsyncBufRead + Unpin>(mut reader: R, shared: Arc<RunShared>) {
    let mut buf = Vec::new();
    while let Some(line) = next_line(&mut reader, &mut buf).await {
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            ParsedLine::Message(WorkerMessage::Progress {
                frame,
                total_frames,
                fps,
                eta,
            }) => {
                debug!("[Worker] frame {}/{}", frame, total_frames);
                shared.emit(SupervisorEvent::Progress(ProgressInfo::new(
                    frame,
                    total_frames,
                    fps,
                    eta,
                )));
            }
            ParsedLine::Message(WorkerMessage::Log { level, message }) => {
                shared.log(level, message, LogSource::Stdout);
            }
            ParsedLine::Message(WorkerMessage::Error { message }) => {
                error!("[Worker] {}", message);
                shared.push_tail(&message);
                *shared.last_error.lock() = Some(message.clone());
                shared.emit(SupervisorEvent::Error(message));
            }
            ParsedLine::Message(WorkerMessage::Complete {
                success,
                output_path,
            }) => {
                *shared.reported.lock() = Some((success, output_path));
            }
            ParsedLine::PlainText(text) => {
                shared.log(LogLevel::Info, text, LogSource::Stdout);
            }
            ParsedLine::Malformed { kind, reason } => {
                warn!(
                    "[Supervisor] Dropping {} record: {}",
                    kind,
                    Error::ProtocolParse(reason)
                );
            }
        }
    }
}

async fn read_stderr<R: AsyncBufRead + Unpin>(mut reader: R, shared: Arc<RunShared>) {
    let mut buf = Vec::new();
    while let Some(line) = next_line(&mut reader, &mut buf).await {
        if !line.trim().is_empty() {
            shared.log(LogLevel::Warning, line, LogSource::Stderr);
        }
    }
}

async fn monitor(mut ctx: RunContext) {
    let status = tokio::select! {
        status = ctx.child.wait() => status.ok(),
        _ = ctx.token.cancelled() => signal::terminate(&mut ctx.child, ctx.grace).await,
    };
    let exit_code = status.as_ref().map(signal::exit_code);

    for mut reader in ctx.readers.drain(..) {
        if tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut reader).await.is_err() {
            warn!("[Supervisor] Output reader did not finish, abandoning it");
            reader.abort();
        }
    }

    if let Err(e) = tokio::fs::remove_file(&ctx.job_path).await {
        debug!("[Supervisor] Could not remove job file {:?}: {}", ctx.job_path, e);
    }

    let log_tail: Vec<String> = ctx.shared.tail.lock().iter().cloned().collect();
    let reported = ctx.shared.reported.lock().clone();
    let last_error = ctx.shared.last_error.lock().clone();

    // A cancel() that took the lock first wins even if the worker exited on its own
    let (event, state) = {
        let mut inner = ctx.inner.lock();
        let cancelled = ctx.token.is_cancelled() || inner.state == SupervisorState::Cancelling;
        let settled = settle(ctx.job_id, cancelled, exit_code, reported, last_error, log_tail);
        inner.state = settled.1;
        settled
    };

    match state {
        SupervisorState::Completed => info!("[Supervisor] Job {} completed", ctx.job_id),
        SupervisorState::Cancelled => info!("[Supervisor] Job {} cancelled", ctx.job_id),
        _ => error!(
            "[Supervisor] Job {} failed (exit code {:?})",
            ctx.job_id, exit_code
        ),
    }

    let _ = ctx.done.send(Some(event.clone()));
    ctx.shared.emit(SupervisorEvent::Complete(event));
}

fn settle(
    job_id: Uuid,
    cancelled: bool,
    exit_code: Option<i32>,
    reported: Option<(bool, Option<String>)>,
    last_error: Option<String>,
    log_tail: Vec<String>,
) -> (CompletionEvent, SupervisorState) {
    let mut event = CompletionEvent {
        job_id,
        success: false,
        cancelled,
        exit_code,
        output_path: None,
        error: None,
        log_tail,
    };

    if cancelled {
        event.error = Some(Error::Cancelled.to_string());
    } else {
        match reported {
            Some((true, output_path)) => {
                event.success = true;
                event.output_path = output_path;
            }
            Some((false, _)) => {
                event.error = Some(last_error.unwrap_or_else(|| "Worker reported failure".to_string()));
            }
            None => {
                let code = exit_code.unwrap_or(-1);
                event.error = Some(if code == 0 {
                    "Worker exited without reporting completion".to_string()
                } else {
                    Error::WorkerExitFailure {
                        code,
                        log_tail: event.log_tail.clone(),
                    }
                    .to_string()
                });
            }
        }
    }

    let state = if cancelled {
        SupervisorState::Cancelled
    } else if event.success {
        SupervisorState::Completed
    } else {
        SupervisorState::Failed
    };

    (event, state)
}
