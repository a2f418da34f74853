// VapourBox command-line front end
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use vapourbox_lib::commands::{dependencies, jobs, preview};
use vapourbox_lib::file_manager::initialize_json_file;
use vapourbox_lib::installer::describe_status;
use vapourbox_lib::models::{InstallPhase, InstallProgress, Settings};
use vapourbox_lib::preview::PreviewRequest;
use vapourbox_lib::process_manager::SupervisorEvent;
use vapourbox_lib::{logging, utils, AppPaths, AppState, Error, Result};

const USAGE: &str = "\
Usage:
  vapourbox check-deps
  vapourbox install-deps [--from <archive>]
  vapourbox run --job <job.json>
  vapourbox preview --job <job.json> --time <seconds> --out <png> [--fps <rate>]";

#[derive(Debug, PartialEq)]
enum Command {
    CheckDeps,
    InstallDeps { from: Option<PathBuf> },
    Run { job: PathBuf },
    Preview {
        job: PathBuf,
        time: f64,
        out: PathBuf,
        fps: Option<f64>,
    },
}

fn take_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| Error::InvalidArgument(format!("{} needs a value", flag)))
}

fn parse_number(value: &str, flag: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("{} expects a number, got '{}'", flag, value)))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut args = args.into_iter();
    let subcommand = args
        .next()
        .ok_or_else(|| Error::InvalidArgument(USAGE.to_string()))?;

    let mut from = None;
    let mut job = None;
    let mut time = None;
    let mut out = None;
    let mut fps = None;

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--from" => from = Some(PathBuf::from(take_value(&mut args, &flag)?)),
            "--job" => job = Some(PathBuf::from(take_value(&mut args, &flag)?)),
            "--out" => out = Some(PathBuf::from(take_value(&mut args, &flag)?)),
            "--time" => time = Some(parse_number(&take_value(&mut args, &flag)?, &flag)?),
            "--fps" => fps = Some(parse_number(&take_value(&mut args, &flag)?, &flag)?),
            other => {
                return Err(Error::InvalidArgument(format!("Unknown option '{}'\n{}", other, USAGE)));
            }
        }
    }

    let missing = |name: &str| Error::InvalidArgument(format!("{} is required\n{}", name, USAGE));

    match subcommand.as_str() {
        "check-deps" => Ok(Command::CheckDeps),
        "install-deps" => Ok(Command::InstallDeps { from }),
        "run" => Ok(Command::Run {
            job: job.ok_or_else(|| missing("--job"))?,
        }),
        "preview" => Ok(Command::Preview {
            job: job.ok_or_else(|| missing("--job"))?,
            time: time.ok_or_else(|| missing("--time"))?,
            out: out.ok_or_else(|| missing("--out"))?,
            fps,
        }),
        other => Err(Error::InvalidArgument(format!("Unknown command '{}'\n{}", other, USAGE))),
    }
}

async fn check_deps(state: &AppState) -> Result<bool> {
    let status = dependencies::check_dependencies(state)?;
    println!("{}", describe_status(&status));
    Ok(status.is_installed())
}

async fn install_deps(state: &AppState, from: Option<PathBuf>) -> Result<bool> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<InstallProgress>();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while let Some(progress) = rx.recv().await {
            let step = (progress.phase, progress.percent / 10);
            if last != Some(step) {
                let label = match progress.phase {
                    InstallPhase::Downloading => "Downloading",
                    InstallPhase::Verifying => "Verifying",
                    InstallPhase::Extracting => "Extracting",
                    InstallPhase::Finalizing => "Finalizing",
                };
                println!("{:<12} {:>3}%", label, progress.percent);
                last = Some(step);
            }
        }
    });

    let result = dependencies::install_dependencies(state, from, Some(tx)).await;
    let _ = printer.await;

    let status = result?;
    println!("{}", describe_status(&status));
    Ok(true)
}

async fn run_job(state: &AppState, path: PathBuf) -> Result<bool> {
    let job = jobs::load_job_file(&path)?;
    let mut events = jobs::subscribe_job_events(state)?;
    jobs::start_job(state, &job)?;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling job");
                jobs::cancel_job(state).await?;
                continue;
            }
        };

        match event {
            Ok(SupervisorEvent::Progress(p)) => {
                println!("frame {}/{}  {}  eta {:.0}s", p.frame, p.total_frames, p.fps_formatted(), p.eta);
            }
            Ok(SupervisorEvent::Log(_)) => {}
            Ok(SupervisorEvent::Error(message)) => eprintln!("worker error: {}", message),
            Ok(SupervisorEvent::Complete(done)) => {
                if done.success {
                    println!("done: {}", done.output_path.as_deref().unwrap_or(job.output_path.as_str()));
                } else if done.cancelled {
                    println!("cancelled");
                } else {
                    eprintln!("failed: {}", done.error.as_deref().unwrap_or("unknown error"));
                }
                return Ok(done.success);
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                let done = jobs::wait_for_job(state).await?;
                return Ok(done.map_or(false, |d| d.success));
            }
        }
    }
}

async fn preview_frame(state: &AppState, job: PathBuf, time: f64, out: PathBuf, fps: Option<f64>) -> Result<bool> {
    let job = jobs::load_job_file(&job)?;
    let fps = fps
        .or(job.input_frame_rate)
        .ok_or_else(|| Error::InvalidArgument("Frame rate unknown; pass --fps".to_string()))?;

    preview::set_preview_source(state, PathBuf::from(&job.input_path), fps, job.total_frames).await?;
    let frame = preview::render_preview(
        state,
        PreviewRequest {
            timestamp: time,
            pipeline: job.restoration_pipeline,
            detected_field_order: job.detected_field_order,
            field_order_override: None,
        },
    )
    .await?;

    match frame {
        Some(frame) => {
            tokio::fs::write(&out, &frame.png).await?;
            println!("frame {} written to {}", frame.frame_index, out.display());
            Ok(true)
        }
        None => Err(Error::Cancelled),
    }
}

async fn run(command: Command, paths: AppPaths) -> Result<bool> {
    utils::initialize_data_directories()?;
    initialize_json_file(&paths.settings_path, &Settings::default())?;
    logging::cleanup_old_logs(&paths.logs_dir, logging::LOG_RETENTION_DAYS);

    let state = AppState::init(paths)?;
    let result = match command {
        Command::CheckDeps => check_deps(&state).await,
        Command::InstallDeps { from } => install_deps(&state, from).await,
        Command::Run { job } => run_job(&state, job).await,
        Command::Preview { job, time, out, fps } => preview_frame(&state, job, time, out, fps).await,
    };
    state.dispose().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let paths = AppPaths::default_locations();
    logging::init(Some(&paths.logs_dir));

    match run(command, paths).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
