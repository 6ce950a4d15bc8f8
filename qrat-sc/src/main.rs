//! qrat-sc - QR attendance scanner terminal
//!
//! Reads decoded QR payloads one per line, as emitted by a decoder engine,
//! and submits attendance for each admitted scan. Every line is a payload.
//!
//! With `--decoder-input <path>` (a file or FIFO) payloads come from that
//! path and stdin takes operator commands:
//!
//! - `session <week>-<session>` switch the session tag
//! - `history` print accepted records, most recent first
//! - `clear` clear the history

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use qrat_common::config::{resolve, TomlConfig, ENV_LOG_LEVEL, ENV_SESSION, ENV_UPSTREAM_URL};
use qrat_common::SessionTag;
use qrat_sc::{
    Cooldowns, HttpAttendanceService, LineDecoder, PipelineOutcome, ScanEvent, ScanPipeline,
    SubmissionCoordinator,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const DECODER_BUFFER: usize = 64;
const COMMAND_BUFFER: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "qrat-sc")]
#[command(about = "QR attendance scanner terminal")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/qrat/config.toml)
    #[arg(short, long, env = "QRAT_CONFIG")]
    config: Option<PathBuf>,

    /// Remote attendance service base URL
    #[arg(short, long)]
    upstream_url: Option<String>,

    /// Session tag, e.g. 12-2
    #[arg(short, long)]
    session: Option<SessionTag>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Read decoded payloads from this file or FIFO; stdin then takes
    /// operator commands
    #[arg(short, long)]
    decoder_input: Option<PathBuf>,

    /// Print every selectable session and exit
    #[arg(long)]
    list_sessions: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_sessions {
        for tag in SessionTag::all() {
            println!("{}\t{}", tag, tag.label());
        }
        return Ok(());
    }

    // Config is read before tracing exists; its source is logged below
    let (config, source) =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load config")?;

    let log_level = resolve(
        args.log_level,
        ENV_LOG_LEVEL,
        Some(config.logging.level.clone()),
        "info".to_string(),
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.as_str().into()),
        )
        .init();

    info!(
        "Starting QRAT scanner (qrat-sc) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    source.log();

    let upstream_url = resolve(
        args.upstream_url,
        ENV_UPSTREAM_URL,
        Some(config.upstream.base_url.clone()),
        config.upstream.base_url.clone(),
    );
    let session_tag = resolve(
        args.session,
        ENV_SESSION,
        Some(config.scanner.session),
        SessionTag::default(),
    );

    let service = HttpAttendanceService::new(
        &upstream_url,
        Duration::from_secs(config.upstream.timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    info!("Attendance service: {}", service.base_url());

    let coordinator = SubmissionCoordinator::new(Arc::new(service), config.duplicate_phrases.clone());
    let pipeline = ScanPipeline::new(coordinator, Cooldowns::from(&config.scanner), session_tag);
    info!("Session: {} ({})", session_tag, session_tag.label());

    let (mut events, mut commands) = match &args.decoder_input {
        Some(path) => {
            let input = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open decoder input {}", path.display()))?;
            info!("Decoder input: {}", path.display());
            (spawn_decoder(input), Some(spawn_commands()))
        }
        None => (spawn_decoder(tokio::io::stdin()), None),
    };
    let mut tasks = JoinSet::new();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            command = next_command(&mut commands) => {
                match command {
                    Some(line) => run_command(&pipeline, line.trim()),
                    None => {
                        info!("Operator input closed");
                        commands = None;
                    }
                }
                continue;
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!("Scan task failed: {}", e);
                }
                continue;
            }
            _ = &mut shutdown => break,
        };

        let Some(event) = event else {
            info!("Decoder input closed");
            break;
        };

        // Admission happens here, in decode order; only the remote call runs
        // concurrently, so frames arriving mid-submission still reach the gate
        match pipeline.admit(&event) {
            Ok(pending) => {
                tasks.spawn(async move { print_notice(&pending.run().await) });
            }
            Err(outcome) => print_notice(&outcome),
        }
    }

    // Let a pending submission finish before exiting
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("Scan task failed: {}", e);
        }
    }

    let history = pipeline.history();
    info!("Scanner stopped; {} attendance record(s) accepted", history.len());
    Ok(())
}

/// Reads decoder lines on a dedicated task; the channel closes at end of input
fn spawn_decoder<R>(input: R) -> mpsc::Receiver<ScanEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(DECODER_BUFFER);

    tokio::spawn(async move {
        let mut decoder = LineDecoder::new(BufReader::new(input));
        loop {
            match decoder.next_event().await {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read decoder input: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Operator command lines from stdin
fn spawn_commands() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read operator input: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Next operator command; pends forever once there is no command source
async fn next_command(commands: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn print_notice(outcome: &PipelineOutcome) {
    if let Some(notice) = outcome.notice() {
        println!("{}", notice);
    }
}

fn run_command(pipeline: &ScanPipeline, command: &str) {
    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("session"), Some(value)) => match value.parse::<SessionTag>() {
            Ok(tag) => {
                pipeline.set_session_tag(tag);
                println!("Session: {}", tag.label());
            }
            Err(e) => println!("{}", e),
        },
        (Some("history"), None) => {
            let history = pipeline.history();
            if history.is_empty() {
                println!("No attendance recorded yet");
            }
            for record in history.records() {
                println!(
                    "{}\t{}\t{}",
                    record.accepted_at.format("%H:%M:%S"),
                    record.identifier,
                    record.session_tag.label()
                );
            }
        }
        (Some("clear"), None) => {
            pipeline.clear_history();
            println!("History cleared");
        }
        _ => println!("Unknown command: {}", command),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
