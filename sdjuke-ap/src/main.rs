//! Audio Player (sdjuke-ap) - Main entry point
//!
//! Bootstraps configuration and logging, starts the playback loop on a
//! dedicated blocking thread and turns stdin commands and Unix signals
//! into skip requests.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sdjuke_ap::audio::output::{self, AudioBus, CpalAudioBus, WavFileBus};
use sdjuke_ap::audio::Mp3FrameDecoder;
use sdjuke_ap::config::{Config, OutputBackend, Overrides};
use sdjuke_ap::playback::{PlaybackController, PlayerLoop, SkipRequests, TrackNavigator};
use sdjuke_ap::storage::FsStorage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for sdjuke-ap
#[derive(Parser, Debug)]
#[command(name = "sdjuke-ap")]
#[command(about = "Continuous MP3 player for a folder tree")]
#[command(version)]
struct Args {
    /// Configuration file (default: platform search path)
    #[arg(short, long, env = "SDJUKE_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder containing music files
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Output backend
    #[arg(short, long, value_enum)]
    output: Option<OutputBackend>,

    /// Audio output device name
    #[arg(short, long, env = "SDJUKE_DEVICE")]
    device: Option<String>,

    /// WAV output file (wav backend)
    #[arg(long)]
    wav_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SDJUKE_LOG_LEVEL")]
    log_level: Option<String>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Command read from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Next,
    Previous,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "next" | ">" => Some(Command::Next),
        "p" | "prev" | "<" => Some(Command::Previous),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for name in output::list_devices().context("Failed to list audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let overrides = Overrides {
        root_folder: args.root_folder,
        output: args.output,
        device: args.device,
        wav_path: args.wav_path,
        log_level: args.log_level,
    };
    let config = Config::load(args.config.as_deref(), overrides)
        .context("Failed to load configuration")?;

    sdjuke_common::logging::init_tracing("sdjuke_ap", &config.log_level)
        .context("Failed to initialize logging")?;

    info!(
        "Starting sdjuke Audio Player (git {}, built {}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = &config.source_file {
        info!("Configuration: {}", path.display());
    }
    info!(
        "Root folder: {} (from {})",
        config.root_folder.display(),
        config.root_source
    );
    if !config.root_folder.is_dir() {
        warn!(
            "Root folder {} is not a directory yet, will keep retrying",
            config.root_folder.display()
        );
    }

    let skips = Arc::new(SkipRequests::new());

    let player_skips = Arc::clone(&skips);
    let player = tokio::task::spawn_blocking(move || run_player(config, player_skips));

    let (quit_tx, mut quit_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(read_commands(Arc::clone(&skips), quit_tx));
    #[cfg(unix)]
    spawn_signal_edges(Arc::clone(&skips))?;

    let outcome: Result<()> = tokio::select! {
        result = player => {
            // The loop never returns; getting here means setup failed or it panicked
            match result.context("Player thread panicked") {
                Ok(inner) => inner.context("Failed to start player"),
                Err(e) => Err(e),
            }
        }
        Some(()) = quit_rx.recv() => {
            info!("Quit requested, shutting down");
            Ok(())
        }
        _ = shutdown_signal() => Ok(()),
    };

    // The player and stdin threads never finish on their own; exit without
    // waiting for the runtime to join them
    match outcome {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1)
        }
    }
}

/// Build the pipeline for the configured backend and run it
fn run_player(config: Config, skips: Arc<SkipRequests>) -> sdjuke_ap::Result<()> {
    let decoder = Mp3FrameDecoder::new()?;
    let buffer = config.stream_buffer()?;
    let navigator = TrackNavigator::new(
        config.root_folder.clone(),
        config.extension.clone(),
        config.max_path_len,
    );

    match config.output.backend {
        OutputBackend::Cpal => {
            // cpal streams are not Send; the bus lives on this thread
            let bus = CpalAudioBus::open(config.output.device.as_deref(), config.output.ring_frames)?;
            start(config, navigator, decoder, bus, buffer, skips)
        }
        OutputBackend::Wav => {
            let bus = WavFileBus::new(config.output.wav_path.clone(), config.output.wav_realtime);
            start(config, navigator, decoder, bus, buffer, skips)
        }
    }
}

fn start<B: AudioBus>(
    config: Config,
    navigator: TrackNavigator,
    decoder: Mp3FrameDecoder,
    bus: B,
    buffer: sdjuke_ap::audio::CompressedStreamBuffer,
    skips: Arc<SkipRequests>,
) -> ! {
    let controller = PlaybackController::new(decoder, bus, buffer, skips);
    PlayerLoop::new(FsStorage::new(), navigator, controller, config.timing).run()
}

/// Read skip commands from stdin until it closes or `quit` is entered
async fn read_commands(skips: Arc<SkipRequests>, quit: tokio::sync::mpsc::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(Command::Next) => skips.request_forward(),
                Some(Command::Previous) => skips.request_backward(),
                Some(Command::Quit) => {
                    let _ = quit.send(()).await;
                    return;
                }
                None if line.trim().is_empty() => {}
                None => warn!("Unknown command '{}' (n/next, p/prev, q/quit)", line.trim()),
            },
            Ok(None) => return,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}

/// SIGUSR1 skips forward, SIGUSR2 skips backward
#[cfg(unix)]
fn spawn_signal_edges(skips: Arc<SkipRequests>) -> Result<()> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut next = unix_signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?;
    let mut prev = unix_signal(SignalKind::user_defined2()).context("Failed to install SIGUSR2 handler")?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = next.recv() => skips.request_forward(),
                Some(()) = prev.recv() => skips.request_backward(),
                else => break,
            }
        }
    });

    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("n"), Some(Command::Next));
        assert_eq!(parse_command(" NEXT \n"), Some(Command::Next));
        assert_eq!(parse_command(">"), Some(Command::Next));
        assert_eq!(parse_command("prev"), Some(Command::Previous));
        assert_eq!(parse_command("<"), Some(Command::Previous));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("play"), None);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "sdjuke-ap",
            "--root-folder",
            "/sdcard",
            "--output",
            "wav",
            "--wav-path",
            "out.wav",
        ])
        .unwrap();

        assert_eq!(args.root_folder, Some(PathBuf::from("/sdcard")));
        assert_eq!(args.output, Some(OutputBackend::Wav));
        assert_eq!(args.wav_path, Some(PathBuf::from("out.wav")));
        assert!(!args.list_devices);
    }
}
