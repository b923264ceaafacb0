//! voxid command line
//!
//! Speaker enrollment and recognition from the terminal. Each command
//! starts one orchestrator task; this process owns the single consumer
//! of the event channel and prints every event on stdout. Diagnostics
//! go to stderr via tracing so stdout stays clean.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxid_audio::{list_input_devices, AudioInput, MicInput, WavInput};
use voxid_core::{log_channel, Orchestrator, ProfileStore, DEFAULT_THRESHOLD};
use voxid_engine::{SpectralEngine, VoiceEngine};
use voxid_types::LogEvent;

/// Level applied when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "voxid")]
#[command(version)]
#[command(about = "Speaker enrollment and recognition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the speaker database (defaults to the user data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Input device index from `voxid devices` (negative = system default)
    #[arg(long, global = true, default_value_t = -1, allow_negative_numbers = true)]
    device: i32,

    /// Read audio from a WAV file instead of a microphone
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Engine credential
    #[arg(long, global = true, default_value = "local")]
    credential: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new speaker
    Enroll {
        /// Speaker name (duplicates allowed; the record id disambiguates)
        name: String,
    },

    /// Listen until an enrolled speaker is recognized
    Recognize {
        /// Minimum score for a match
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,
    },

    /// List enrolled speakers
    List,

    /// Delete every record with this name
    Delete {
        /// Speaker name
        name: String,
    },

    /// List audio input devices
    Devices,
}

fn main() {
    // Diagnostics on stderr; stdout carries the event lines
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        db,
        device,
        input,
        credential,
    } = cli;

    if matches!(command, Commands::Devices) {
        return print_devices();
    }

    let store = ProfileStore::new(db.unwrap_or_else(default_db_path));
    store
        .initialize()
        .with_context(|| format!("initializing speaker database at {:?}", store.path()))?;

    let engine: Arc<dyn VoiceEngine> =
        Arc::new(SpectralEngine::new(&credential).context("creating the voice engine")?);
    let audio: Arc<dyn AudioInput> = match input {
        Some(path) => Arc::new(WavInput::new(path)),
        None => Arc::new(MicInput::new(device_index(device))),
    };

    let (sink, events) = log_channel();
    let threshold = match &command {
        Commands::Recognize { threshold } => *threshold,
        _ => DEFAULT_THRESHOLD,
    };
    let orchestrator = Orchestrator::new(store, engine, audio, sink).with_threshold(threshold);

    let handle = match command {
        Commands::Enroll { name } => orchestrator.enroll(&name)?,
        Commands::Recognize { .. } => orchestrator.recognize(),
        Commands::List => orchestrator.list(),
        Commands::Delete { name } => orchestrator.delete(&name)?,
        // `devices` returned above
        Commands::Devices => return Ok(()),
    };

    // Ctrl+C flips the task's cancellation flag; the worker notices at
    // its next frame and shuts down cleanly.
    let cancel = handle.cancel_flag();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    })
    .context("installing the Ctrl+C handler")?;

    // Only the worker holds a sink now, so the event stream ends when
    // the worker does.
    drop(orchestrator);
    print_events(events)?;
    handle.join();
    Ok(())
}

/// Print the worker's events. Per-frame updates (enrollment progress,
/// sub-threshold frames) rewrite one line instead of scrolling.
fn print_events(events: Receiver<LogEvent>) -> Result<()> {
    let mut on_transient_line = false;
    for event in events {
        if matches!(
            event,
            LogEvent::EnrollProgress { .. } | LogEvent::BelowThreshold
        ) {
            print!("\r{}", event);
            io::stdout().flush()?;
            on_transient_line = true;
        } else {
            if on_transient_line {
                println!();
                on_transient_line = false;
            }
            println!("{}", event);
        }
    }
    if on_transient_line {
        println!();
    }
    Ok(())
}

fn print_devices() -> Result<()> {
    let devices = list_input_devices().context("enumerating audio input devices")?;
    if devices.is_empty() {
        println!("No audio input devices found");
        return Ok(());
    }
    println!("Audio input devices:");
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("  [{}] {}{}", device.index, device.name, marker);
    }
    Ok(())
}

/// Negative indices select the system default device.
fn device_index(device: i32) -> Option<usize> {
    usize::try_from(device).ok()
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxid")
        .join("speakers.db")
}
