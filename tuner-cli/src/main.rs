//! # tuner - Terminal Instrument Tuner
//!
//! Command-line front end for `tuner-core`.
//!
//! ## Architecture
//! - **Audio Thread**: cpal capture plus pitch detection, one estimate per window
//! - **Stdin Thread**: reference pitch changes and quit commands
//! - **Main Thread**: owns the reference pitch, maps estimates to notes, prints
//! - **Communication**: Crossbeam channels between all three

mod capture;
mod commands;
mod display;
mod simulate;
mod worker;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tuner_core::config::validate_reference_pitch;
use tuner_core::{PitchDetector, Reading, TunerConfig};

use commands::Command;
use display::Readout;
use worker::AnalysisWorker;

#[derive(Parser)]
#[command(name = "tuner")]
#[command(about = "Real-time autocorrelation tuner")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference pitch for A4 in Hz (overrides the config file)
    #[arg(long, global = true)]
    reference: Option<f32>,

    /// Print one JSON reading per line instead of the text readout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tune from the default input device. Type a frequency + Enter to change
    /// the reference pitch, or `q` to quit.
    Listen,

    /// Run synthetic sine windows through the detector
    Simulate {
        #[arg(long)]
        frequency: f32,

        #[arg(long, default_value = "44100")]
        sample_rate: f32,

        #[arg(long, default_value = "10")]
        frames: usize,

        #[arg(long, default_value = "0.5")]
        amplitude: f32,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Listen => listen(&config, Readout::new(cli.json, true)),
        Commands::Simulate {
            frequency,
            sample_rate,
            frames,
            amplitude,
        } => {
            let tone = simulate::Tone {
                frequency,
                sample_rate,
                amplitude,
            };
            simulate::run(&config, tone, frames, Readout::new(cli.json, false))
        }
    }
}

/// Logs go to stderr so stdout carries only the readout. `RUST_LOG` overrides
/// the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<TunerConfig> {
    let mut config = match &cli.config {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(hz) = cli.reference {
        config.reference_pitch = validate_reference_pitch(hz)?;
    }
    config.validate()?;
    Ok(config)
}

fn listen(config: &TunerConfig, mut readout: Readout) -> Result<()> {
    let (estimate_tx, estimate_rx) = crossbeam_channel::unbounded();
    let detector = PitchDetector::new(config.detector);
    info!(settings = ?detector.settings(), "detector ready");
    let worker = AnalysisWorker::spawn(detector, config.window_size, estimate_tx)?;
    info!(
        sample_rate = worker.sample_rate(),
        reference_pitch = config.reference_pitch,
        "listening; type a frequency to change the reference, q to quit"
    );

    let mut commands = commands::spawn_stdin_reader();
    let mut reference_pitch = config.reference_pitch;

    loop {
        let mut stdin_closed = false;
        crossbeam_channel::select! {
            recv(estimate_rx) -> msg => match msg {
                Ok(estimate) => {
                    let reading = Reading::new(estimate, reference_pitch, &config.feedback);
                    readout.show(&reading)?;
                }
                Err(_) => {
                    warn!("analysis worker stopped");
                    break;
                }
            },
            recv(commands) -> msg => match msg {
                Ok(Command::SetReference(hz)) => {
                    info!(reference_pitch = hz, "reference pitch changed");
                    reference_pitch = hz;
                }
                Ok(Command::Quit) => break,
                Err(_) => stdin_closed = true,
            },
        }
        if stdin_closed {
            // Keep tuning until the worker stops.
            commands = crossbeam_channel::never();
        }
    }

    readout.finish()?;
    worker.shutdown();
    Ok(())
}
