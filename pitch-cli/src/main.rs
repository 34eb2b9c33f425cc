//! # Pitch Probe - command-line front end
//!
//! Opens the default microphone through `pitch-core` and prints the detected
//! note as one JSON object per line.
//!
//! ## Commands
//! - `note`: a single instantaneous reading
//! - `probe`: averaged readings over consecutive time windows

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use pitch_core::{
    CaptureConfig, MicrophoneCapture, NoteInfo, PitchError, PitchSession, ProbeOptions,
};

#[derive(Parser)]
#[command(name = "pitch-probe", about = "Measure the pitch of live microphone input")]
struct Cli {
    /// JSON settings file with optional `capture` and `probe` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Requested input sample rate in Hz (overrides the settings file)
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Samples per analysed frame (overrides the settings file)
    #[arg(long, global = true)]
    fft_size: Option<usize>,

    /// Time to let the input fill up before the first reading [ms]
    #[arg(long, global = true, default_value_t = 250.0)]
    warmup_ms: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a single instantaneous reading
    Note,
    /// Average readings over consecutive time windows
    Probe {
        /// Length of each probe window [ms]
        #[arg(long, default_value_t = 1000.0)]
        window_ms: f64,

        /// Number of consecutive windows
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Target readings per window (overrides the settings file)
        #[arg(long)]
        samples: Option<usize>,

        /// Sampled fraction of each window (overrides the settings file)
        #[arg(long)]
        sub_interval: Option<f64>,
    },
}

/// Settings loaded from `--config`. Missing sections keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    capture: CaptureConfig,
    probe: ProbeOptions,
}

/// Loads settings from a JSON file.
fn load_settings(path: &Path) -> Result<Settings> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings = serde_json::from_str(&data)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    Ok(settings)
}

/// Prints a result line, or a warning when the input held no detectable pitch.
fn report(result: pitch_core::Result<NoteInfo>) -> Result<()> {
    match result {
        Ok(info) => {
            println!("{}", serde_json::to_string(&info)?);
            Ok(())
        }
        Err(PitchError::InvalidInput(reason)) => {
            warn!("No detectable pitch ({})", reason);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Rejects window lengths that cannot schedule any reading.
fn check_window(window_ms: f64) -> Result<()> {
    anyhow::ensure!(
        window_ms.is_finite() && window_ms > 0.0,
        "--window-ms must be a positive number of milliseconds, got {window_ms}"
    );
    Ok(())
}

/// Warm-up delay, capped at one minute.
fn warmup_ms(cli: &Cli) -> f64 {
    cli.warmup_ms.max(0.0).min(60_000.0)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    if let Some(rate) = cli.sample_rate {
        settings.capture.sample_rate = rate;
    }
    if let Some(size) = cli.fft_size {
        settings.capture.fft_size = size;
    }

    let mut session = PitchSession::new(MicrophoneCapture::new(settings.capture));
    session.start().context("starting pitch session")?;

    match cli.command {
        Commands::Note => {
            thread::sleep(Duration::from_secs_f64(warmup_ms(&cli) / 1000.0));
            report(session.get_note())?;
        }
        Commands::Probe {
            window_ms,
            count,
            samples,
            sub_interval,
        } => {
            if let Some(n) = samples {
                settings.probe.num_samples = n;
            }
            if let Some(s) = sub_interval {
                settings.probe.sub_interval = s;
            }
            settings.probe.validate()?;
            check_window(window_ms)?;

            info!("Probing {} window(s) of {} ms", count, window_ms);
            let first = session.now() + warmup_ms(&cli);
            for i in 0..count {
                let from = first + i as f64 * window_ms;
                report(session.probe_note(from, from + window_ms, &settings.probe))?;
            }
        }
    }

    session.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_arguments() {
        let cli = Cli::try_parse_from([
            "pitch-probe",
            "probe",
            "--window-ms",
            "500",
            "--count",
            "3",
            "--samples",
            "7",
            "--fft-size",
            "4096",
        ])
        .unwrap();
        assert_eq!(cli.fft_size, Some(4096));
        match cli.command {
            Commands::Probe { window_ms, count, samples, sub_interval } => {
                assert_eq!(window_ms, 500.0);
                assert_eq!(count, 3);
                assert_eq!(samples, Some(7));
                assert_eq!(sub_interval, None);
            }
            Commands::Note => panic!("expected probe"),
        }
    }

    #[test]
    fn window_must_be_positive_and_finite() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -1.0] {
            assert!(check_window(bad).is_err(), "{bad}");
        }
        assert!(check_window(500.0).is_ok());
    }

    #[test]
    fn warmup_is_bounded() {
        let mut cli = Cli::try_parse_from(["pitch-probe", "note"]).unwrap();
        assert_eq!(warmup_ms(&cli), 250.0);
        cli.warmup_ms = -5.0;
        assert_eq!(warmup_ms(&cli), 0.0);
        cli.warmup_ms = f64::INFINITY;
        assert_eq!(warmup_ms(&cli), 60_000.0);
    }

    #[test]
    fn loads_partial_settings_file() {
        let path = std::env::temp_dir().join(format!("pitch-probe-settings-{}.json", std::process::id()));
        fs::write(&path, r#"{"probe": {"num_samples": 9}, "capture": {"smoothing": 0.0}}"#).unwrap();
        let settings = load_settings(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.probe.num_samples, 9);
        assert_eq!(settings.probe.sub_interval, 0.9);
        assert_eq!(settings.capture.smoothing, 0.0);
        assert_eq!(settings.capture.fft_size, 2048);
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        assert!(load_settings(Path::new("/nonexistent/pitch-probe.json")).is_err());
    }

    #[test]
    fn silence_is_reported_not_fatal() {
        assert!(report(Err(PitchError::InvalidInput("0 Hz".into()))).is_ok());
        assert!(report(Err(PitchError::NotStarted)).is_err());
    }
}
