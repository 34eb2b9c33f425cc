//! # Audio Capture Module
//!
//! Microphone-backed capture collaborator built on CPAL (Cross-Platform Audio
//! Library). Acquiring a [`MicrophoneCapture`] opens the default input device;
//! the resulting [`MicrophoneStream`] turns the most recent audio frame into a
//! spectrum whenever a snapshot is requested.
//!
//! ## Threading
//! - The CPAL callback runs on the backend's audio thread and only slices the
//!   incoming samples into mono frames of `fft_size`
//! - Frames cross to the session's thread over a bounded crossbeam channel
//! - The FFT runs on the session's thread, inside `snapshot()`

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureDevice, SpectrumSnapshot, SpectrumSource};
use crate::error::PitchError;
use crate::fft::{self, SpectrumAnalyser};

/// Frames buffered between the audio callback and the reader. Older frames
/// are dropped once it is full; only the newest one is ever analysed.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Microphone capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Requested sample rate in Hz; the closest supported rate is used.
    pub sample_rate: u32,
    /// Samples per analysed frame. Larger frames give finer frequency
    /// resolution but more latency.
    pub fft_size: usize,
    /// Time constant of the spectrum smoothing between snapshots (0 = off).
    pub smoothing: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            fft_size: 2048,
            smoothing: 0.8,
        }
    }
}

/// [`CaptureDevice`] backed by the host's default audio input.
#[derive(Debug, Clone, Default)]
pub struct MicrophoneCapture {
    config: CaptureConfig,
}

impl CaptureConfig {
    /// Checks the settings before any device is touched.
    ///
    /// # Errors
    /// * `InvalidInput` if `fft_size` is odd or below 2
    pub fn validate(&self) -> crate::error::Result<()> {
        fft::check_fft_size(self.fft_size)
    }
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl CaptureDevice for MicrophoneCapture {
    type Stream = MicrophoneStream;

    fn acquire(&mut self) -> crate::error::Result<MicrophoneStream> {
        self.config.validate()?;
        let analyser = SpectrumAnalyser::new(self.config.fft_size, self.config.smoothing)?;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);
        let (stream, sample_rate) =
            start_audio_capture(&self.config, frame_tx).map_err(PitchError::CaptureUnavailable)?;
        Ok(MicrophoneStream {
            stream,
            frames: frame_rx,
            latest: Vec::new(),
            sample_rate,
            analyser,
        })
    }

    fn release(&mut self, stream: MicrophoneStream) {
        if let Err(e) = stream.stream.pause() {
            warn!("Error pausing audio stream: {}", e);
        }
        drop(stream);
        info!("Audio input released");
    }
}

/// An open input stream plus the analyser turning its frames into spectra.
pub struct MicrophoneStream {
    stream: cpal::Stream,
    frames: Receiver<Vec<f32>>,
    latest: Vec<f32>,
    sample_rate: u32,
    analyser: SpectrumAnalyser,
}

impl MicrophoneStream {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl SpectrumSource for MicrophoneStream {
    /// Analyses the newest complete frame. Before the first frame arrives the
    /// spectrum is silent, which reads as 0 Hz.
    fn snapshot(&mut self) -> SpectrumSnapshot {
        while let Ok(frame) = self.frames.try_recv() {
            self.latest = frame;
        }
        SpectrumSnapshot {
            magnitudes: self.analyser.analyse(&self.latest),
            sample_rate: self.sample_rate as f64,
        }
    }
}

/// Starts audio capture from the default input device.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Playing stream handle and the negotiated sample rate
/// * `Err(e)` - No device, no f32 input format, or the stream failed to start
fn start_audio_capture(config: &CaptureConfig, sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.sample_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = config
        .sample_rate
        .clamp(supported_config.min_sample_rate().0, supported_config.max_sample_rate().0);
    let stream_config: cpal::StreamConfig = supported_config.with_sample_rate(cpal::SampleRate(rate)).into();
    let channels = stream_config.channels.max(1) as usize;

    info!("Selected sample rate: {} Hz, {} channel(s)", rate, channels);

    let frame_size = config.fft_size;
    // Accumulates mono samples from the callback until a full frame is ready.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(frame_size * 2);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );

            while audio_buffer.len() >= frame_size {
                let frame: Vec<f32> = audio_buffer.drain(..frame_size).collect();
                // Full queue: drop the frame, the reader only wants the newest anyway
                let _ = sender.try_send(frame);
            }
        },
        |err| error!("An error occurred on the audio stream: {}", err),
        None,
    )?;

    stream.play()?;

    Ok((stream, rate))
}

/// Picks the input configuration best suited to pitch analysis:
/// 32-bit float samples, fewest channels, then the rate range closest to
/// `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
            let rate_diff = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (c.channels(), rate_diff)
        })
}
