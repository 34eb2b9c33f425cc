//! # Fast Fourier Transform (FFT) Module
//!
//! Turns frames of captured audio into magnitude spectra for peak picking.
//!
//! ## Pipeline
//! - DC offset removal
//! - Hann windowing for reduced spectral leakage
//! - Forward FFT using RustFFT
//! - Magnitudes for bins 0..=N/2 (0 Hz to Nyquist inclusive)
//! - Optional exponential smoothing across consecutive frames

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

use crate::error::{PitchError, Result};

/// Removes the DC offset from a signal by making its average value zero.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Precomputes a Hann window of `n` coefficients.
fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let n_minus_1 = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
        .collect()
}

/// Rejects frame sizes whose spectrum would not end on the Nyquist bin.
pub fn check_fft_size(fft_size: usize) -> Result<()> {
    if fft_size < 2 || fft_size % 2 != 0 {
        return Err(PitchError::invalid(format!(
            "fft_size must be even and at least 2, got {fft_size}"
        )));
    }
    Ok(())
}

/// Reusable FFT analyser for fixed-size frames.
///
/// The plan and window are computed once; each call to [`analyse`](Self::analyse)
/// only runs the transform.
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    smoothing: f32,
    previous: Option<Vec<f32>>,
}

impl SpectrumAnalyser {
    /// Creates an analyser for frames of `fft_size` samples.
    ///
    /// `fft_size` must be even and at least 2, so that the last bin of the
    /// `fft_size / 2 + 1` produced lands exactly on Nyquist.
    ///
    /// `smoothing` in `[0, 1)` blends each new spectrum with the previous one:
    /// `out = smoothing * previous + (1 - smoothing) * current`. Values outside
    /// that range are clamped.
    pub fn new(fft_size: usize, smoothing: f32) -> Result<Self> {
        check_fft_size(fft_size)?;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(0.0, 0.99)
        } else {
            0.0
        };
        Ok(Self {
            fft,
            fft_size,
            window: hann_window(fft_size),
            smoothing,
            previous: None,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins produced per spectrum: `fft_size / 2 + 1`.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Computes the magnitude spectrum of `frame`.
    ///
    /// Frames shorter than `fft_size` are zero-padded; longer frames keep
    /// their most recent `fft_size` samples. Magnitudes are normalised by
    /// `fft_size`.
    pub fn analyse(&mut self, frame: &[f32]) -> Vec<f32> {
        let mut processed = vec![0.0; self.fft_size];
        let tail = &frame[frame.len().saturating_sub(self.fft_size)..];
        processed[..tail.len()].copy_from_slice(tail);

        remove_dc_offset(&mut processed[..tail.len()]);
        for (sample, w) in processed.iter_mut().zip(&self.window) {
            *sample *= w;
        }

        let mut buffer: Vec<Complex<f32>> = processed
            .into_iter()
            .map(|sample| Complex { re: sample, im: 0.0 })
            .collect();
        self.fft.process(&mut buffer);

        let scale = 1.0 / self.fft_size.max(1) as f32;
        let mut magnitudes: Vec<f32> = buffer
            .iter()
            .take(self.bin_count())
            .map(|c| c.norm() * scale)
            .collect();

        if let Some(previous) = &self.previous {
            if self.smoothing > 0.0 && previous.len() == magnitudes.len() {
                for (current, &prev) in magnitudes.iter_mut().zip(previous) {
                    *current = self.smoothing * prev + (1.0 - self.smoothing) * *current;
                }
            }
        }
        self.previous = Some(magnitudes.clone());
        magnitudes
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
