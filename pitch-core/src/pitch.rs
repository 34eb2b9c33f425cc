//! # Pitch Detection Module
//!
//! Picks the dominant frequency out of a power (or magnitude) spectrum.
//!
//! The spectrum is assumed to hold linearly spaced bins from 0 Hz up to and
//! including the Nyquist frequency, so bin `i` of `n` sits at
//! `0.5 * sample_rate * i / (n - 1)`. Values may be linear or log-scaled
//! (dB); only their ordering matters.

/// Returns the frequency in Hz of the strongest bin in `spectrum`.
///
/// The scan keeps the first index holding the maximum: a later bin only wins
/// if it is strictly greater, so ties resolve to the lowest frequency. NaN
/// bins never win.
///
/// There is no error case. A spectrum without any bin above `-inf` (all-zero
/// dB data, all NaN) resolves to bin 0 and returns 0 Hz, which callers treat
/// as "no detectable pitch". Spectra with fewer than two bins cannot be
/// mapped to frequencies and also return 0 Hz.
///
/// # Arguments
/// * `spectrum` - Spectrum values, bin 0 = 0 Hz, last bin = Nyquist
/// * `sample_rate` - Sample rate in Hz
pub fn find_dominant_frequency(spectrum: &[f32], sample_rate: f64) -> f64 {
    if spectrum.len() < 2 {
        return 0.0;
    }

    let mut max_index = 0;
    let mut max_value = f32::NEG_INFINITY;
    for (i, &value) in spectrum.iter().enumerate() {
        if value > max_value {
            max_value = value;
            max_index = i;
        }
    }

    bin_to_frequency(max_index, spectrum.len(), sample_rate)
}

/// Centre frequency of bin `index` in a spectrum of `bin_count` bins spanning 0..=Nyquist.
pub fn bin_to_frequency(index: usize, bin_count: usize, sample_rate: f64) -> f64 {
    if bin_count < 2 {
        return 0.0;
    }
    0.5 * sample_rate * index as f64 / (bin_count - 1) as f64
}
