//! # Sampling Module
//!
//! Turns a series of instantaneous frequency readings into one stable note
//! estimate, and computes when those readings should be taken.

use serde::{Deserialize, Serialize};

use crate::NoteInfo;
use crate::error::{PitchError, Result};
use crate::tuning;

/// Options for a timed multi-sample probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeOptions {
    /// Target number of readings. Fewer may be taken if the window runs out.
    pub num_samples: usize,
    /// Fraction of the probe window actually sampled, centred in it.
    ///
    /// An explicit `0.0` is taken literally: sampling starts at the middle of
    /// the window. Only a missing field falls back to the default.
    pub sub_interval: f64,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            num_samples: 5,
            sub_interval: 0.9,
        }
    }
}

impl ProbeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(PitchError::invalid("num_samples must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.sub_interval) {
            return Err(PitchError::invalid(format!(
                "sub_interval must be within [0, 1], got {}",
                self.sub_interval
            )));
        }
        Ok(())
    }
}

/// Reading schedule for one probe over `[from, to]` (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbePlan {
    /// Timestamp of the first reading.
    pub start: f64,
    /// End of the probe window; no reading is scheduled once it has passed.
    pub end: f64,
    /// Delay between consecutive readings.
    pub time_step: f64,
    /// Maximum number of readings.
    pub num_samples: usize,
}

impl ProbePlan {
    /// Builds the schedule.
    ///
    /// Sampling is confined to `[from + offset, to - offset]` with
    /// `offset = 0.5 * (1 - sub_interval) * (to - from)`, while the step
    /// between readings is `(to - from) / (num_samples - 1)`.
    ///
    /// An empty or inverted window (`to <= from`) or `num_samples == 1`
    /// degrades to a single reading taken at `from + offset` (or `from` for an
    /// inverted window).
    pub fn new(from: f64, to: f64, options: &ProbeOptions) -> Result<Self> {
        options.validate()?;
        if !from.is_finite() || !to.is_finite() {
            return Err(PitchError::invalid(format!(
                "probe window must be finite, got [{from}, {to}]"
            )));
        }

        let span = to - from;
        if span <= 0.0 {
            return Ok(Self {
                start: from,
                end: to,
                time_step: 0.0,
                num_samples: 1,
            });
        }

        let offset = 0.5 * (1.0 - options.sub_interval) * span;
        let time_step = if options.num_samples > 1 {
            span / (options.num_samples - 1) as f64
        } else {
            0.0
        };
        Ok(Self {
            start: from + offset,
            end: to,
            time_step,
            num_samples: options.num_samples,
        })
    }
}

/// Averages `frequencies` and reports the note of the mean.
///
/// `frequency` is the arithmetic mean μ. The spread σ is the population
/// standard deviation from single-pass sums (`E[f²] − μ²`, clamped at 0),
/// reported as `cent_fluctuation = 100 * (semitone(μ + σ) − semitone(μ))`.
///
/// # Errors
/// * `InvalidInput` if `frequencies` is empty or the mean is not a positive
///   finite frequency (e.g. every reading was 0 Hz)
pub fn aggregate(frequencies: &[f64]) -> Result<NoteInfo> {
    if frequencies.is_empty() {
        return Err(PitchError::invalid("cannot aggregate zero readings"));
    }

    let (sum, sum_sq) = frequencies
        .iter()
        .fold((0.0, 0.0), |(s, s2), &f| (s + f, s2 + f * f));
    let n = frequencies.len() as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    let std_dev = variance.sqrt();

    let mut info = tuning::frequency_to_note(mean)?;
    info.frequency = Some(mean);

    let s1 = tuning::frequency_to_semitone(mean)?;
    let s2 = tuning::frequency_to_semitone(mean + std_dev)?;
    info.cent_fluctuation = Some(100.0 * (s2 - s1));
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_readings_have_no_fluctuation() {
        let info = aggregate(&[440.0, 440.0, 440.0]).unwrap();
        assert_eq!(info.note, "A4");
        assert_eq!(info.frequency, Some(440.0));
        assert_eq!(info.cent_fluctuation, Some(0.0));
    }

    #[test]
    fn single_reading() {
        let info = aggregate(&[261.63]).unwrap();
        assert_eq!(info.note, "C4");
        assert_eq!(info.frequency, Some(261.63));
        assert_eq!(info.cent_fluctuation, Some(0.0));
    }

    #[test]
    fn symmetric_spread() {
        let info = aggregate(&[435.0, 445.0]).unwrap();
        let mean = info.frequency.unwrap();
        assert!((mean - 440.0).abs() < 1e-9);
        // σ = 5 Hz
        let expected = 1200.0 * (445.0_f64 / 440.0).log2();
        let fluctuation = info.cent_fluctuation.unwrap();
        assert!(fluctuation > 0.0);
        assert!((fluctuation - expected).abs() < 1e-6, "{fluctuation} vs {expected}");
        assert_eq!(info.note, "A4");
    }

    #[test]
    fn fluctuation_is_never_negative() {
        let readings = [100.1, 100.1, 100.1, 100.1, 100.1, 100.1, 100.1];
        let info = aggregate(&readings).unwrap();
        let fluctuation = info.cent_fluctuation.unwrap();
        assert!(fluctuation >= 0.0 && fluctuation < 0.01);
    }

    #[test]
    fn empty_and_silent_inputs_are_rejected() {
        assert!(matches!(aggregate(&[]), Err(PitchError::InvalidInput(_))));
        assert!(matches!(aggregate(&[0.0, 0.0]), Err(PitchError::InvalidInput(_))));
    }

    #[test]
    fn default_options() {
        let opts = ProbeOptions::default();
        assert_eq!(opts.num_samples, 5);
        assert_eq!(opts.sub_interval, 0.9);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn invalid_options() {
        let zero = ProbeOptions { num_samples: 0, ..Default::default() };
        assert!(zero.validate().is_err());
        for sub_interval in [-0.1, 1.5, f64::NAN] {
            let opts = ProbeOptions { sub_interval, ..Default::default() };
            assert!(opts.validate().is_err(), "{sub_interval}");
        }
    }

    #[test]
    fn plan_shrinks_window_and_spaces_readings() {
        let plan = ProbePlan::new(1000.0, 2000.0, &ProbeOptions::default()).unwrap();
        assert!((plan.start - 1050.0).abs() < 1e-9);
        assert_eq!(plan.end, 2000.0);
        assert_eq!(plan.time_step, 250.0);
        assert_eq!(plan.num_samples, 5);
    }

    #[test]
    fn zero_sub_interval_starts_mid_window() {
        let options = ProbeOptions { num_samples: 5, sub_interval: 0.0 };
        assert!(options.validate().is_ok());
        let plan = ProbePlan::new(0.0, 100.0, &options).unwrap();
        assert_eq!(plan.start, 50.0);
        assert_eq!(plan.time_step, 25.0);

        let parsed: ProbeOptions = serde_json::from_str(r#"{"sub_interval": 0.0}"#).unwrap();
        assert_eq!(parsed.sub_interval, 0.0);
    }

    #[test]
    fn plan_degrades_to_single_reading() {
        let one = ProbeOptions { num_samples: 1, sub_interval: 0.5 };
        let plan = ProbePlan::new(0.0, 100.0, &one).unwrap();
        assert_eq!(plan.num_samples, 1);
        assert_eq!(plan.start, 25.0);
        assert_eq!(plan.time_step, 0.0);

        let inverted = ProbePlan::new(500.0, 400.0, &ProbeOptions::default()).unwrap();
        assert_eq!(inverted.num_samples, 1);
        assert_eq!(inverted.start, 500.0);

        let empty = ProbePlan::new(500.0, 500.0, &ProbeOptions::default()).unwrap();
        assert_eq!(empty.num_samples, 1);
    }

    #[test]
    fn plan_rejects_non_finite_window() {
        assert!(ProbePlan::new(f64::NAN, 10.0, &ProbeOptions::default()).is_err());
        assert!(ProbePlan::new(0.0, f64::INFINITY, &ProbeOptions::default()).is_err());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: ProbeOptions = serde_json::from_str(r#"{"num_samples": 9}"#).unwrap();
        assert_eq!(opts.num_samples, 9);
        assert_eq!(opts.sub_interval, 0.9);
    }
}
