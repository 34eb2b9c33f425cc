// pitch-core/src/lib.rs

//! The core logic for the pitch probe.
//! This crate is responsible for picking the dominant frequency out of a
//! spectrum, mapping frequencies to notes, and averaging timed readings into
//! a stable estimate. Audio capture is reached only through the traits in
//! [`capture`]; [`audio`] provides the microphone-backed implementation.

use serde::Serialize;

pub mod audio;
pub mod capture;
pub mod clock;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod sampling;
pub mod session;
pub mod tuning;

pub use audio::{CaptureConfig, MicrophoneCapture};
pub use capture::{CaptureDevice, SpectrumSnapshot, SpectrumSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PitchError, Result};
pub use pitch::find_dominant_frequency;
pub use sampling::{ProbeOptions, aggregate};
pub use session::{PitchSession, SessionStatus};

/// Information about the note closest to a measured frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    /// Name of the closest note, e.g. "A#4".
    pub note: String,
    /// Equal-temperament frequency of `note` in Hz.
    pub note_frequency: f64,
    /// Signed distance from `note_frequency` in cents.
    pub cent_deviation: f64,
    /// The measured (or averaged) frequency in Hz, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// One standard deviation of the readings, in cents. Only set on
    /// aggregated results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cent_fluctuation: Option<f64>,
}
