//! # Error Module
//!
//! A single error type covers every failure the core can report. No error is
//! retried internally; recovery is always left to the caller.

use thiserror::Error;

/// Errors surfaced by note mapping, aggregation and the pitch session.
#[derive(Error, Debug)]
pub enum PitchError {
    /// Non-finite or non-positive frequency, malformed note name, or
    /// out-of-range probe options.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The capture collaborator could not supply a stream
    /// (no device, permission denied, unsupported format...).
    #[error("Audio capture unavailable: {0}")]
    CaptureUnavailable(#[source] anyhow::Error),

    /// A measurement was requested while no capture resource is held.
    #[error("Pitch session has not started yet")]
    NotStarted,
}

impl PitchError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PitchError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PitchError>;
