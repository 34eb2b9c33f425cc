//! Interfaces to the audio capture collaborator.
//!
//! A [`CaptureDevice`] hands out a stream when a session starts and takes it
//! back when the session stops. While held, the stream produces spectrum
//! snapshots on demand.

use crate::error::Result;

/// One power/magnitude spectrum, bins linearly spaced from 0 Hz to Nyquist inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSnapshot {
    pub magnitudes: Vec<f32>,
    pub sample_rate: f64,
}

/// Produces a fresh spectrum of the captured signal each time it is asked.
pub trait SpectrumSource {
    fn snapshot(&mut self) -> SpectrumSnapshot;
}

/// Grants and reclaims exclusive capture streams.
pub trait CaptureDevice {
    type Stream: SpectrumSource;

    /// Opens a capture stream.
    ///
    /// # Errors
    /// * `CaptureUnavailable` if no stream can be supplied
    fn acquire(&mut self) -> Result<Self::Stream>;

    /// Gives a stream back. The default just drops it.
    fn release(&mut self, stream: Self::Stream) {
        drop(stream);
    }
}
