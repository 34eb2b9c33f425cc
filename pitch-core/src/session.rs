//! # Pitch Session Module
//!
//! A [`PitchSession`] owns a capture stream between `start()` and `stop()`
//! and turns spectrum snapshots into frequencies and notes.
//!
//! ## Lifecycle
//! - **Idle**: nothing held; measurements fail with `NotStarted`
//! - **Active**: a capture stream is held; measurements pull fresh snapshots
//! - **Closed**: the stream was released; `start()` may re-acquire one
//!
//! Every operation takes `&mut self`, so a session runs at most one
//! measurement at a time and cannot be stopped while a probe is in flight.

use log::{debug, info, trace, warn};

use crate::NoteInfo;
use crate::capture::{CaptureDevice, SpectrumSource};
use crate::clock::{Clock, SystemClock};
use crate::error::{PitchError, Result};
use crate::pitch;
use crate::sampling::{self, ProbeOptions, ProbePlan};
use crate::tuning;

/// Readings reserved up front by a probe.
const MAX_RESERVED_READINGS: usize = 64;

/// Externally visible lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Active,
    Closed,
}

enum SessionState<S> {
    Idle,
    Active(S),
    Closed,
}

/// Stateful pitch analyser bound to one capture device and one clock.
pub struct PitchSession<D: CaptureDevice, C: Clock = SystemClock> {
    device: D,
    clock: C,
    state: SessionState<D::Stream>,
}

impl<D: CaptureDevice> PitchSession<D, SystemClock> {
    /// Creates an idle session timed by the system clock. Nothing is
    /// acquired until [`start`](Self::start).
    pub fn new(device: D) -> Self {
        Self::with_clock(device, SystemClock::new())
    }
}

impl<D: CaptureDevice, C: Clock> PitchSession<D, C> {
    pub fn with_clock(device: D, clock: C) -> Self {
        Self {
            device,
            clock,
            state: SessionState::Idle,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::Active(_) => SessionStatus::Active,
            SessionState::Closed => SessionStatus::Closed,
        }
    }

    /// Current time on the session clock, in milliseconds. Probe windows
    /// are expressed on this clock.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Acquires a capture stream.
    ///
    /// A no-op when already active. A closed session re-acquires a new stream.
    ///
    /// # Errors
    /// * `CaptureUnavailable` if the device cannot supply a stream; the
    ///   session keeps its previous state and `start()` may be retried
    pub fn start(&mut self) -> Result<()> {
        if let SessionState::Active(_) = self.state {
            return Ok(());
        }
        match self.device.acquire() {
            Ok(stream) => {
                self.state = SessionState::Active(stream);
                info!("Pitch session started");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start pitch session: {}", e);
                Err(e)
            }
        }
    }

    /// Releases the capture stream, if any, and closes the session. Idempotent.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Active(stream) => {
                self.device.release(stream);
                info!("Pitch session stopped");
            }
            SessionState::Idle => debug!("Pitch session closed before starting"),
            SessionState::Closed => {}
        }
    }

    /// Measures the current dominant frequency in Hz. 0 Hz means no
    /// detectable pitch.
    ///
    /// # Errors
    /// * `NotStarted` unless the session is active
    pub fn get_frequency(&mut self) -> Result<f64> {
        match &mut self.state {
            SessionState::Active(stream) => Ok(read_frequency(stream)),
            _ => Err(PitchError::NotStarted),
        }
    }

    /// Measures the current dominant frequency and returns its closest note.
    ///
    /// # Errors
    /// * `NotStarted` unless the session is active
    /// * `InvalidInput` if no pitch was detected (0 Hz reading)
    pub fn get_note(&mut self) -> Result<NoteInfo> {
        let frequency = self.get_frequency()?;
        let mut info = tuning::frequency_to_note(frequency)?;
        info.frequency = Some(frequency);
        Ok(info)
    }

    /// Takes a series of readings spread over `[from, to]` (session clock,
    /// milliseconds) and returns their average note with `cent_fluctuation`.
    ///
    /// Waits until the sampling window opens, then alternates reading and
    /// waiting `time_step`. Stops early once `to` has passed, so fewer than
    /// `num_samples` readings may be taken; at least one always is.
    ///
    /// # Errors
    /// * `NotStarted` unless the session is active
    /// * `InvalidInput` for bad options or window bounds, or if the readings
    ///   average to no detectable pitch
    pub fn probe_note(&mut self, from: f64, to: f64, options: &ProbeOptions) -> Result<NoteInfo> {
        let Self { clock, state, .. } = self;
        let stream = match state {
            SessionState::Active(stream) => stream,
            _ => return Err(PitchError::NotStarted),
        };
        let plan = ProbePlan::new(from, to, options)?;
        debug!(
            "Probing [{:.1}, {:.1}] ms: up to {} readings from {:.1} ms every {:.1} ms",
            from, to, plan.num_samples, plan.start, plan.time_step
        );

        if clock.now() < plan.start {
            clock.wait_until(plan.start);
        }

        // The target count is only an upper bound; the window usually ends first
        let mut readings = Vec::with_capacity(plan.num_samples.min(MAX_RESERVED_READINGS));
        for i in 0..plan.num_samples {
            let frequency = read_frequency(stream);
            trace!("Reading {} at {:.1} ms: {:.2} Hz", i, clock.now(), frequency);
            readings.push(frequency);

            if i + 1 == plan.num_samples || clock.now() > plan.end {
                break;
            }
            clock.wait_until(clock.now() + plan.time_step);
        }

        if readings.len() < plan.num_samples {
            debug!("Probe window closed after {} of {} readings", readings.len(), plan.num_samples);
        }
        sampling::aggregate(&readings)
    }
}

impl<D: CaptureDevice, C: Clock> Drop for PitchSession<D, C> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_frequency<S: SpectrumSource>(stream: &mut S) -> f64 {
    let snapshot = stream.snapshot();
    pitch::find_dominant_frequency(&snapshot.magnitudes, snapshot.sample_rate)
}
