//! # Musical Tuning Module
//!
//! Conversions between frequencies, semitone numbers and note names in
//! 12-tone equal temperament, anchored to A4 = 440 Hz.
//!
//! ## Conventions
//! - Semitones are counted from C0 (semitone 0), so A4 is semitone 57
//! - Octaves change at C; octave = floor(semitone / 12), negative octaves allowed
//! - Note names use sharps only (C, C#, D ... B) followed by the octave (e.g. "A#4", "B-1")
//! - A cent is 1/100 of a semitone
//!
//! Frequencies that are zero, negative or non-finite are rejected with
//! [`PitchError::InvalidInput`] rather than producing NaN or -inf.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::NoteInfo;
use crate::error::{PitchError, Result};

/// Pitch-class names, starting from C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A4 reference frequency in Hz.
pub const FREQ_A4: f64 = 440.0;

/// C0 frequency in Hz, `FREQ_A4 * 2^(-4.75)`. Zero point of the semitone scale.
pub const FREQ_C0: f64 = 16.351597831287414;

/// Number of semitones in an octave.
pub const SEMITONES_PER_OCTAVE: i32 = 12;

/// Pitch-class name to index lookup used when parsing note names.
static PITCH_CLASSES: Lazy<BTreeMap<&'static str, i32>> = Lazy::new(|| {
    NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i as i32))
        .collect()
});

fn check_frequency(freq: f64) -> Result<f64> {
    if freq.is_finite() && freq > 0.0 {
        Ok(freq)
    } else {
        Err(PitchError::invalid(format!(
            "frequency must be positive and finite, got {freq}"
        )))
    }
}

/// Converts a frequency to a (fractional) semitone number relative to C0.
///
/// Round the result to get the closest integer semitone.
///
/// # Errors
/// * `InvalidInput` if `freq` is not a positive finite number
pub fn frequency_to_semitone(freq: f64) -> Result<f64> {
    let freq = check_frequency(freq)?;
    Ok(12.0 * (freq / FREQ_C0).log2())
}

/// Converts a (fractional) semitone number back to its frequency in Hz.
pub fn semitone_to_frequency(semitone: f64) -> f64 {
    FREQ_C0 * 2.0_f64.powf(semitone / 12.0)
}

/// Returns the note name of an integer semitone, e.g. `57 -> "A4"`, `-1 -> "B-1"`.
pub fn semitone_to_note_name(semitone: i32) -> String {
    let pitch_class = semitone.rem_euclid(SEMITONES_PER_OCTAVE) as usize;
    let octave = semitone.div_euclid(SEMITONES_PER_OCTAVE);
    format!("{}{}", NOTE_NAMES[pitch_class], octave)
}

/// Parses a note name such as `"A4"`, `"c#3"` or `"B-1"` into its semitone number.
///
/// The pitch-class letter is case-insensitive and may be followed by `#`.
/// The octave is one or more digits, optionally preceded by `-`.
///
/// # Errors
/// * `InvalidInput` if the string does not match the pattern or names a
///   pitch class outside the sharps-only table (e.g. `"E#4"`)
pub fn note_name_to_semitone(name: &str) -> Result<i32> {
    let malformed = || PitchError::invalid(format!("malformed note name {name:?}"));

    let letter = match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
        _ => return Err(malformed()),
    };
    let rest = &name[1..];
    let (sharp, octave_str) = match rest.strip_prefix('#') {
        Some(octave_str) => (true, octave_str),
        None => (false, rest),
    };

    let digits = octave_str.strip_prefix('-').unwrap_or(octave_str);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let octave: i32 = octave_str.parse().map_err(|_| malformed())?;

    let mut pitch_class = String::with_capacity(2);
    pitch_class.push(letter);
    if sharp {
        pitch_class.push('#');
    }
    let index = *PITCH_CLASSES.get(pitch_class.as_str()).ok_or_else(|| {
        PitchError::invalid(format!("unrecognized pitch class {pitch_class:?} in {name:?}"))
    })?;

    octave
        .checked_mul(SEMITONES_PER_OCTAVE)
        .and_then(|base| base.checked_add(index))
        .ok_or_else(malformed)
}

/// Returns the equal-temperament frequency of a named note, e.g. `"A4" -> 440.0`.
pub fn note_name_to_frequency(name: &str) -> Result<f64> {
    note_name_to_semitone(name).map(|s| semitone_to_frequency(s as f64))
}

/// Rounds a fractional semitone to the nearest integer semitone, halves away
/// from zero (`57.5 -> 58`, `-0.5 -> -1`).
pub fn nearest_semitone(semitone: f64) -> f64 {
    semitone.round()
}

/// Returns information about the note closest to `freq`.
///
/// The nearest semitone is chosen with [`nearest_semitone`], i.e. a frequency exactly
/// halfway between two notes goes to the one further from C0 (half away from
/// zero). For ordinary positive semitones the deviation therefore lies in
/// `[-50, +50)` cents.
///
/// `frequency` and `cent_fluctuation` are left unset.
pub fn frequency_to_note(freq: f64) -> Result<NoteInfo> {
    let semitone = frequency_to_semitone(freq)?;
    let nearest = nearest_semitone(semitone);
    Ok(NoteInfo {
        note: semitone_to_note_name(nearest as i32),
        note_frequency: semitone_to_frequency(nearest),
        cent_deviation: 100.0 * (semitone - nearest),
        frequency: None,
        cent_fluctuation: None,
    })
}

/// Deviation of `freq` from `reference` in cents.
///
/// - 100 cents = 1 semitone, 1200 cents = 1 octave
/// - Positive values are sharp, negative values flat
pub fn cents_between(freq: f64, reference: f64) -> Result<f64> {
    let freq = check_frequency(freq)?;
    let reference = check_frequency(reference)?;
    Ok(1200.0 * (freq / reference).log2())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn c0_matches_a4_reference() {
        assert!((FREQ_C0 - FREQ_A4 * 2.0_f64.powf(-4.75)).abs() < 1e-12);
    }

    #[test]
    fn reference_semitones() {
        assert!(frequency_to_semitone(FREQ_C0).unwrap().abs() < EPS);
        assert!((frequency_to_semitone(FREQ_A4).unwrap() - 57.0).abs() < EPS);
    }

    #[test]
    fn integer_semitones_round_trip_through_frequency() {
        for s in -48..=120 {
            let freq = semitone_to_frequency(s as f64);
            assert_eq!(frequency_to_semitone(freq).unwrap().round() as i32, s);
        }
    }

    #[test]
    fn note_names_round_trip_including_negative_octaves() {
        for s in -24..=96 {
            let name = semitone_to_note_name(s);
            assert_eq!(note_name_to_semitone(&name).unwrap(), s, "{name}");
        }
    }

    #[test]
    fn note_names_use_true_modulo() {
        assert_eq!(semitone_to_note_name(0), "C0");
        assert_eq!(semitone_to_note_name(57), "A4");
        assert_eq!(semitone_to_note_name(-1), "B-1");
        assert_eq!(semitone_to_note_name(-12), "C-1");
        assert_eq!(semitone_to_note_name(-13), "B-2");
        assert_eq!(semitone_to_note_name(22), "A#1");
    }

    #[test]
    fn parses_case_insensitive_and_multi_digit_octaves() {
        assert_eq!(note_name_to_semitone("a4").unwrap(), 57);
        assert_eq!(note_name_to_semitone("c#3").unwrap(), 37);
        assert_eq!(note_name_to_semitone("C10").unwrap(), 120);
        assert_eq!(note_name_to_semitone("G#-1").unwrap(), -4);
    }

    #[test]
    fn rejects_malformed_note_names() {
        for bad in ["", "4", "H4", "E#4", "A", "A#", "A-", "Ab4", "A4x", " A4", "A+4", "#4"] {
            assert!(
                matches!(note_name_to_semitone(bad), Err(PitchError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn note_name_to_frequency_hits_a440() {
        assert!((note_name_to_frequency("A4").unwrap() - 440.0).abs() < EPS);
        assert!((note_name_to_frequency("A5").unwrap() - 880.0).abs() < EPS);
    }

    #[test]
    fn a440_maps_to_a4() {
        let info = frequency_to_note(440.0).unwrap();
        assert_eq!(info.note, "A4");
        assert!((info.note_frequency - 440.0).abs() < EPS);
        assert!(info.cent_deviation.abs() < 1e-6);
        assert!(info.frequency.is_none());
        assert!(info.cent_fluctuation.is_none());
    }

    #[test]
    fn deviation_is_signed_cents() {
        let sharp = semitone_to_frequency(57.25);
        let info = frequency_to_note(sharp).unwrap();
        assert_eq!(info.note, "A4");
        assert!((info.cent_deviation - 25.0).abs() < 1e-6);

        let flat = semitone_to_frequency(56.6);
        let info = frequency_to_note(flat).unwrap();
        assert_eq!(info.note, "A4");
        assert!((info.cent_deviation + 40.0).abs() < 1e-6);
    }

    #[test]
    fn halfway_rounds_away_from_zero() {
        assert_eq!(nearest_semitone(57.5), 58.0);
        assert_eq!(nearest_semitone(56.5), 57.0);
        assert_eq!(nearest_semitone(57.49), 57.0);
        assert_eq!(nearest_semitone(-0.5), -1.0);
        assert_eq!(nearest_semitone(-12.5), -13.0);
        assert_eq!(nearest_semitone(-0.49), 0.0);
    }

    #[test]
    fn rejects_invalid_frequencies() {
        for bad in [0.0, -440.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(frequency_to_semitone(bad), Err(PitchError::InvalidInput(_))));
            assert!(matches!(frequency_to_note(bad), Err(PitchError::InvalidInput(_))));
        }
    }

    #[test]
    fn cents_between_octave_and_semitone() {
        assert!((cents_between(880.0, 440.0).unwrap() - 1200.0).abs() < EPS);
        let up = semitone_to_frequency(58.0);
        assert!((cents_between(up, 440.0).unwrap() - 100.0).abs() < 1e-6);
        assert!(cents_between(440.0, 0.0).is_err());
    }
}
