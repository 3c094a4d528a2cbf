//! # Musical Tuning Module
//!
//! Maps a frequency to the nearest note of 12-tone equal temperament and the
//! deviation from it in cents.
//!
//! ## Conventions
//! - The reference pitch is the frequency of A4 (440 Hz unless configured)
//! - Octaves use scientific pitch notation: C4 is middle C, octaves change at C
//! - 100 cents = 1 semitone; positive cents mean sharp, negative mean flat
//!
//! Rounding is half-up (`floor(x + 0.5)`) at both the semitone and the cent
//! step, so identical inputs always give identical results.

use serde::Serialize;
use std::fmt;

/// Concert pitch for A4.
pub const DEFAULT_REFERENCE_PITCH: f32 = 440.0;

/// Pitch-class labels starting at C.
pub const NOTE_TABLE: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A4 sits at index 9 of [`NOTE_TABLE`].
const A_OFFSET: i64 = 9;
/// Four octaves of headroom so the note index stays non-negative for audible input.
const OCTAVE_OFFSET: i64 = 12 * 4;

/// The nearest equal-tempered note to a measured frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteResult {
    /// Pitch class, one of [`NOTE_TABLE`].
    pub name: &'static str,
    /// Scientific-pitch octave (A4 = 4).
    pub octave: i32,
    /// Deviation from the note in cents, in (-50, 50].
    pub cents: i32,
    /// Equal-tempered frequency of the note in Hz.
    pub target_frequency: f32,
}

impl fmt::Display for NoteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {:+} cents", self.name, self.octave, self.cents)
    }
}

fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Maps `frequency_hz` to the nearest note relative to `reference_pitch` (A4).
///
/// A result that rounds to exactly -50 cents is reported as +50 cents above
/// the semitone below, so `cents` always lies in (-50, 50].
///
/// # Panics
/// If either argument is not finite and strictly positive. Callers only map
/// detected frequencies, so this indicates a bug upstream.
pub fn map_to_note(frequency_hz: f32, reference_pitch: f32) -> NoteResult {
    assert!(
        frequency_hz.is_finite() && frequency_hz > 0.0,
        "frequency must be finite and positive, got {}",
        frequency_hz
    );
    assert!(
        reference_pitch.is_finite() && reference_pitch > 0.0,
        "reference pitch must be finite and positive, got {}",
        reference_pitch
    );

    let semitones = 12.0 * (frequency_hz as f64 / reference_pitch as f64).log2();
    let mut nearest = round_half_up(semitones);
    let mut cents = round_half_up((semitones - nearest) * 100.0) as i32;
    if cents == -50 {
        nearest -= 1.0;
        cents = 50;
    }

    let nearest = nearest as i64;
    let note_index = nearest + A_OFFSET + OCTAVE_OFFSET;

    NoteResult {
        name: NOTE_TABLE[note_index.rem_euclid(12) as usize],
        octave: note_index.div_euclid(12) as i32,
        cents,
        target_frequency: note_frequency(nearest as i32, reference_pitch),
    }
}

/// Equal-tempered frequency `semitones_from_a4` semitones away from A4.
pub fn note_frequency(semitones_from_a4: i32, reference_pitch: f32) -> f32 {
    (reference_pitch as f64 * 2.0_f64.powf(semitones_from_a4 as f64 / 12.0)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_a_is_exact() {
        let note = map_to_note(440.0, 440.0);
        assert_eq!(note.name, "A");
        assert_eq!(note.octave, 4);
        assert_eq!(note.cents, 0);
        assert!((note.target_frequency - 440.0).abs() < 1e-3);
    }

    #[test]
    fn a440_against_a432() {
        // 12 * log2(440 / 432) ~= 0.3176 semitones
        let note = map_to_note(440.0, 432.0);
        assert_eq!(note.name, "A");
        assert_eq!(note.cents, 32);
        assert!((note.target_frequency - 432.0).abs() < 1e-3);
    }

    #[test]
    fn exact_semitones_have_zero_cents() {
        for n in -30..=30 {
            let freq = note_frequency(n, 440.0);
            let note = map_to_note(freq, 440.0);
            assert_eq!(note.cents, 0, "n = {}", n);
            assert_eq!(
                note.name,
                NOTE_TABLE[(n + 9).rem_euclid(12) as usize],
                "n = {}",
                n
            );
        }
    }

    #[test]
    fn octaves_change_at_c() {
        assert_eq!(map_to_note(261.63, 440.0).to_string(), "C4 +0 cents");
        assert_eq!(map_to_note(246.94, 440.0).to_string(), "B3 +0 cents");
        assert_eq!(map_to_note(27.5, 440.0).octave, 0);
        assert_eq!(map_to_note(4186.01, 440.0).octave, 8);
    }

    #[test]
    fn cents_are_signed() {
        // 1% sharp and flat of A4.
        let sharp = map_to_note(444.4, 440.0);
        let flat = map_to_note(435.6, 440.0);
        assert_eq!((sharp.name, sharp.cents), ("A", 17));
        assert_eq!((flat.name, flat.cents), ("A", -17));
    }

    #[test]
    fn quarter_tone_reports_plus_fifty() {
        let freq = (440.0_f64 * 2.0_f64.powf(0.5 / 12.0)) as f32;
        let note = map_to_note(freq, 440.0);
        assert_eq!(note.name, "A");
        assert_eq!(note.cents, 50);
    }

    #[test]
    fn cents_stay_in_half_open_range() {
        let mut freq = 100.0_f32;
        while freq < 2000.0 {
            let cents = map_to_note(freq, 440.0).cents;
            assert!(cents > -50 && cents <= 50, "{} Hz -> {} cents", freq, cents);
            freq *= 1.0007;
        }
    }

    #[test]
    fn reference_change_moves_the_result() {
        let at_440 = map_to_note(442.0, 440.0);
        let at_442 = map_to_note(442.0, 442.0);
        assert_eq!(at_440.cents, 8);
        assert_eq!(at_442.cents, 0);
        assert_eq!(at_440.name, at_442.name);

        // A4 at 415 Hz (baroque pitch) turns a 440 Hz tone into A#4.
        let baroque = map_to_note(440.0, 415.0);
        assert_eq!(baroque.name, "A#");
        assert_eq!(baroque.cents, 1);
    }

    #[test]
    fn mapping_is_repeatable() {
        assert_eq!(map_to_note(311.3, 440.0), map_to_note(311.3, 440.0));
    }

    #[test]
    fn very_low_frequencies_wrap_correctly() {
        // Far below the four-octave headroom the index goes negative.
        let note = map_to_note(8.1758, 440.0); // C-1
        assert_eq!(note.name, "C");
        assert_eq!(note.octave, -1);
    }

    #[test]
    #[should_panic(expected = "frequency must be finite and positive")]
    fn zero_frequency_is_a_bug() {
        map_to_note(0.0, 440.0);
    }
}
