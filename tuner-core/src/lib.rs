// tuner-core/src/lib.rs

//! The core logic for the autocorrelation tuner.
//! This crate is responsible for pitch estimation, note mapping
//! and the tuning feedback model. It is completely headless
//! and contains no device or terminal code.
//!
//! The two entry points are [`estimate_pitch`] and [`map_to_note`]; a
//! [`Reading`] bundles both for one analysis tick.

pub mod autocorrelation;
pub mod config;
pub mod feedback;
pub mod pitch;
pub mod signal;
pub mod tuning;

use serde::Serialize;

pub use autocorrelation::CorrelationMethod;
pub use config::{ConfigError, TunerConfig};
pub use feedback::{FeedbackSettings, TuningDirection, TuningIndicator};
pub use pitch::{estimate_pitch, DetectorSettings, NoPitchReason, PitchDetector, PitchEstimate};
pub use signal::{InputError, SampleBuffer};
pub use tuning::{map_to_note, NoteResult};

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// The pitch estimate for the frame.
    pub estimate: PitchEstimate,
    /// The nearest note, present only when a pitch was detected.
    pub note: Option<NoteResult>,
    /// Sharp/flat direction and colour, present only with a note.
    pub indicator: Option<TuningIndicator>,
}

impl Reading {
    /// Maps an estimate against the reference pitch in effect for this tick.
    pub fn new(estimate: PitchEstimate, reference_pitch: f32, settings: &FeedbackSettings) -> Self {
        let note = estimate
            .frequency()
            .map(|freq| map_to_note(freq, reference_pitch));
        let indicator = note.map(|n| feedback::indicator(n.cents, settings));
        Self {
            estimate,
            note,
            indicator,
        }
    }

    pub fn frequency(&self) -> Option<f32> {
        self.estimate.frequency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pitch_reading_has_no_note() {
        let reading = Reading::new(
            PitchEstimate::NoPitch {
                reason: NoPitchReason::Silence,
            },
            440.0,
            &FeedbackSettings::default(),
        );
        assert_eq!(reading.frequency(), None);
        assert!(reading.note.is_none());
        assert!(reading.indicator.is_none());
    }

    #[test]
    fn detected_reading_maps_note_and_indicator() {
        let reading = Reading::new(
            PitchEstimate::Detected { frequency_hz: 441.0 },
            440.0,
            &FeedbackSettings::default(),
        );
        let note = reading.note.unwrap();
        assert_eq!((note.name, note.octave, note.cents), ("A", 4, 4));
        let indicator = reading.indicator.unwrap();
        assert_eq!(indicator.direction, TuningDirection::InTune);
    }

    #[test]
    fn reading_serializes_to_json() {
        let reading = Reading::new(
            PitchEstimate::Detected { frequency_hz: 440.0 },
            440.0,
            &FeedbackSettings::default(),
        );
        let value: serde_json::Value = serde_json::to_value(reading).unwrap();
        assert_eq!(value["estimate"]["status"], "detected");
        assert_eq!(value["note"]["name"], "A");
        assert_eq!(value["note"]["cents"], 0);
        assert_eq!(value["indicator"]["direction"], "in_tune");
        assert_eq!(value["indicator"]["color"], "#00ff00");
    }
}
