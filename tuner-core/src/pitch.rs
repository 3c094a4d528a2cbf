//! # Pitch Detection Module
//!
//! Time-domain pitch estimation by autocorrelation, tuned for a live
//! instrument tuner.
//!
//! ## Pipeline
//! 1. **Quality gate**: windows whose RMS is below [`RMS_THRESHOLD`] are silence
//! 2. **Trim**: cut the window at near-zero samples near both ends
//! 3. **Autocorrelate**: see [`crate::autocorrelation`]
//! 4. **Estimate**: `sample_rate / period`
//!
//! There is deliberately no interpolation or octave correction: the result is
//! quantized to whole-sample periods.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::autocorrelation::{find_period, Autocorrelator, CorrelationMethod};
use crate::signal::{InputError, SampleBuffer};

/// Minimum RMS for a window to count as signal.
pub const RMS_THRESHOLD: f32 = 0.01;

/// Samples quieter than this mark the trim points at either end of a window.
pub const TRIM_THRESHOLD: f32 = 0.02;

/// Why a window produced no pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoPitchReason {
    /// RMS below the quality gate.
    Silence,
    /// The trimmed window had fewer than two samples.
    DegenerateWindow,
    /// The autocorrelation never rose again after its initial decay.
    NoPeriodicPeak,
}

/// Outcome of one analysis tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PitchEstimate {
    NoPitch { reason: NoPitchReason },
    Detected { frequency_hz: f32 },
}

impl PitchEstimate {
    /// The detected frequency, if any.
    pub fn frequency(&self) -> Option<f32> {
        match *self {
            PitchEstimate::Detected { frequency_hz } => Some(frequency_hz),
            PitchEstimate::NoPitch { .. } => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PitchEstimate::Detected { .. })
    }

    fn none(reason: NoPitchReason) -> Self {
        PitchEstimate::NoPitch { reason }
    }
}

/// Tunable constants of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub rms_threshold: f32,
    pub trim_threshold: f32,
    pub correlation: CorrelationMethod,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            rms_threshold: RMS_THRESHOLD,
            trim_threshold: TRIM_THRESHOLD,
            correlation: CorrelationMethod::Direct,
        }
    }
}

/// Root-mean-square level of a window.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Returns true when the window carries enough energy to analyse.
pub fn passes_quality_gate(samples: &[f32], rms_threshold: f32) -> bool {
    rms(samples) >= rms_threshold
}

/// Trims a window at its near-zero samples.
///
/// The left bound is the first sample in the first half quieter than
/// `threshold` (0 if none). The right bound is the first such sample found
/// scanning back from the end over the same number of steps (`len - 1` if
/// none). The returned slice excludes the right bound and is empty when the
/// bounds cross.
pub fn trim_silence(samples: &[f32], threshold: f32) -> &[f32] {
    let size = samples.len();
    if size == 0 {
        return samples;
    }
    let half = size.div_ceil(2);

    let start = (0..half)
        .find(|&i| samples[i].abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| size - i)
        .find(|&i| samples[i].abs() < threshold)
        .unwrap_or(size - 1);

    if start >= end {
        return &samples[..0];
    }
    &samples[start..end]
}

/// Autocorrelation pitch detector.
///
/// Holds only settings and the correlator's plan cache; every call is
/// independent of the previous one.
pub struct PitchDetector {
    settings: DetectorSettings,
    correlator: Box<dyn Autocorrelator>,
}

impl PitchDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            correlator: settings.correlation.build(),
            settings,
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Estimates the pitch of one window.
    ///
    /// # Returns
    /// * `Ok(estimate)` - `Detected` or `NoPitch` for any well-formed window
    /// * `Err(e)` - The window breaks the buffer contract (see [`SampleBuffer::new`])
    pub fn try_detect(
        &mut self,
        samples: &[f32],
        sample_rate: f32,
    ) -> Result<PitchEstimate, InputError> {
        let buffer = SampleBuffer::new(samples, sample_rate)?;
        Ok(self.detect_buffer(buffer))
    }

    /// Estimates the pitch of one window, failing fast on a contract violation.
    ///
    /// # Panics
    /// * If `samples` is empty or has non-finite values
    /// * If `sample_rate` is not finite and positive
    pub fn detect(&mut self, samples: &[f32], sample_rate: f32) -> PitchEstimate {
        match self.try_detect(samples, sample_rate) {
            Ok(estimate) => estimate,
            Err(e) => panic!("invalid sample buffer: {}", e),
        }
    }

    fn detect_buffer(&mut self, buffer: SampleBuffer<'_>) -> PitchEstimate {
        let samples = buffer.samples();

        if !passes_quality_gate(samples, self.settings.rms_threshold) {
            trace!("window below quality gate");
            return PitchEstimate::none(NoPitchReason::Silence);
        }

        let trimmed = trim_silence(samples, self.settings.trim_threshold);
        if trimmed.len() <= 1 {
            trace!(window = samples.len(), trimmed = trimmed.len(), "degenerate trimmed window");
            return PitchEstimate::none(NoPitchReason::DegenerateWindow);
        }

        let correlation = self.correlator.autocorrelate(trimmed);
        let Some(period) = find_period(&correlation) else {
            trace!(trimmed = trimmed.len(), "no periodic peak");
            return PitchEstimate::none(NoPitchReason::NoPeriodicPeak);
        };

        let frequency_hz = buffer.sample_rate() / period as f32;
        trace!(period, frequency_hz, "pitch detected");
        PitchEstimate::Detected { frequency_hz }
    }
}

impl Default for PitchDetector {
    fn default() -> Self {
        Self::new(DetectorSettings::default())
    }
}

impl std::fmt::Debug for PitchDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PitchDetector")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Estimates the pitch of `samples` with the default settings.
///
/// # Panics
/// On a buffer-contract violation, like [`PitchDetector::detect`].
pub fn estimate_pitch(samples: &[f32], sample_rate: f32) -> PitchEstimate {
    PitchDetector::default().detect(samples, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_and_empty() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5; 16]) - 0.5).abs() < 1e-6);
        assert!((rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gate_threshold_is_inclusive_of_signal() {
        assert!(!passes_quality_gate(&[0.0; 64], RMS_THRESHOLD));
        assert!(!passes_quality_gate(&[0.005; 64], RMS_THRESHOLD));
        assert!(passes_quality_gate(&[0.02; 64], RMS_THRESHOLD));
    }

    #[test]
    fn trim_keeps_whole_window_minus_last_when_nothing_is_quiet() {
        let samples = [0.5f32; 10];
        let trimmed = trim_silence(&samples, TRIM_THRESHOLD);
        assert_eq!(trimmed.len(), 9);
    }

    #[test]
    fn trim_cuts_at_first_and_last_quiet_samples() {
        //             0    1    2    3    4    5    6    7
        let samples = [0.5, 0.5, 0.0, 0.5, 0.5, 0.5, 0.01, 0.5];
        let trimmed = trim_silence(&samples, TRIM_THRESHOLD);
        // start at index 2, end (exclusive) at index 6
        assert_eq!(trimmed, &samples[2..6]);
    }

    #[test]
    fn trim_only_searches_half_from_each_end() {
        // Quiet samples only in the middle of a window of 8 would be index 4,
        // outside the forward search of 0..4.
        let samples = [0.5, 0.5, 0.5, 0.5, 0.0, 0.5, 0.5, 0.5];
        let trimmed = trim_silence(&samples, TRIM_THRESHOLD);
        // Backward search checks 7, 6, 5 only (i = 1..4), so end stays at 7.
        assert_eq!(trimmed, &samples[0..7]);
    }

    #[test]
    fn trim_bounds_on_short_windows() {
        let samples = [0.5, 0.0, 0.5];
        // half = 2: start = 1, backward checks index 2 only -> end = 2
        assert_eq!(trim_silence(&samples, TRIM_THRESHOLD), &samples[1..2]);

        let samples = [0.9, 0.0, 0.9, 0.0, 0.9, 0.9];
        // start = 1, backward checks 5, 4 (i = 1..3) -> end = 5
        assert_eq!(trim_silence(&samples, TRIM_THRESHOLD), &samples[1..5]);
    }

    #[test]
    fn trim_of_single_sample_is_empty() {
        assert!(trim_silence(&[0.5], TRIM_THRESHOLD).is_empty());
        assert!(trim_silence(&[], TRIM_THRESHOLD).is_empty());
    }

    #[test]
    fn silence_is_no_pitch() {
        let estimate = estimate_pitch(&[0.0; 2048], 44100.0);
        assert_eq!(
            estimate,
            PitchEstimate::NoPitch {
                reason: NoPitchReason::Silence
            }
        );
        assert_eq!(estimate.frequency(), None);
        assert!(!estimate.is_detected());
    }

    #[test]
    fn loud_two_sample_window_is_degenerate() {
        // Passes the gate, but trimming leaves a single sample.
        let estimate = estimate_pitch(&[0.8, 0.8], 44100.0);
        assert_eq!(
            estimate,
            PitchEstimate::NoPitch {
                reason: NoPitchReason::DegenerateWindow
            }
        );
    }

    #[test]
    fn constant_offset_has_no_periodic_peak() {
        // A DC level correlates best with itself at lag 0 and only decays.
        let estimate = estimate_pitch(&[0.5; 256], 8000.0);
        assert_eq!(
            estimate,
            PitchEstimate::NoPitch {
                reason: NoPitchReason::NoPeriodicPeak
            }
        );
    }

    #[test]
    fn square_wave_period_is_exact() {
        // Period of 20 samples at 8 kHz is 400 Hz; zeros mark the trim points.
        let samples: Vec<f32> = (0..400)
            .map(|i| match i % 20 {
                0 | 10 => 0.0,
                n if n < 10 => 0.6,
                _ => -0.6,
            })
            .collect();
        let estimate = estimate_pitch(&samples, 8000.0);
        assert_eq!(estimate, PitchEstimate::Detected { frequency_hz: 400.0 });
    }

    #[test]
    fn try_detect_reports_contract_violations() {
        let mut detector = PitchDetector::default();
        assert_eq!(detector.try_detect(&[], 44100.0), Err(InputError::EmptyBuffer));
        assert!(detector.try_detect(&[0.1; 8], 0.0).is_err());
    }

    #[test]
    #[should_panic(expected = "invalid sample buffer")]
    fn detect_panics_on_nan_samples() {
        estimate_pitch(&[0.1, f32::NAN, 0.3], 44100.0);
    }

    #[test]
    fn custom_gate_threshold_is_honoured() {
        let settings = DetectorSettings {
            rms_threshold: 0.9,
            ..DetectorSettings::default()
        };
        let mut detector = PitchDetector::new(settings);
        let samples: Vec<f32> = (0..512)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 32.0).sin() * 0.5)
            .collect();
        assert_eq!(
            detector.detect(&samples, 8000.0),
            PitchEstimate::NoPitch {
                reason: NoPitchReason::Silence
            }
        );
        assert_eq!(detector.settings().rms_threshold, 0.9);
    }

    #[test]
    fn estimate_serializes_with_status_tag() {
        let json = serde_json::to_string(&PitchEstimate::Detected { frequency_hz: 441.0 }).unwrap();
        assert_eq!(json, r#"{"status":"detected","frequency_hz":441.0}"#);
    }
}
