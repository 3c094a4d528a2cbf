//! # Signal Module
//!
//! Validated input windows for the pitch pipeline.
//!
//! The pipeline itself never fails on a well-formed window: silence, noise and
//! aperiodic input all degrade to "no pitch". What it does reject is a window
//! that breaks the caller's contract (no samples, non-finite samples, or a
//! nonsensical sample rate). Those are reported as [`InputError`].

use thiserror::Error;

/// Analysis window size used when nothing else is configured.
///
/// 2048 samples is ~46ms at 44.1 kHz, which covers several periods of the
/// lowest string on most instruments.
pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// A violation of the sample-buffer contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("sample buffer is empty")]
    EmptyBuffer,

    #[error("sample {index} is not finite ({value})")]
    NonFiniteSample { index: usize, value: f32 },

    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(f32),
}

/// A borrowed block of audio samples together with its sample rate.
///
/// Construction checks the contract once so later stages can index and divide
/// without re-checking.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    samples: &'a [f32],
    sample_rate: f32,
}

impl<'a> SampleBuffer<'a> {
    /// Validates `samples` and `sample_rate`.
    ///
    /// Finite samples outside [-1.0, 1.0] are accepted as-is; only NaN and
    /// infinities are rejected.
    pub fn new(samples: &'a [f32], sample_rate: f32) -> Result<Self, InputError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(InputError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(InputError::EmptyBuffer);
        }
        if let Some((index, &value)) = samples.iter().enumerate().find(|(_, s)| !s.is_finite()) {
            return Err(InputError::NonFiniteSample { index, value });
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed buffer; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
