//! # Configuration Module
//!
//! Everything a tuner session can adjust, loadable from a JSON file. Missing
//! fields fall back to the defaults, so `{}` is a valid config.
//!
//! ```json
//! {
//!   "reference_pitch": 442.0,
//!   "window_size": 4096,
//!   "detector": { "rms_threshold": 0.01, "trim_threshold": 0.02, "correlation": "fft" },
//!   "feedback": { "max_deviation_cents": 5.0, "direction_threshold_cents": 5 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::feedback::FeedbackSettings;
use crate::pitch::DetectorSettings;
use crate::signal::DEFAULT_WINDOW_SIZE;
use crate::tuning::DEFAULT_REFERENCE_PITCH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Frequency of A4 in Hz.
    pub reference_pitch: f32,
    /// Samples per analysis window.
    pub window_size: usize,
    pub detector: DetectorSettings,
    pub feedback: FeedbackSettings,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            reference_pitch: DEFAULT_REFERENCE_PITCH,
            window_size: DEFAULT_WINDOW_SIZE,
            detector: DetectorSettings::default(),
            feedback: FeedbackSettings::default(),
        }
    }
}

impl TunerConfig {
    /// Loads and validates a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        Self::from_json(&data)
    }

    /// Parses and validates a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TunerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the values a detector or note mapper would otherwise reject later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_reference_pitch(self.reference_pitch)?;
        if self.window_size < 2 {
            return Err(invalid(
                "window_size",
                format!("need at least 2 samples, got {}", self.window_size),
            ));
        }
        non_negative("detector.rms_threshold", self.detector.rms_threshold)?;
        non_negative("detector.trim_threshold", self.detector.trim_threshold)?;

        let max = self.feedback.max_deviation_cents;
        if !max.is_finite() || max <= 0.0 {
            return Err(invalid(
                "feedback.max_deviation_cents",
                format!("must be positive, got {}", max),
            ));
        }
        if self.feedback.direction_threshold_cents < 0 {
            return Err(invalid(
                "feedback.direction_threshold_cents",
                format!("must not be negative, got {}", self.feedback.direction_threshold_cents),
            ));
        }
        Ok(())
    }
}

/// Reference pitches must be finite and strictly positive.
pub fn validate_reference_pitch(hz: f32) -> Result<f32, ConfigError> {
    if hz.is_finite() && hz > 0.0 {
        Ok(hz)
    } else {
        Err(invalid("reference_pitch", format!("must be a positive frequency, got {}", hz)))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must not be negative, got {}", value)))
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
