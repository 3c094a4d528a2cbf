//! # Tuning Feedback Module
//!
//! Turns a cent deviation into what a tuner display shows: which way to turn
//! the peg, and a colour that fades from green (in tune) to red (off by the
//! configured maximum or more).

use serde::{Deserialize, Serialize, Serializer};

/// Colour shown while no pitch is detected (#888888).
pub const NEUTRAL_COLOR: Rgb = Rgb {
    r: 0x88,
    g: 0x88,
    b: 0x88,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Deviation (cents) at which the colour is fully "out of tune".
    pub max_deviation_cents: f32,
    /// Deviation (cents) beyond which the sharp/flat arrows light up.
    pub direction_threshold_cents: i32,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            max_deviation_cents: 5.0,
            direction_threshold_cents: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningDirection {
    InTune,
    /// Sharp: tune down.
    TooHigh,
    /// Flat: tune up.
    TooLow,
}

/// Serializes as a `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TuningIndicator {
    pub direction: TuningDirection,
    /// 0.0 when exactly in tune, 1.0 at or beyond the maximum deviation.
    pub off_ratio: f32,
    pub color: Rgb,
}

/// Builds the indicator for a cent deviation.
pub fn indicator(cents: i32, settings: &FeedbackSettings) -> TuningIndicator {
    let direction = if cents > settings.direction_threshold_cents {
        TuningDirection::TooHigh
    } else if cents < -settings.direction_threshold_cents {
        TuningDirection::TooLow
    } else {
        TuningDirection::InTune
    };

    let off_ratio = (cents.unsigned_abs() as f32 / settings.max_deviation_cents).min(1.0);
    let color = Rgb {
        r: (255.0 * off_ratio).floor() as u8,
        g: (255.0 * (1.0 - off_ratio)).floor() as u8,
        b: 0,
    };

    TuningIndicator {
        direction,
        off_ratio,
        color,
    }
}
