//! Terminal readout for tuner readings.

use anyhow::Result;
use std::io::{self, Write};
use tuner_core::feedback::{Rgb, NEUTRAL_COLOR};
use tuner_core::{Reading, TuningDirection};

/// Formats one reading as a fixed-width status line.
///
/// With `color` set the indicator dot is drawn in the feedback colour using
/// 24-bit ANSI escapes.
pub fn format_reading(reading: &Reading, color: bool) -> String {
    let fields = (reading.frequency(), reading.note, reading.indicator);
    let (freq, note, cents, direction, rgb) = match fields {
        (Some(freq), Some(note), Some(indicator)) => (
            format!("{:8.2} Hz", freq),
            format!("{}{}", note.name, note.octave),
            format!("{:+3} cents", note.cents),
            match indicator.direction {
                TuningDirection::InTune => "in tune",
                TuningDirection::TooHigh => "v tune down",
                TuningDirection::TooLow => "^ tune up",
            },
            indicator.color,
        ),
        _ => (
            format!("{:>8} Hz", "-"),
            "-".to_string(),
            format!("{:>3} cents", "-"),
            "",
            NEUTRAL_COLOR,
        ),
    };

    format!("{} {} | {:<4} | {} | {}", dot(rgb, color), freq, note, cents, direction)
}

fn dot(rgb: Rgb, color: bool) -> String {
    if color {
        format!("\x1b[38;2;{};{};{}m●\x1b[0m", rgb.r, rgb.g, rgb.b)
    } else {
        "●".to_string()
    }
}

/// Writes readings to stdout, either as a single live status line or as one
/// JSON object per line.
#[derive(Debug)]
pub struct Readout {
    json: bool,
    live: bool,
}

impl Readout {
    /// `live` redraws one line in place; otherwise each reading gets its own line.
    pub fn new(json: bool, live: bool) -> Self {
        Self { json, live }
    }

    pub fn show(&mut self, reading: &Reading) -> Result<()> {
        let mut stdout = io::stdout().lock();
        if self.json {
            writeln!(stdout, "{}", serde_json::to_string(reading)?)?;
        } else if self.live {
            write!(stdout, "\r{:<60}", format_reading(reading, true))?;
        } else {
            writeln!(stdout, "{}", format_reading(reading, false))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Ends a live status line so later output starts on a fresh line.
    pub fn finish(&mut self) -> Result<()> {
        if self.live && !self.json {
            writeln!(io::stdout())?;
        }
        Ok(())
    }
}
