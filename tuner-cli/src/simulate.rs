//! Offline run of the tuner on a synthetic sine, for checking the pipeline
//! without an input device.

use anyhow::Result;
use std::f32::consts::TAU;
use tracing::info;
use tuner_core::{PitchDetector, Reading, TunerConfig};

use crate::display::Readout;

#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub frequency: f32,
    pub sample_rate: f32,
    pub amplitude: f32,
}

impl Tone {
    /// Window `index` of a continuous sine, phase-aligned with the previous window.
    pub fn window(&self, index: usize, window_size: usize) -> Vec<f32> {
        let start = index * window_size;
        (start..start + window_size)
            .map(|n| {
                let cycles = (n as f64 * self.frequency as f64 / self.sample_rate as f64).fract();
                self.amplitude * (TAU * cycles as f32).sin()
            })
            .collect()
    }
}

pub fn run(config: &TunerConfig, tone: Tone, frames: usize, mut readout: Readout) -> Result<()> {
    info!(
        frequency = tone.frequency,
        sample_rate = tone.sample_rate,
        frames,
        window_size = config.window_size,
        "simulating"
    );

    let mut detector = PitchDetector::new(config.detector);
    info!(settings = ?detector.settings(), "detector ready");
    for index in 0..frames {
        let window = tone.window(index, config.window_size);
        let estimate = detector.try_detect(&window, tone.sample_rate)?;
        readout.show(&Reading::new(estimate, config.reference_pitch, &config.feedback))?;
    }
    readout.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_continue_the_phase() {
        let tone = Tone {
            frequency: 441.0,
            sample_rate: 44100.0,
            amplitude: 0.5,
        };
        let joined: Vec<f32> = [tone.window(0, 150), tone.window(1, 150)].concat();
        let whole = tone.window(0, 300);
        for (a, b) in joined.iter().zip(&whole) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn simulated_windows_are_detected() {
        let tone = Tone {
            frequency: 441.0,
            sample_rate: 44100.0,
            amplitude: 0.5,
        };
        let mut detector = PitchDetector::default();
        for index in 0..3 {
            let estimate = detector.detect(&tone.window(index, 2048), tone.sample_rate);
            let freq = estimate.frequency().expect("tone should be detected");
            assert!((freq - 441.0).abs() < 5.0, "window {}: {} Hz", index, freq);
        }
    }

    #[test]
    fn zero_amplitude_is_silence() {
        let tone = Tone {
            frequency: 440.0,
            sample_rate: 48000.0,
            amplitude: 0.0,
        };
        let estimate = PitchDetector::default().detect(&tone.window(0, 1024), tone.sample_rate);
        assert!(!estimate.is_detected());
    }
}
