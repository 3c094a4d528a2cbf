//! # Audio Capture Module
//!
//! Real-time audio capture using CPAL (Cross-Platform Audio Library).
//! Samples from the default input device are downmixed to mono, cut into
//! fixed-size analysis windows and streamed to the analysis thread.
//!
//! ## Features
//! - Automatic input device selection
//! - Sample rate as close to 44.1 kHz as the device allows
//! - Multichannel input downmixed to mono
//! - Frames dropped, not queued, when the analysis thread falls behind

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use tracing::{error, info};

/// Sample rate requested from the device when it supports it.
const TARGET_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel for complete analysis windows
/// * `window_size` - Samples per window
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate
/// * `Err(e)` - No device, no f32 input format, or the stream failed to start
pub fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    window_size: usize,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(device = %device.name()?, "using audio input device");

    let configs = device
        .supported_input_configs()
        .context("querying supported input configs")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    info!(sample_rate, channels, window_size, "selected input format");

    let err_fn = |err| error!("audio stream error: {}", err);

    let mut framer = Framer::new(window_size, channels);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for window in framer.push(data) {
                    // A full channel means analysis is behind; skip this window.
                    let _ = sender.try_send(window);
                }
            },
            err_fn,
            None,
        )
        .context("building input stream")?;

    stream.play().context("starting input stream")?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input configuration whose rate range comes closest to
/// `target_rate`, preferring fewer channels on ties.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (distance, c.channels())
        })
}

/// Accumulates interleaved input into mono windows of a fixed size.
#[derive(Debug)]
pub struct Framer {
    window_size: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl Framer {
    pub fn new(window_size: usize, channels: usize) -> Self {
        Self {
            window_size,
            channels: channels.max(1),
            pending: Vec::with_capacity(window_size * 2),
        }
    }

    /// Appends one callback's worth of interleaved samples and returns every
    /// window completed by it.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        let channels = self.channels;
        self.pending.extend(
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
        );

        let mut windows = Vec::new();
        while self.pending.len() >= self.window_size {
            windows.push(self.pending.drain(..self.window_size).collect());
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_input_is_split_into_windows() {
        let mut framer = Framer::new(4, 1);
        assert!(framer.push(&[0.1, 0.2, 0.3]).is_empty());

        let windows = framer.push(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);
        assert_eq!(windows, vec![vec![0.1, 0.2, 0.3, 0.4], vec![0.5, 0.6, 0.7, 0.8]]);

        let windows = framer.push(&[1.0, 1.0, 1.0]);
        assert_eq!(windows, vec![vec![0.9, 1.0, 1.0, 1.0]]);
    }

    #[test]
    fn stereo_input_is_downmixed() {
        let mut framer = Framer::new(2, 2);
        let windows = framer.push(&[0.5, -0.5, 1.0, 0.0]);
        assert_eq!(windows, vec![vec![0.0, 0.5]]);
    }

    #[test]
    fn zero_channels_is_treated_as_mono() {
        let mut framer = Framer::new(2, 0);
        assert_eq!(framer.push(&[0.25, 0.75]), vec![vec![0.25, 0.75]]);
    }
}
