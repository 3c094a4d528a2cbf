//! # Autocorrelation Module
//!
//! Computes the autocorrelation of an analysis window and picks the lag of its
//! first dominant peak, which is the fundamental period in samples.
//!
//! ## Implementations
//! - [`DirectAutocorrelator`]: the plain O(M²) sum. This is the default.
//! - [`FftAutocorrelator`]: Wiener–Khinchin through RustFFT, O(M log M).
//!   Worth switching to for windows much larger than 2048 samples.
//!
//! Both produce the same unnormalized function
//! `c[i] = Σ_{j=0}^{M-1-i} x[j]·x[j+i]` for `i = 0..M`, so peak picking is
//! shared.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Selects which [`Autocorrelator`] a detector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    #[default]
    Direct,
    Fft,
}

impl CorrelationMethod {
    /// Builds a fresh correlator for this method.
    pub fn build(self) -> Box<dyn Autocorrelator> {
        match self {
            CorrelationMethod::Direct => Box::new(DirectAutocorrelator),
            CorrelationMethod::Fft => Box::new(FftAutocorrelator::new()),
        }
    }
}

/// Computes the unnormalized autocorrelation of a window.
///
/// Implementations may keep caches (FFT plans) but never signal state: the
/// output depends only on `signal`.
pub trait Autocorrelator: Send {
    /// Returns `c` with `c.len() == signal.len()`.
    fn autocorrelate(&mut self, signal: &[f32]) -> Vec<f32>;
}

/// Lag-by-lag summation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectAutocorrelator;

impl Autocorrelator for DirectAutocorrelator {
    fn autocorrelate(&mut self, signal: &[f32]) -> Vec<f32> {
        let size = signal.len();
        (0..size)
            .map(|lag| {
                signal[..size - lag]
                    .iter()
                    .zip(&signal[lag..])
                    .map(|(a, b)| a * b)
                    .sum::<f32>()
            })
            .collect()
    }
}

/// Autocorrelation as the inverse transform of the power spectrum.
///
/// The window is zero-padded to at least twice its length so the circular
/// correlation the FFT computes matches the linear one.
pub struct FftAutocorrelator {
    planner: FftPlanner<f32>,
}

impl FftAutocorrelator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
}

impl Default for FftAutocorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FftAutocorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftAutocorrelator").finish_non_exhaustive()
    }
}

impl Autocorrelator for FftAutocorrelator {
    fn autocorrelate(&mut self, signal: &[f32]) -> Vec<f32> {
        let size = signal.len();
        if size == 0 {
            return Vec::new();
        }

        let fft_len = (size * 2).next_power_of_two();
        let fft = self.planner.plan_fft_forward(fft_len);
        let ifft = self.planner.plan_fft_inverse(fft_len);

        let mut buffer = vec![Complex { re: 0.0_f32, im: 0.0_f32 }; fft_len];
        for (slot, &sample) in buffer.iter_mut().zip(signal) {
            slot.re = sample;
        }

        fft.process(&mut buffer);
        for value in buffer.iter_mut() {
            *value = Complex {
                re: value.norm_sqr(),
                im: 0.0,
            };
        }
        ifft.process(&mut buffer);

        // RustFFT leaves the inverse unnormalized.
        let scale = 1.0 / fft_len as f32;
        buffer.iter().take(size).map(|c| c.re * scale).collect()
    }
}

/// Finds the fundamental period (in samples) from an autocorrelation.
///
/// Skips the strictly decreasing run that follows the zero-lag peak, then
/// takes the lag of the largest value from there to the end. The first lag
/// wins on ties.
///
/// # Returns
/// * `Some(lag)` - A positive lag with a strictly positive correlation
/// * `None` - The function only decays, or no positive peak follows the decay
pub fn find_period(correlation: &[f32]) -> Option<usize> {
    let size = correlation.len();
    if size < 2 {
        return None;
    }

    let mut decay_end = 0;
    while decay_end + 1 < size && correlation[decay_end] > correlation[decay_end + 1] {
        decay_end += 1;
    }
    if decay_end == size - 1 {
        return None;
    }

    let mut best_value = f32::NEG_INFINITY;
    let mut best_lag = decay_end;
    for (lag, &value) in correlation.iter().enumerate().skip(decay_end) {
        if value > best_value {
            best_value = value;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_value <= 0.0 {
        return None;
    }
    Some(best_lag)
}
