//! Audio worker thread management.
//!
//! The cpal stream is created, driven and dropped on a dedicated thread; that
//! thread runs the pitch detector on every window and sends estimates back.
//! Mapping to notes happens on the caller's side so the reference pitch can
//! change between ticks without touching the worker.

use anyhow::{anyhow, Result};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tuner_core::{PitchDetector, PitchEstimate};

use crate::capture;

/// Windows buffered between the audio callback and the detector.
const FRAME_QUEUE: usize = 4;

#[derive(Debug)]
pub struct AnalysisWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl AnalysisWorker {
    /// Starts capture and analysis on a new thread.
    ///
    /// Blocks until the input stream is running (or failed to start) so
    /// device errors surface here rather than in the thread's log.
    pub fn spawn(
        mut detector: PitchDetector,
        window_size: usize,
        estimates: Sender<PitchEstimate>,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32, String>>(1);

        let thread_handle = thread::Builder::new()
            .name("audio".into())
            .spawn(move || {
                let (raw_audio_tx, raw_audio_rx) =
                    crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE);

                let started = capture::start_audio_capture(raw_audio_tx, window_size);
                let (stream, sample_rate) = match started {
                    Ok(tuple) => tuple,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{:#}", e)));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(sample_rate));

                run_analysis_loop(
                    &mut detector,
                    sample_rate as f32,
                    &raw_audio_rx,
                    &shutdown_rx,
                    &estimates,
                );

                debug!("stopping input stream");
                if let Err(e) = stream.pause() {
                    warn!("error pausing stream: {}", e);
                }
                // Give the backend a moment to stop calling back before the stream drops.
                thread::sleep(Duration::from_millis(50));
                drop(stream);
                info!("audio thread finished");
            })?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(anyhow!("failed to start audio capture: {}", e));
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(anyhow!("audio thread exited before capture started"));
            }
        };

        Ok(Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Signals the thread to stop and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            info!("shutting down audio worker");
            let _ = self.shutdown_tx.try_send(());
            if handle.join().is_err() {
                error!("audio thread panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Detects pitch on every incoming window until shutdown or until either
/// channel closes.
fn run_analysis_loop(
    detector: &mut PitchDetector,
    sample_rate: f32,
    frames: &Receiver<Vec<f32>>,
    shutdown: &Receiver<()>,
    estimates: &Sender<PitchEstimate>,
) {
    info!("entering analysis loop");
    loop {
        crossbeam_channel::select! {
            recv(frames) -> msg => match msg {
                Ok(window) => match detector.try_detect(&window, sample_rate) {
                    Ok(estimate) => {
                        if estimates.send(estimate).is_err() {
                            debug!("estimate receiver dropped");
                            break;
                        }
                    }
                    Err(e) => warn!("skipping window: {}", e),
                },
                Err(_) => {
                    warn!("audio channel closed");
                    break;
                }
            },
            recv(shutdown) -> _ => {
                debug!("received shutdown signal");
                break;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuner_core::NoPitchReason;

    #[test]
    fn loop_forwards_estimates_until_frames_close() {
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
        let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (estimate_tx, estimate_rx) = crossbeam_channel::unbounded();

        let tone: Vec<f32> = (0..2048)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * i as f32 / 100.0).sin())
            .collect();
        frame_tx.send(vec![0.0; 2048]).unwrap();
        frame_tx.send(vec![f32::NAN; 2048]).unwrap();
        frame_tx.send(tone).unwrap();
        drop(frame_tx);

        let mut detector = PitchDetector::default();
        run_analysis_loop(&mut detector, 44100.0, &frame_rx, &shutdown_rx, &estimate_tx);

        let received: Vec<PitchEstimate> = estimate_rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                PitchEstimate::NoPitch {
                    reason: NoPitchReason::Silence
                },
                PitchEstimate::Detected { frequency_hz: 441.0 },
            ]
        );
    }

    #[test]
    fn loop_stops_on_shutdown() {
        let (_frame_tx, frame_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (estimate_tx, estimate_rx) = crossbeam_channel::unbounded();

        shutdown_tx.send(()).unwrap();
        run_analysis_loop(
            &mut PitchDetector::default(),
            44100.0,
            &frame_rx,
            &shutdown_rx,
            &estimate_tx,
        );
        assert!(estimate_rx.try_recv().is_err());
    }
}
