//! Interactive commands read from stdin while listening.

use crossbeam_channel::Receiver;
use std::io::BufRead;
use std::thread;
use tracing::{debug, warn};
use tuner_core::config::validate_reference_pitch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// New reference pitch for A4, applied from the next tick.
    SetReference(f32),
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    match line {
        "" => Ok(None),
        "q" | "quit" | "exit" => Ok(Some(Command::Quit)),
        _ => {
            let hz: f32 = line
                .trim_end_matches("Hz")
                .trim_end_matches("hz")
                .trim()
                .parse()
                .map_err(|_| format!("expected a reference pitch in Hz or 'q', got '{}'", line))?;
            validate_reference_pitch(hz)
                .map(|hz| Some(Command::SetReference(hz)))
                .map_err(|e| e.to_string())
        }
    }
}

/// Reads commands from stdin on a background thread.
///
/// The returned channel disconnects at end of input.
pub fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let spawned = thread::Builder::new().name("stdin".into()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        debug!("stdin closed");
    });
    if let Err(e) = spawned {
        warn!("interactive commands unavailable: {}", e);
    }
    rx
}
