//! Landmark input
//!
//! The landmark detector runs as a separate process and writes one JSON
//! object per video frame:
//!
//! ```json
//! {"hands":[{"label":"Left","score":0.97,"landmarks":[[0.51,0.62], ...]}],"face":[[0.5,0.4], ...]}
//! ```
//!
//! A reader thread parses lines and forwards validated frames over a channel
//! so the frame loop can wait with a timeout.

use crate::landmarks::{Frame, RawFrame};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::BufRead;
use std::thread;
use std::time::Duration;

/// Frames buffered between the reader thread and the frame loop
const CHANNEL_CAPACITY: usize = 64;

/// Result of waiting for the next frame
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Frame(Frame),
    /// Nothing arrived within the timeout
    Timeout,
    /// The source is exhausted
    Closed,
}

/// A stream of landmark frames
pub trait LandmarkSource {
    fn next_frame(&mut self, timeout: Duration) -> SourceEvent;
}

/// JSON-lines frames from a reader (usually stdin)
pub struct JsonLinesSource {
    rx: Receiver<Frame>,
}

impl JsonLinesSource {
    /// Read frames from standard input
    pub fn stdin() -> anyhow::Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read frames from any buffered reader on a background thread
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> anyhow::Result<Self> {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);

        thread::Builder::new()
            .name("landmark-reader".to_string())
            .spawn(move || {
                let mut frames = 0u64;
                let mut rejected = 0u64;
                for line in reader.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::error!("Landmark stream read failed: {}", e);
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<RawFrame>(&line) {
                        Ok(raw) => {
                            frames += 1;
                            if tx.send(raw.into_frame()).is_err() {
                                // Frame loop is gone
                                break;
                            }
                        }
                        Err(e) => {
                            rejected += 1;
                            tracing::warn!("Skipping malformed landmark line: {}", e);
                        }
                    }
                }
                tracing::info!(
                    "Landmark stream closed ({} frames, {} rejected lines)",
                    frames,
                    rejected
                );
            })?;

        Ok(Self { rx })
    }
}

impl LandmarkSource for JsonLinesSource {
    fn next_frame(&mut self, timeout: Duration) -> SourceEvent {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => SourceEvent::Frame(frame),
            Err(RecvTimeoutError::Timeout) => SourceEvent::Timeout,
            Err(RecvTimeoutError::Disconnected) => SourceEvent::Closed,
        }
    }
}
