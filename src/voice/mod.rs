//! Voice commands
//!
//! Capture and transcription run on a background thread so the frame loop
//! never waits on the microphone or the speech model. The thread posts its
//! result into a single-slot [`Mailbox`] which the frame loop polls once per
//! frame and hands to the [`VoiceDispatcher`].
//!
//! At most one capture runs at a time: [`VoiceCoordinator::start`] is a no-op
//! while one is in flight. Every start opens a new session; a result posted
//! by an earlier session is dropped on poll, so a capture that finished just
//! as the next one began can never be delivered into it.

pub mod command;
pub mod dispatch;
pub mod mailbox;

pub use command::{CommandParser, VoiceCommand};
pub use dispatch::{DispatchResult, VoiceDispatcher};
pub use mailbox::{Delivery, Mailbox, VoiceOutcome};

use crate::transcription::Transcriber;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default capture length in seconds
pub const DEFAULT_CAPTURE_SECONDS: f32 = 4.0;

/// Clears the running flag when the capture thread finishes, even on panic
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the background capture task and its mailbox
pub struct VoiceCoordinator {
    transcriber: Arc<dyn Transcriber>,
    capture_seconds: f32,
    mailbox: Mailbox,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    session: u64,
}

impl VoiceCoordinator {
    pub fn new(transcriber: Arc<dyn Transcriber>, capture_seconds: f32) -> Self {
        Self {
            transcriber,
            capture_seconds,
            mailbox: Mailbox::new(),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            session: 0,
        }
    }

    /// Start a background capture
    ///
    /// Returns false without doing anything if a capture is already running.
    pub fn start(&mut self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Voice capture already running, start ignored");
            return false;
        }

        // Reap the previous, already finished thread
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        let transcriber = Arc::clone(&self.transcriber);
        let mailbox = self.mailbox.clone();
        let guard = RunningGuard(Arc::clone(&self.running));
        let seconds = self.capture_seconds;
        self.session += 1;
        let session = self.session;

        let spawned = thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                let _guard = guard;
                tracing::info!("Voice capture {} started ({:.1}s)", session, seconds);
                let outcome = match transcriber.transcribe(seconds) {
                    Ok(text) => VoiceOutcome::Transcript(text),
                    Err(e) => VoiceOutcome::Failed(e.to_string()),
                };
                tracing::debug!("Voice capture {} finished: {:?}", session, outcome);
                mailbox.put(Delivery::new(session, outcome));
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                // The closure (and its guard) is dropped, clearing the flag
                tracing::error!("Failed to spawn voice capture thread: {}", e);
                false
            }
        }
    }

    /// Whether a capture is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Session id of the most recent start, 0 before the first
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Take the latest result of the current session, if one arrived
    pub fn poll(&self) -> Option<VoiceOutcome> {
        let delivery = self.mailbox.take()?;
        if delivery.session != self.session {
            tracing::info!(
                "Dropping result of abandoned voice session {} (current {}): {:?}",
                delivery.session,
                self.session,
                delivery.outcome
            );
            return None;
        }
        Some(delivery.outcome)
    }

    /// Block until the current capture thread exits
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Voice capture thread panicked");
            }
        }
    }
}
