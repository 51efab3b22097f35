//! Single-slot result mailbox
//!
//! One producer (the capture thread) and one consumer (the frame loop). An
//! unread value is overwritten by the next write.

use parking_lot::Mutex;
use std::sync::Arc;

/// Result of one background capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    Transcript(String),
    Failed(String),
}

/// An outcome stamped with the capture session that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub session: u64,
    pub outcome: VoiceOutcome,
}

impl Delivery {
    pub fn new(session: u64, outcome: VoiceOutcome) -> Self {
        Self { session, outcome }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    slot: Arc<Mutex<Option<Delivery>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any unread one
    pub fn put(&self, delivery: Delivery) {
        if let Some(dropped) = self.slot.lock().replace(delivery) {
            tracing::warn!("Voice mailbox overwritten, unread result dropped: {:?}", dropped);
        }
    }

    /// Take the pending value, leaving the slot empty
    pub fn take(&self) -> Option<Delivery> {
        self.slot.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}
