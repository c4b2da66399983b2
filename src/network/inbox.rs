//! Latest-Value Inbox
//!
//! Transport reader tasks write decoded messages here; the simulation takes
//! them at the start of its step. Each slot holds only the newest message of
//! its kind, so a slow consumer never sees a backlog.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::network::protocol::{InputMessage, PeerMessage, Snapshot, WireFrame};

#[derive(Debug, Default)]
struct Slots {
    input: Option<InputMessage>,
    snapshot: Option<Snapshot>,
    received: u64,
    dropped: u64,
    overwritten: u64,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboxStats {
    /// Messages decoded and stored
    pub received: u64,
    /// Frames that failed to decode
    pub dropped: u64,
    /// Stored messages replaced before anyone took them
    pub overwritten: u64,
}

/// Shared receive slots. Cloning yields another handle to the same slots.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    slots: Arc<Mutex<Slots>>,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // A panicked writer cannot leave the slots half-updated.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a message, replacing any unread one of the same kind.
    pub fn deliver(&self, message: PeerMessage) {
        let mut slots = self.lock();
        slots.received += 1;
        let replaced = match message {
            PeerMessage::Input(input) => slots.input.replace(input).is_some(),
            PeerMessage::Snapshot(snapshot) => slots.snapshot.replace(snapshot).is_some(),
        };
        if replaced {
            slots.overwritten += 1;
        }
    }

    /// Decode a frame and store it. Malformed frames are logged and dropped.
    pub fn deliver_frame(&self, frame: &WireFrame) -> bool {
        match PeerMessage::decode(frame) {
            Ok(message) => {
                self.deliver(message);
                true
            }
            Err(e) => {
                debug!("Dropping undecodable frame: {}", e);
                self.lock().dropped += 1;
                false
            }
        }
    }

    /// Take the newest unread input.
    pub fn take_input(&self) -> Option<InputMessage> {
        self.lock().input.take()
    }

    /// Take the newest unread snapshot.
    pub fn take_snapshot(&self) -> Option<Snapshot> {
        self.lock().snapshot.take()
    }

    /// Current counters.
    pub fn stats(&self) -> InboxStats {
        let slots = self.lock();
        InboxStats {
            received: slots.received,
            dropped: slots.dropped,
            overwritten: slots.overwritten,
        }
    }
}
