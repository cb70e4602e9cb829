use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::models::frame::Frame;

/// Single-slot, last-write-wins hand-off between the background reader and
/// the consumer.
///
/// The slot is mutex-guarded, so a consumer can never observe a frame that
/// is half written. `take` moves the frame out; reading twice without a new
/// post yields nothing the second time. There is no backpressure: posting
/// over an unread frame drops the older one.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Option<Frame>>,
    overwrites: AtomicU64,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`. Returns `true` when an unread frame was replaced.
    pub fn post(&self, frame: Frame) -> bool {
        let replaced = self.slot.lock().replace(frame).is_some();
        if replaced {
            self.overwrites.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// Take the pending frame, leaving the slot empty.
    pub fn take(&self) -> Option<Frame> {
        self.slot.lock().take()
    }

    pub fn has_new_data(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Unread frames dropped by newer posts.
    pub fn overwrites(&self) -> u64 {
        self.overwrites.load(Ordering::Relaxed)
    }
}
