use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::models::frame::{Frame, FrameDimensions};

/// Bounded buffer of the most recent frames, newest first.
///
/// Frames are inserted at the head and evicted from the tail, so index 0 is
/// always the latest frame and `count() - 1` the oldest one still held.
/// Wrap in a mutex for cross-thread access; a capture session owns its
/// buffer and mutates it only from the caller's thread.
///
/// Overflow behavior: drops the oldest frame.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    max_count: usize,
}

impl FrameBuffer {
    pub fn new(max_count: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(max_count + 1),
            max_count,
        }
    }

    /// Insert a frame at the head.
    ///
    /// Returns the evicted tail frame when the buffer was already full.
    pub fn push(&mut self, frame: Frame) -> Option<Frame> {
        self.frames.push_front(frame);
        if self.frames.len() > self.max_count {
            self.frames.pop_back()
        } else {
            None
        }
    }

    /// Frame `index` positions behind the newest one, or `None` when the
    /// buffer does not hold that many frames yet.
    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn oldest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    /// Dimensions of the newest frame; `(0, 0)` when empty.
    pub fn frame_dimensions(&self) -> FrameDimensions {
        self.latest().map(Frame::dimensions).unwrap_or_default()
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest().map(Frame::captured_at)
    }

    /// Newest-first iterator.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Frame> + ExactSizeIterator {
        self.frames.iter()
    }

    pub fn count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.max_count
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }
}
