//! Decoded-frame hand-off between the decode and render threads.
//!
//! Both types are plain handles created by the decoder owner and cloned into
//! whichever thread needs them. Each method takes the lock for its own
//! duration only; no lock is held across calls.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::BufferDescriptor;
use crate::error::{BitstreamError, Result};

/// A decoded frame waiting to be displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputFrame {
    /// Output buffer index the frame was queued on.
    pub slot: usize,
    /// Presentation time, if one could be associated.
    pub pts: Option<f64>,
}

/// FIFO of decoded frames, shared between decoder and renderer.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    frames: Arc<Mutex<VecDeque<OutputFrame>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: OutputFrame) {
        let mut frames = self.frames.lock();
        frames.push_back(frame);
        tracing::trace!(slot = frame.slot, queued = frames.len(), "frame queued");
    }

    pub fn pop(&self) -> Option<OutputFrame> {
        self.frames.lock().pop_front()
    }

    /// Next frame to display, left in the queue.
    pub fn front(&self) -> Option<OutputFrame> {
        self.frames.lock().front().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Drop every queued frame, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut frames = self.frames.lock();
        let dropped = frames.len();
        frames.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "frame queue cleared");
        }
        dropped
    }
}

/// Which decoder frame buffer currently sits on each output buffer index.
///
/// A slot is claimed when a frame is queued for display and released once
/// the display is done with it, at which point the decoder may reuse the
/// frame buffer.
#[derive(Debug, Clone)]
pub struct OutputSlots {
    slots: Arc<Mutex<Vec<Option<BufferDescriptor>>>>,
}

impl OutputSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(vec![None; capacity])),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    /// Record `buffer` on slot `index`, returning what was there before.
    pub fn claim(
        &self,
        index: usize,
        buffer: BufferDescriptor,
    ) -> Result<Option<BufferDescriptor>> {
        let mut slots = self.slots.lock();
        let capacity = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(BitstreamError::SlotOutOfRange { index, capacity })?;

        let previous = slot.replace(buffer);
        if previous.is_some() {
            tracing::warn!(index, "output slot claimed while still in use");
        }
        Ok(previous)
    }

    /// Free slot `index`, returning the buffer that was on it.
    pub fn release(&self, index: usize) -> Result<Option<BufferDescriptor>> {
        let mut slots = self.slots.lock();
        let capacity = slots.len();
        slots
            .get_mut(index)
            .map(Option::take)
            .ok_or(BitstreamError::SlotOutOfRange { index, capacity })
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        self.slots.lock().get(index).is_some_and(Option::is_some)
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_none()).count()
    }
}
