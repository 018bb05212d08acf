//! Bounded ring buffers shared between a frame producer and a real-time sink
//!
//! Both variants sit on the same physical model: a fixed-capacity store,
//! a `head` (next write slot), a `tail` (next read slot) and a size counter.
//! They differ only in the unit of storage:
//!
//! - [`ElementRingBuffer`] stores a flat stream of samples
//! - [`BlockRingBuffer`] stores a queue of fixed-size blocks
//!
//! Neither type synchronizes on its own. Cross-thread use goes through the
//! shared handles in [`crate::audio::buffer`], which hold the index update and
//! the data copy in one critical section.

mod invariants;

pub mod block;
pub mod element;

pub use block::BlockRingBuffer;
pub use element::{ElementRingBuffer, ReadOutcome};

use std::ops::Range;

use crate::error::BufferError;
use invariants::{debug_assert_advance_within, debug_assert_ring_consistent};

/// Occupancy state shared by both buffer variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingState {
    /// size == 0
    Empty,
    /// 0 < size < capacity
    Partial,
    /// size == capacity
    Full,
}

/// Head/tail/size bookkeeping for a store of `capacity` slots
#[derive(Debug, Clone)]
pub struct RingIndex {
    capacity: usize,
    head: usize,
    tail: usize,
    size: usize,
}

impl RingIndex {
    /// Create an empty index. Capacity must be non-zero.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }

        Ok(Self {
            capacity,
            head: 0,
            tail: 0,
            size: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next slot to be written
    pub fn head(&self) -> usize {
        self.head
    }

    /// Oldest occupied slot
    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of unoccupied slots
    pub fn free(&self) -> usize {
        self.capacity - self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    pub fn state(&self) -> RingState {
        match self.size {
            0 => RingState::Empty,
            s if s == self.capacity => RingState::Full,
            _ => RingState::Partial,
        }
    }

    /// Map a logical index (0 = oldest unread) to a physical slot
    pub fn physical(&self, logical: usize) -> usize {
        (self.tail + logical) % self.capacity
    }

    /// Physical ranges covering `count` slots starting at `tail`
    pub(crate) fn read_runs(&self, count: usize) -> (Range<usize>, Range<usize>) {
        split_run(self.tail, count, self.capacity)
    }

    /// Physical ranges covering `count` slots starting at `head`
    pub(crate) fn write_runs(&self, count: usize) -> (Range<usize>, Range<usize>) {
        split_run(self.head, count, self.capacity)
    }

    /// Mark `n` slots at `head` as written
    pub(crate) fn advance_head(&mut self, n: usize) {
        debug_assert_advance_within!("head", n, self.free());
        self.head = (self.head + n) % self.capacity;
        self.size += n;
        debug_assert_ring_consistent!(self);
    }

    /// Release `n` slots at `tail`
    pub(crate) fn advance_tail(&mut self, n: usize) {
        debug_assert_advance_within!("tail", n, self.size);
        self.tail = (self.tail + n) % self.capacity;
        self.size -= n;
        debug_assert_ring_consistent!(self);
    }

    pub(crate) fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }
}

/// Split a run of `count` slots starting at `start` into the part that fits
/// before the end of storage and the part that wraps to slot 0.
///
/// `count` must not exceed `capacity`.
pub(crate) fn split_run(start: usize, count: usize, capacity: usize) -> (Range<usize>, Range<usize>) {
    let till_end = capacity - start;
    if count <= till_end {
        (start..start + count, 0..0)
    } else {
        (start..capacity, 0..count - till_end)
    }
}
