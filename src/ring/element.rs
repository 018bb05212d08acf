//! Element ring buffer: a flat circular stream of samples
//!
//! Serves sinks that pull arbitrary lengths per callback. Every bulk copy is
//! at most two `copy_from_slice` calls, split where the run reaches the end
//! of physical storage.

use crate::error::BufferError;
use crate::ring::{RingIndex, RingState};

/// Result of a bulk read
///
/// A read asking for more than is buffered still fills the whole destination.
/// The trailing `shortfall()` elements are silence (`T::default()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Elements the caller asked for
    pub requested: usize,
    /// Elements that came from the buffer
    pub copied: usize,
}

impl ReadOutcome {
    pub fn is_underrun(&self) -> bool {
        self.copied < self.requested
    }

    /// Number of padded elements at the end of the destination
    pub fn shortfall(&self) -> usize {
        self.requested - self.copied
    }
}

/// Fixed-capacity circular buffer of scalar samples
pub struct ElementRingBuffer<T> {
    store: Vec<T>,
    index: RingIndex,
}

impl<T: Copy + Default> ElementRingBuffer<T> {
    /// Allocate a buffer holding up to `capacity` elements
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        let index = RingIndex::new(capacity)?;
        Ok(Self {
            store: vec![T::default(); capacity],
            index,
        })
    }

    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Number of unread elements
    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn free(&self) -> usize {
        self.index.free()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.index.is_full()
    }

    pub fn state(&self) -> RingState {
        self.index.state()
    }

    /// Value at a logical index, 0 being the oldest unread element
    ///
    /// Indices past `size()` but inside the store return whatever the slot
    /// currently holds.
    pub fn get(&self, index: usize) -> Result<T, BufferError> {
        self.check_index(index)?;
        Ok(self.store[self.index.physical(index)])
    }

    /// Overwrite the value at a logical index
    pub fn set(&mut self, index: usize, value: T) -> Result<(), BufferError> {
        self.check_index(index)?;
        let slot = self.index.physical(index);
        self.store[slot] = value;
        Ok(())
    }

    /// Append all of `source`, or nothing if it does not fit
    pub fn write(&mut self, source: &[T]) -> Result<(), BufferError> {
        let count = source.len();
        let available = self.index.free();
        if count > available {
            return Err(BufferError::CapacityExceeded {
                requested: count,
                available,
            });
        }

        let (first, second) = self.index.write_runs(count);
        let split = first.len();
        self.store[first].copy_from_slice(&source[..split]);
        self.store[second].copy_from_slice(&source[split..]);
        self.index.advance_head(count);
        Ok(())
    }

    /// Drain `dst.len()` elements into `dst`
    ///
    /// Fails only when the request is larger than the whole buffer. Asking
    /// for more than `size()` is an underrun: the buffered elements are
    /// copied, the rest of `dst` is zero-filled and the outcome reports it.
    pub fn read_into(&mut self, dst: &mut [T]) -> Result<ReadOutcome, BufferError> {
        let requested = dst.len();
        let capacity = self.index.capacity();
        if requested > capacity {
            return Err(BufferError::CapacityExceeded {
                requested,
                available: capacity,
            });
        }

        let copied = requested.min(self.index.size());
        let (first, second) = self.index.read_runs(copied);
        let split = first.len();
        dst[..split].copy_from_slice(&self.store[first]);
        dst[split..copied].copy_from_slice(&self.store[second]);
        dst[copied..].fill(T::default());
        self.index.advance_tail(copied);

        Ok(ReadOutcome { requested, copied })
    }

    /// Drain `count` elements into a new vector, zero-padded on underrun
    pub fn read(&mut self, count: usize) -> Result<Vec<T>, BufferError> {
        if count > self.index.capacity() {
            return Err(BufferError::CapacityExceeded {
                requested: count,
                available: self.index.capacity(),
            });
        }

        let mut out = vec![T::default(); count];
        self.read_into(&mut out)?;
        Ok(out)
    }

    /// Unread elements in logical order
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (first, second) = self.index.read_runs(self.index.size());
        self.store[first].iter().chain(self.store[second].iter())
    }

    /// Copy of the unread elements in logical order, leaving the buffer as is
    pub fn snapshot(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.index.size());
        out.extend(self.iter().copied());
        out
    }

    /// Drop all contents and zero the store
    pub fn clear(&mut self) {
        self.store.fill(T::default());
        self.index.reset();
    }

    fn check_index(&self, index: usize) -> Result<(), BufferError> {
        if index >= self.index.capacity() {
            return Err(BufferError::IndexOutOfRange {
                index,
                capacity: self.index.capacity(),
            });
        }
        Ok(())
    }
}
