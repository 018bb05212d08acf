//! Block ring buffer: a FIFO queue of fixed-size blocks
//!
//! One block normally holds one decoded audio frame. All blocks live in a
//! single allocation of `capacity * block_len` elements, slot `i` covering
//! `[i * block_len, (i + 1) * block_len)`.

use crate::error::BufferError;
use crate::ring::{RingIndex, RingState};

/// Fixed-capacity FIFO of equally sized blocks
pub struct BlockRingBuffer<T> {
    store: Vec<T>,
    block_len: usize,
    index: RingIndex,
    dequeued: u64,
}

impl<T: Copy + Default> BlockRingBuffer<T> {
    /// Allocate room for `capacity` blocks of `block_len` elements each
    pub fn new(capacity: usize, block_len: usize) -> Result<Self, BufferError> {
        if block_len == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        let index = RingIndex::new(capacity)?;
        let len = capacity
            .checked_mul(block_len)
            .ok_or(BufferError::TooLarge {
                capacity,
                block_len,
            })?;

        Ok(Self {
            store: vec![T::default(); len],
            block_len,
            index,
            dequeued: 0,
        })
    }

    /// Maximum number of queued blocks
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Elements per block
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn queue_length(&self) -> usize {
        self.index.size()
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

    /// Blocks that have left the front of the queue so far, whether read,
    /// discarded, dropped by `overwrite` or cleared
    ///
    /// A change tells a reader holding an offset into the front block that
    /// the offset now belongs to a block that is gone.
    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    /// Dequeue the oldest block
    ///
    /// The returned slice borrows the slot it was stored in, so it cannot
    /// outlive the next write.
    pub fn read(&mut self) -> Result<&[T], BufferError> {
        if self.index.is_empty() {
            return Err(BufferError::EmptyBufferRead);
        }
        let slot = self.index.tail();
        self.pop_front();
        Ok(self.slot(slot))
    }

    /// Dequeue the oldest block into `dst`
    pub fn read_into(&mut self, dst: &mut [T]) -> Result<(), BufferError> {
        self.check_len(dst.len())?;
        let block = self.read()?;
        dst.copy_from_slice(block);
        Ok(())
    }

    /// Oldest block, left in place
    pub fn peek(&self) -> Result<&[T], BufferError> {
        if self.index.is_empty() {
            return Err(BufferError::EmptyBufferRead);
        }
        Ok(self.slot(self.index.tail()))
    }

    /// Drop the oldest block without copying it anywhere
    pub fn discard(&mut self) -> Result<(), BufferError> {
        if self.index.is_empty() {
            return Err(BufferError::EmptyBufferRead);
        }
        self.pop_front();
        Ok(())
    }

    /// Enqueue a copy of `block`, failing when the queue is full
    pub fn write(&mut self, block: &[T]) -> Result<(), BufferError> {
        self.check_len(block.len())?;
        if self.index.is_full() {
            return Err(BufferError::CapacityExceeded {
                requested: 1,
                available: 0,
            });
        }

        let slot = self.index.head();
        self.slot_mut(slot).copy_from_slice(block);
        self.index.advance_head(1);
        Ok(())
    }

    /// Enqueue a copy of `block`, dropping the oldest block if the queue is full
    ///
    /// Returns `true` when a block was dropped.
    pub fn overwrite(&mut self, block: &[T]) -> Result<bool, BufferError> {
        self.check_len(block.len())?;

        let overrun = self.index.is_full();
        if overrun {
            self.pop_front();
            tracing::debug!(
                capacity = self.index.capacity(),
                "Block buffer overrun, dropped oldest block"
            );
        }

        self.write(block)?;
        Ok(overrun)
    }

    /// Queued blocks in FIFO order
    pub fn blocks(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.index.size()).map(move |i| self.slot(self.index.physical(i)))
    }

    /// Empty the queue and zero every slot
    pub fn clear(&mut self) {
        self.dequeued = self.dequeued.wrapping_add(self.index.size() as u64);
        self.store.fill(T::default());
        self.index.reset();
    }

    fn pop_front(&mut self) {
        self.index.advance_tail(1);
        self.dequeued = self.dequeued.wrapping_add(1);
    }

    fn slot(&self, slot: usize) -> &[T] {
        let start = slot * self.block_len;
        &self.store[start..start + self.block_len]
    }

    fn slot_mut(&mut self, slot: usize) -> &mut [T] {
        let start = slot * self.block_len;
        &mut self.store[start..start + self.block_len]
    }

    fn check_len(&self, actual: usize) -> Result<(), BufferError> {
        if actual != self.block_len {
            return Err(BufferError::BlockSizeMismatch {
                expected: self.block_len,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(value: f32) -> [f32; 3] {
        [value; 3]
    }

    fn filled(capacity: usize, values: &[f32]) -> BlockRingBuffer<f32> {
        let mut buffer = BlockRingBuffer::new(capacity, 3).unwrap();
        for &v in values {
            buffer.write(&block(v)).unwrap();
        }
        buffer
    }

    #[test]
    fn test_fifo_order() {
        let mut buffer = filled(4, &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.queue_length(), 3);

        assert_eq!(buffer.read().unwrap(), &block(1.0));
        assert_eq!(buffer.read().unwrap(), &block(2.0));
        assert_eq!(buffer.read().unwrap(), &block(3.0));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_read_and_peek_empty() {
        let mut buffer = BlockRingBuffer::<f32>::new(2, 3).unwrap();
        assert_eq!(buffer.peek().unwrap_err(), BufferError::EmptyBufferRead);
        assert_eq!(buffer.read().unwrap_err(), BufferError::EmptyBufferRead);
        assert_eq!(buffer.discard().unwrap_err(), BufferError::EmptyBufferRead);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let buffer = filled(2, &[7.0]);
        assert_eq!(buffer.peek().unwrap(), &block(7.0));
        assert_eq!(buffer.peek().unwrap(), &block(7.0));
        assert_eq!(buffer.queue_length(), 1);
    }

    #[test]
    fn test_write_full_fails() {
        let mut buffer = filled(2, &[1.0, 2.0]);
        assert!(buffer.is_full());
        assert!(matches!(
            buffer.write(&block(3.0)),
            Err(BufferError::CapacityExceeded { .. })
        ));
        assert_eq!(buffer.queue_length(), 2);
    }

    #[test]
    fn test_overwrite_drops_oldest() {
        // A, B, C, D then E
        let mut buffer = filled(4, &[1.0, 2.0, 3.0, 4.0]);
        assert!(buffer.is_full());
        assert_eq!(buffer.queue_length(), 4);

        assert!(buffer.overwrite(&block(5.0)).unwrap());
        assert_eq!(buffer.queue_length(), 4);
        assert_eq!(buffer.state(), RingState::Full);

        let order: Vec<f32> = buffer.blocks().map(|b| b[0]).collect();
        assert_eq!(order, vec![2.0, 3.0, 4.0, 5.0]);

        assert_eq!(buffer.read().unwrap(), &block(2.0));
        assert_eq!(buffer.queue_length(), 3);
    }

    #[test]
    fn test_overwrite_with_room_is_plain_write() {
        let mut buffer = filled(4, &[1.0]);
        assert!(!buffer.overwrite(&block(2.0)).unwrap());
        assert_eq!(buffer.queue_length(), 2);
    }

    #[test]
    fn test_oversized_geometry_rejected() {
        assert_eq!(
            BlockRingBuffer::<u8>::new(usize::MAX, 2).err(),
            Some(BufferError::TooLarge {
                capacity: usize::MAX,
                block_len: 2
            })
        );
    }

    #[test]
    fn test_dequeued_counts_every_departure() {
        let mut buffer = filled(2, &[1.0, 2.0]);
        assert_eq!(buffer.dequeued(), 0);

        buffer.read().unwrap();
        buffer.discard().unwrap();
        assert_eq!(buffer.dequeued(), 2);

        buffer.write(&block(3.0)).unwrap();
        buffer.write(&block(4.0)).unwrap();
        // room left, nothing dropped
        assert_eq!(buffer.dequeued(), 2);
        assert!(buffer.overwrite(&block(5.0)).unwrap());
        assert_eq!(buffer.dequeued(), 3);

        buffer.clear();
        assert_eq!(buffer.dequeued(), 5);
        // failed reads leave it alone
        assert!(buffer.read().is_err());
        assert_eq!(buffer.dequeued(), 5);
    }

    #[test]
    fn test_block_size_mismatch() {
        let mut buffer = filled(2, &[1.0, 2.0]);
        assert_eq!(
            buffer.overwrite(&[1.0; 2]).unwrap_err(),
            BufferError::BlockSizeMismatch { expected: 3, actual: 2 }
        );
        // rejected before anything was dropped
        assert_eq!(buffer.peek().unwrap(), &block(1.0));

        let mut dst = [0.0; 4];
        assert!(buffer.read_into(&mut dst).is_err());
        assert_eq!(buffer.queue_length(), 2);
    }

    #[test]
    fn test_wraparound_keeps_order() {
        let mut buffer = filled(3, &[1.0, 2.0, 3.0]);
        buffer.discard().unwrap();
        buffer.discard().unwrap();
        buffer.write(&block(4.0)).unwrap();
        buffer.write(&block(5.0)).unwrap();

        let mut dst = [0.0; 3];
        for expected in [3.0, 4.0, 5.0] {
            buffer.read_into(&mut dst).unwrap();
            assert_eq!(dst, block(expected));
        }
    }

    #[test]
    fn test_clear_resets_and_scrubs() {
        let mut buffer = filled(2, &[1.0, 2.0]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.state(), RingState::Empty);

        buffer.write(&block(3.0)).unwrap();
        assert_eq!(buffer.read().unwrap(), &block(3.0));
        // slot 1 held block 2.0 before the clear
        assert_eq!(buffer.store[3..6], [0.0; 3]);
    }
}
