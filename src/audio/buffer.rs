//! Shared ring buffers for audio samples
//!
//! One producer thread and one real-time consumer share a buffer through an
//! `Arc`. Every operation takes the mutex once and performs both the data
//! copy and the index update inside it, so an index change is never visible
//! before its data. The consumer side also offers `try_*` forms that report
//! contention instead of waiting.
//!
//! Only single-producer/single-consumer use is supported. Several producers
//! would have to serialize among themselves before reaching the buffer.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::BufferError;
use crate::ring::{BlockRingBuffer, ElementRingBuffer, ReadOutcome};

/// Audio sample type carried by the shared buffers
pub type Sample = f32;

/// Overrun/underrun counters shared by both buffer kinds
#[derive(Default)]
struct Counters {
    overruns: AtomicUsize,
    underruns: AtomicUsize,
}

impl Counters {
    /// Count one underrun. Returns `true` if this one was logged.
    ///
    /// Only the first underrun and every power of two after it reach the log,
    /// so a starved sink cannot flood it from the real-time thread.
    fn record_underrun(&self) -> bool {
        let count = self.underruns.fetch_add(1, Ordering::Relaxed) + 1;
        let logged = count.is_power_of_two();
        if logged {
            tracing::debug!(underruns = count, "Audio underrun, output zero-padded");
        }
        logged
    }

    fn reset(&self) {
        self.overruns.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
    }
}

/// Queue of fixed-size audio blocks, one decoded frame per block
pub struct SharedBlockBuffer {
    ring: Mutex<BlockRingBuffer<Sample>>,
    counters: Counters,
}

impl SharedBlockBuffer {
    /// Create a buffer holding `capacity` blocks of `block_len` samples
    pub fn new(capacity: usize, block_len: usize) -> Result<Self, BufferError> {
        Ok(Self {
            ring: Mutex::new(BlockRingBuffer::new(capacity, block_len)?),
            counters: Counters::default(),
        })
    }

    /// Push a block, dropping the oldest one when full
    ///
    /// Returns `true` if a block was dropped to make room.
    pub fn push(&self, block: &[Sample]) -> Result<bool, BufferError> {
        let overrun = self.ring.lock().overwrite(block)?;
        if overrun {
            self.counters.overruns.fetch_add(1, Ordering::Relaxed);
        }
        Ok(overrun)
    }

    /// Push a block, failing when full
    pub fn write(&self, block: &[Sample]) -> Result<(), BufferError> {
        self.ring.lock().write(block)
    }

    /// Pop the oldest block into `dst`
    pub fn pop_into(&self, dst: &mut [Sample]) -> Result<(), BufferError> {
        self.ring.lock().read_into(dst)
    }

    /// Lock for a compound consumer operation
    pub fn lock(&self) -> MutexGuard<'_, BlockRingBuffer<Sample>> {
        self.ring.lock()
    }

    /// Lock only if the producer is not inside its critical section
    pub fn try_lock(&self) -> Option<MutexGuard<'_, BlockRingBuffer<Sample>>> {
        self.ring.try_lock()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.lock().is_full()
    }

    pub fn queue_length(&self) -> usize {
        self.ring.lock().queue_length()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn block_len(&self) -> usize {
        self.ring.lock().block_len()
    }

    /// Drop all queued blocks and zero the storage
    pub fn clear(&self) {
        self.ring.lock().clear();
    }

    /// Count an output period that could not be filled from the buffer
    pub fn record_underrun(&self) {
        self.counters.record_underrun();
    }

    pub fn overrun_count(&self) -> usize {
        self.counters.overruns.load(Ordering::Relaxed)
    }

    pub fn underrun_count(&self) -> usize {
        self.counters.underruns.load(Ordering::Relaxed)
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    pub fn stats(&self) -> BufferStats {
        let (level, capacity) = {
            let ring = self.ring.lock();
            (ring.queue_length(), ring.capacity())
        };

        BufferStats {
            level,
            capacity,
            overruns: self.overrun_count(),
            underruns: self.underrun_count(),
        }
    }
}

/// Flat stream of audio samples for sinks pulling arbitrary lengths
pub struct SharedElementBuffer {
    ring: Mutex<ElementRingBuffer<Sample>>,
    counters: Counters,
}

impl SharedElementBuffer {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        Ok(Self {
            ring: Mutex::new(ElementRingBuffer::new(capacity)?),
            counters: Counters::default(),
        })
    }

    /// Append all samples or none
    ///
    /// A rejected write counts as an overrun; the caller decides whether to
    /// drop the samples or retry after the consumer drains.
    pub fn write(&self, samples: &[Sample]) -> Result<(), BufferError> {
        let result = self.ring.lock().write(samples);
        if result.is_err() {
            self.counters.overruns.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Fill `out` from the buffer, zero-padding on underrun
    pub fn fill(&self, out: &mut [Sample]) -> Result<ReadOutcome, BufferError> {
        let outcome = self.ring.lock().read_into(out)?;
        self.note_outcome(&outcome);
        Ok(outcome)
    }

    /// Like `fill`, but outputs silence instead of waiting on a held lock
    pub fn try_fill(&self, out: &mut [Sample]) -> Result<ReadOutcome, BufferError> {
        let Some(mut ring) = self.ring.try_lock() else {
            out.fill(0.0);
            self.counters.record_underrun();
            return Ok(ReadOutcome {
                requested: out.len(),
                copied: 0,
            });
        };

        let outcome = ring.read_into(out)?;
        drop(ring);
        self.note_outcome(&outcome);
        Ok(outcome)
    }

    pub fn size(&self) -> usize {
        self.ring.lock().size()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Copy of unread samples in order
    pub fn snapshot(&self) -> Vec<Sample> {
        self.ring.lock().snapshot()
    }

    pub fn clear(&self) {
        self.ring.lock().clear();
    }

    pub fn overrun_count(&self) -> usize {
        self.counters.overruns.load(Ordering::Relaxed)
    }

    pub fn underrun_count(&self) -> usize {
        self.counters.underruns.load(Ordering::Relaxed)
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    pub fn stats(&self) -> BufferStats {
        let (level, capacity) = {
            let ring = self.ring.lock();
            (ring.size(), ring.capacity())
        };

        BufferStats {
            level,
            capacity,
            overruns: self.overrun_count(),
            underruns: self.underrun_count(),
        }
    }

    fn note_outcome(&self, outcome: &ReadOutcome) {
        if outcome.is_underrun() {
            self.counters.record_underrun();
        }
    }
}

/// Point-in-time buffer statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Occupied slots (blocks or samples)
    pub level: usize,
    pub capacity: usize,
    pub overruns: usize,
    pub underruns: usize,
}

impl BufferStats {
    /// Fill level as a fraction of capacity
    pub fn fill_level(&self) -> f32 {
        self.level as f32 / self.capacity as f32
    }
}

/// Thread-safe handle to a block buffer
pub type SharedBlockHandle = Arc<SharedBlockBuffer>;

/// Thread-safe handle to an element buffer
pub type SharedElementHandle = Arc<SharedElementBuffer>;

/// Create a new shared block buffer
pub fn create_shared_block_buffer(
    capacity: usize,
    block_len: usize,
) -> Result<SharedBlockHandle, BufferError> {
    Ok(Arc::new(SharedBlockBuffer::new(capacity, block_len)?))
}

/// Create a new shared element buffer
pub fn create_shared_element_buffer(capacity: usize) -> Result<SharedElementHandle, BufferError> {
    Ok(Arc::new(SharedElementBuffer::new(capacity)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_block_push_counts_overruns() {
        let buffer = SharedBlockBuffer::new(2, 4).unwrap();

        assert!(!buffer.push(&[1.0; 4]).unwrap());
        assert!(!buffer.push(&[2.0; 4]).unwrap());
        assert!(buffer.push(&[3.0; 4]).unwrap());

        let stats = buffer.stats();
        assert_eq!(stats.level, 2);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.fill_level(), 1.0);

        let mut dst = [0.0; 4];
        buffer.pop_into(&mut dst).unwrap();
        assert_eq!(dst, [2.0; 4]);
    }

    #[test]
    fn test_block_strict_write_full() {
        let buffer = SharedBlockBuffer::new(1, 2).unwrap();
        buffer.write(&[1.0, 1.0]).unwrap();
        assert!(buffer.is_full());
        assert!(matches!(
            buffer.write(&[2.0, 2.0]),
            Err(BufferError::CapacityExceeded { .. })
        ));
        assert_eq!(buffer.overrun_count(), 0);
    }

    #[test]
    fn test_underrun_logging_is_rate_limited() {
        let counters = Counters::default();
        let logged: Vec<usize> = (1..=20)
            .filter(|_| counters.record_underrun())
            .map(|_| counters.underruns.load(Ordering::Relaxed))
            .collect();
        assert_eq!(logged, vec![1, 2, 4, 8, 16]);
        assert_eq!(counters.underruns.load(Ordering::Relaxed), 20);
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let buffer = SharedBlockBuffer::new(2, 2).unwrap();
        let guard = buffer.lock();
        assert!(buffer.try_lock().is_none());
        drop(guard);
        assert!(buffer.try_lock().is_some());
    }

    #[test]
    fn test_element_fill_underrun_counted() {
        let buffer = SharedElementBuffer::new(8).unwrap();
        buffer.write(&[1.0, 2.0]).unwrap();

        let mut out = [5.0; 4];
        let outcome = buffer.fill(&mut out).unwrap();
        assert_eq!(outcome.copied, 2);
        assert_eq!(out, [1.0, 2.0, 0.0, 0.0]);
        assert_eq!(buffer.underrun_count(), 1);

        buffer.reset_stats();
        assert_eq!(buffer.underrun_count(), 0);
    }

    #[test]
    fn test_element_try_fill_contended_is_silent() {
        let buffer = SharedElementBuffer::new(8).unwrap();
        buffer.write(&[1.0, 2.0, 3.0]).unwrap();

        let guard = buffer.ring.lock();
        let mut out = [9.0; 2];
        let outcome = buffer.try_fill(&mut out).unwrap();
        drop(guard);

        assert_eq!(outcome.copied, 0);
        assert_eq!(out, [0.0; 2]);
        // nothing was consumed
        assert_eq!(buffer.snapshot(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_element_rejected_write_counts_overrun() {
        let buffer = SharedElementBuffer::new(2).unwrap();
        assert!(buffer.write(&[1.0, 2.0, 3.0]).is_err());
        assert_eq!(buffer.overrun_count(), 1);
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_spsc_threads_preserve_order() {
        let buffer = create_shared_element_buffer(64).unwrap();
        let producer_buffer = buffer.clone();
        const TOTAL: usize = 10_000;

        let producer = thread::spawn(move || {
            let mut next = 0usize;
            while next < TOTAL {
                let end = (next + 7).min(TOTAL);
                let chunk: Vec<f32> = (next..end).map(|v| v as f32).collect();
                if producer_buffer.write(&chunk).is_ok() {
                    next = end;
                } else {
                    thread::yield_now();
                }
            }
        });

        let mut received = Vec::with_capacity(TOTAL);
        let mut out = [0.0f32; 5];
        while received.len() < TOTAL {
            let want = (TOTAL - received.len()).min(out.len());
            let available = buffer.size().min(want);
            if available == 0 {
                thread::yield_now();
                continue;
            }
            let outcome = buffer.fill(&mut out[..available]).unwrap();
            received.extend_from_slice(&out[..outcome.copied]);
        }

        producer.join().unwrap();
        let expected: Vec<f32> = (0..TOTAL).map(|v| v as f32).collect();
        assert_eq!(received, expected);
    }
}
