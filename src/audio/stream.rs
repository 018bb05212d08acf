//! Sink-side streaming: turning queued blocks into callback-sized output
//!
//! Output drivers ask for whatever length suits them, rarely a whole block.
//! [`BlockStreamReader`] keeps a read position inside the front block, peeks
//! while a block is partly consumed and dequeues it once the last sample has
//! been copied. [`RenderCallback`] wraps that in the rules a real-time
//! callback must follow: never wait, never allocate, output silence whenever
//! real data is not available.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::audio::buffer::{Sample, SharedBlockHandle};
use crate::ring::{BlockRingBuffer, ReadOutcome};

/// Read cursor over the front block of a block queue
///
/// The position belongs to the block that was at the front on the last
/// fill. If that block has since left the queue (dropped by an overwrite,
/// cleared) the next fill starts the new front block from its beginning.
#[derive(Debug, Default)]
pub struct BlockStreamReader {
    position: usize,
    front: u64,
}

impl BlockStreamReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset already consumed from the front block
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor within the current front block
    ///
    /// A position at or past the block length is clamped to the last
    /// sample on the next fill, so the block is never skipped whole.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Fill `out` from the queue, zero-padding once it runs dry
    pub fn fill(&mut self, ring: &mut BlockRingBuffer<Sample>, out: &mut [Sample]) -> ReadOutcome {
        let block_len = ring.block_len();
        let mut copied = 0;
        if ring.dequeued() != self.front {
            self.position = 0;
        }
        self.position = self.position.min(block_len - 1);

        while copied < out.len() {
            let Ok(block) = ring.peek() else {
                break;
            };

            let take = (block_len - self.position).min(out.len() - copied);
            out[copied..copied + take]
                .copy_from_slice(&block[self.position..self.position + take]);
            copied += take;
            self.position += take;

            if self.position == block_len {
                // peek just succeeded, so the queue is not empty
                let _ = ring.discard();
                self.position = 0;
            }
        }

        self.front = ring.dequeued();
        out[copied..].fill(0.0);
        ReadOutcome {
            requested: out.len(),
            copied,
        }
    }
}

/// Holds output silent until enough blocks have been buffered
///
/// Starting playback on the first block would underrun almost immediately
/// with a bursty producer; waiting for a few blocks absorbs the jitter.
#[derive(Debug)]
pub struct StartGate {
    threshold: usize,
    arrived: AtomicUsize,
    open: AtomicBool,
}

impl StartGate {
    /// A threshold of zero opens the gate immediately
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            arrived: AtomicUsize::new(0),
            open: AtomicBool::new(threshold == 0),
        }
    }

    /// Count one arriving block. Returns `true` for the arrival that opens the gate.
    pub fn record_arrival(&self) -> bool {
        let arrived = self.arrived.fetch_add(1, Ordering::Relaxed) + 1;
        arrived == self.threshold && !self.open.swap(true, Ordering::Release)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::Relaxed)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Close the gate and forget arrivals
    pub fn reset(&self) {
        self.arrived.store(0, Ordering::Relaxed);
        self.open.store(self.threshold == 0, Ordering::Release);
    }
}

/// What a render call produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Stream torn down, output is silence
    Stopped,
    /// Still prebuffering, output is silence
    Waiting,
    /// Producer held the lock, output is silence
    Contended,
    /// Output came from the buffer, possibly zero-padded
    Played(ReadOutcome),
}

/// The function an output driver calls once per period
pub struct RenderCallback {
    buffer: SharedBlockHandle,
    reader: BlockStreamReader,
    gate: Arc<StartGate>,
    running: Arc<AtomicBool>,
}

impl RenderCallback {
    pub fn new(buffer: SharedBlockHandle, gate: Arc<StartGate>, running: Arc<AtomicBool>) -> Self {
        Self {
            buffer,
            reader: BlockStreamReader::new(),
            gate,
            running,
        }
    }

    /// Fill one period of output. Bounded time, no allocation, no waiting.
    pub fn render(&mut self, out: &mut [Sample]) -> Render {
        if !self.running.load(Ordering::Acquire) {
            out.fill(0.0);
            return Render::Stopped;
        }

        if !self.gate.is_open() {
            out.fill(0.0);
            return Render::Waiting;
        }

        let Some(mut ring) = self.buffer.try_lock() else {
            out.fill(0.0);
            self.buffer.record_underrun();
            return Render::Contended;
        };

        let outcome = self.reader.fill(&mut ring, out);
        drop(ring);

        if outcome.is_underrun() {
            self.buffer.record_underrun();
        }
        Render::Played(outcome)
    }

    /// Output one period of silence without touching the buffer
    ///
    /// For drivers that cannot hand this period to `render` at all; it is
    /// counted as an underrun.
    pub fn skip(&self, out: &mut [Sample]) {
        out.fill(0.0);
        self.buffer.record_underrun();
    }
}
