//! Paced sink for running without an audio device
//!
//! Calls a [`RenderCallback`] from a dedicated thread at the period a real
//! driver would use for the chunk length (see `AudioConfig::sink_period`).
//! Deadlines are tracked against a fixed schedule, so a late wakeup shortens
//! the next sleep instead of drifting.

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::buffer::Sample;
use crate::audio::stream::{Render, RenderCallback};
use crate::error::AudioError;

/// Dedicated thread pulling fixed-size chunks at a fixed cadence
pub struct HeadlessSink {
    chunk_len: usize,
    period: Duration,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    chunks_rendered: Arc<AtomicU64>,
    silent_chunks: Arc<AtomicU64>,
    tap: Option<Sender<Vec<Sample>>>,
}

impl HeadlessSink {
    pub fn new(chunk_len: usize, period: Duration) -> Self {
        Self {
            chunk_len,
            period,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            chunks_rendered: Arc::new(AtomicU64::new(0)),
            silent_chunks: Arc::new(AtomicU64::new(0)),
            tap: None,
        }
    }

    /// Forward a copy of every rendered chunk, e.g. for recording or tests
    ///
    /// The copy is made on the sink thread, which a real driver would not
    /// allow; it exists only on this sink.
    pub fn with_tap(mut self, tap: Sender<Vec<Sample>>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Start calling `callback` every period
    pub fn start(&mut self, mut callback: RenderCallback) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let running = self.running.clone();
        let chunks_rendered = self.chunks_rendered.clone();
        let silent_chunks = self.silent_chunks.clone();
        let tap = self.tap.clone();
        let chunk_len = self.chunk_len;
        let period = self.period;

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("headless-sink".to_string())
            .spawn(move || {
                let mut chunk = vec![0.0 as Sample; chunk_len];
                let mut deadline = Instant::now();

                while running.load(Ordering::Relaxed) {
                    let render = callback.render(&mut chunk);
                    chunks_rendered.fetch_add(1, Ordering::Relaxed);
                    if !matches!(render, Render::Played(outcome) if outcome.copied > 0) {
                        silent_chunks.fetch_add(1, Ordering::Relaxed);
                    }

                    if let Some(tap) = &tap {
                        let _ = tap.try_send(chunk.clone());
                    }

                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        // fell behind, restart the schedule from now
                        deadline = now;
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        tracing::debug!(
            "Headless sink started: {} samples every {:?}",
            self.chunk_len,
            self.period
        );
        Ok(())
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Callbacks made so far
    pub fn chunks_rendered(&self) -> u64 {
        self.chunks_rendered.load(Ordering::Relaxed)
    }

    /// Callbacks that produced no buffered audio at all
    pub fn silent_chunks(&self) -> u64 {
        self.silent_chunks.load(Ordering::Relaxed)
    }
}

impl Drop for HeadlessSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::create_shared_block_buffer;
    use crate::audio::stream::StartGate;
    use crossbeam_channel::bounded;

    #[test]
    fn test_renders_buffered_blocks_then_silence() {
        let buffer = create_shared_block_buffer(4, 4).unwrap();
        buffer.push(&[1.0; 4]).unwrap();
        buffer.push(&[2.0; 4]).unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let callback = RenderCallback::new(buffer.clone(), Arc::new(StartGate::new(0)), running);

        let (tx, rx) = bounded(64);
        let mut sink = HeadlessSink::new(4, Duration::from_millis(1)).with_tap(tx);
        sink.start(callback).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let third = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        sink.stop();

        assert_eq!(first, vec![1.0; 4]);
        assert_eq!(second, vec![2.0; 4]);
        assert_eq!(third, vec![0.0; 4]);
        assert!(!sink.is_running());
        assert!(sink.chunks_rendered() >= 3);
        assert!(sink.silent_chunks() >= 1);
    }
}
