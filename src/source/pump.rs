//! Producer thread moving decoded frames into the audio buffer
//!
//! The pump is the only writer of the shared block buffer. Audio is pushed
//! with `overwrite`, so a sink that falls behind loses the oldest audio
//! instead of stalling the producer.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::SharedBlockHandle;
use crate::audio::stream::StartGate;
use crate::error::SourceError;
use crate::source::{DecodedFrame, FrameSource};
use crate::stats::FrameRateMeter;

/// Shared state the pump feeds
#[derive(Clone)]
pub struct PumpHandles {
    pub buffer: SharedBlockHandle,
    pub gate: Arc<StartGate>,
    pub meter: Arc<FrameRateMeter>,
}

impl PumpHandles {
    /// Route one frame: count planes, queue audio, open the gate when due
    pub fn accept(&self, frame: &DecodedFrame) {
        if frame.has_video() {
            self.meter.record_video();
        }

        let Some(samples) = frame.audio_samples() else {
            return;
        };

        match self.buffer.push(samples) {
            Ok(overrun) => {
                self.meter.record_audio();
                if overrun {
                    tracing::debug!("Audio buffer overrun at frame {}", frame.sequence);
                }
                if self.gate.record_arrival() {
                    tracing::info!(
                        "Starting audio after {} buffered frames",
                        self.gate.threshold()
                    );
                }
            }
            Err(e) => {
                tracing::warn!("Dropping audio of frame {}: {}", frame.sequence, e);
            }
        }
    }
}

/// Handle to a running producer thread
pub struct FramePump {
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
    finished: Arc<AtomicBool>,
    source_errors: Arc<AtomicU64>,
}

impl FramePump {
    /// Spawn a thread polling `source`, idling `poll_interval` when nothing is ready
    pub fn start<S>(source: S, handles: PumpHandles, poll_interval: Duration) -> Result<Self, SourceError>
    where
        S: FrameSource + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let finished = Arc::new(AtomicBool::new(false));
        let source_errors = Arc::new(AtomicU64::new(0));

        let thread_finished = finished.clone();
        let thread_errors = source_errors.clone();

        let handle = thread::Builder::new()
            .name("frame-pump".to_string())
            .spawn(move || {
                run(source, &handles, &stop_rx, poll_interval, &thread_errors);
                thread_finished.store(true, Ordering::Release);
            })
            .map_err(|e| SourceError::Thread(e.to_string()))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread_handle: Some(handle),
            finished,
            source_errors,
        })
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Whether the source ended or the pump was stopped
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Failed polls other than end of stream
    pub fn source_errors(&self) -> u64 {
        self.source_errors.load(Ordering::Relaxed)
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<S: FrameSource>(
    mut source: S,
    handles: &PumpHandles,
    stop_rx: &Receiver<()>,
    poll_interval: Duration,
    errors: &AtomicU64,
) {
    loop {
        match stop_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            _ => break,
        }

        match source.next_frame() {
            Ok(Some(frame)) => {
                handles.accept(&frame);
                continue;
            }
            Ok(None) => {}
            Err(SourceError::Closed) => {
                tracing::info!("Frame source closed");
                break;
            }
            Err(e) => {
                errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Failed to get frame: {}", e);
            }
        }

        // nothing ready: idle, but wake up at once on stop
        match stop_rx.recv_timeout(poll_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::create_shared_block_buffer;
    use std::collections::VecDeque;

    /// Replays a fixed script of poll results
    struct Scripted(VecDeque<Result<Option<DecodedFrame>, SourceError>>);

    impl FrameSource for Scripted {
        fn next_frame(&mut self) -> Result<Option<DecodedFrame>, SourceError> {
            self.0.pop_front().unwrap_or(Err(SourceError::Closed))
        }
    }

    fn audio_frame(sequence: u32, value: f32, len: usize) -> DecodedFrame {
        DecodedFrame {
            sequence,
            audio: Some(vec![value; len]),
            ..Default::default()
        }
    }

    fn handles(capacity: usize, threshold: usize) -> PumpHandles {
        PumpHandles {
            buffer: create_shared_block_buffer(capacity, 2).unwrap(),
            gate: Arc::new(StartGate::new(threshold)),
            meter: Arc::new(FrameRateMeter::new()),
        }
    }

    #[test]
    fn test_accept_queues_audio_and_opens_gate() {
        let handles = handles(4, 2);

        handles.accept(&audio_frame(0, 1.0, 2));
        assert!(!handles.gate.is_open());
        handles.accept(&audio_frame(1, 2.0, 2));
        assert!(handles.gate.is_open());

        assert_eq!(handles.buffer.queue_length(), 2);
        assert_eq!(handles.meter.audio_total(), 2);
    }

    #[test]
    fn test_accept_drops_mismatched_audio() {
        let handles = handles(4, 1);
        handles.accept(&audio_frame(0, 1.0, 3));

        assert!(handles.buffer.is_empty());
        assert!(!handles.gate.is_open());
        assert_eq!(handles.meter.audio_total(), 0);
    }

    #[test]
    fn test_pump_runs_script_to_close() {
        let handles = handles(2, 1);
        let script = Scripted(VecDeque::from(vec![
            Ok(Some(audio_frame(0, 1.0, 2))),
            Ok(None),
            Err(SourceError::NotReady("warming up".into())),
            Ok(Some(audio_frame(1, 2.0, 2))),
            Ok(Some(audio_frame(2, 3.0, 2))),
        ]));

        let mut pump = FramePump::start(script, handles.clone(), Duration::from_millis(1)).unwrap();
        for _ in 0..1000 {
            if pump.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        pump.stop();

        assert!(pump.is_finished());
        assert_eq!(pump.source_errors(), 1);
        // capacity 2: the first block was overwritten
        assert_eq!(handles.buffer.overrun_count(), 1);
        let mut dst = [0.0; 2];
        handles.buffer.pop_into(&mut dst).unwrap();
        assert_eq!(dst, [2.0, 2.0]);
    }

    #[test]
    fn test_stop_interrupts_idle_source() {
        struct Idle;
        impl FrameSource for Idle {
            fn next_frame(&mut self) -> Result<Option<DecodedFrame>, SourceError> {
                Ok(None)
            }
        }

        let mut pump = FramePump::start(Idle, handles(2, 1), Duration::from_secs(60)).unwrap();
        pump.stop();
        assert!(pump.is_finished());
    }
}
