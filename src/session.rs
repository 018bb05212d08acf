//! Stream session: one buffer, one producer, one sink
//!
//! The session owns the lifecycle around the shared buffer. Teardown runs
//! in a fixed order: the producer stops first, then the sink is switched to
//! silence and stopped, then the buffer is cleared. The storage itself is
//! released when the last handle to it drops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::buffer::{create_shared_block_buffer, SharedBlockHandle};
use crate::audio::headless::HeadlessSink;
#[cfg(feature = "playback")]
use crate::audio::playback::AudioPlayback;
use crate::audio::stream::{RenderCallback, StartGate};
use crate::config::AudioConfig;
use crate::error::{AudioError, Result};
use crate::source::{FramePump, FrameSource, PumpHandles};
use crate::stats::{FrameRateMeter, StreamStats};

/// Where rendered audio goes
enum Sink {
    Headless(HeadlessSink),
    #[cfg(feature = "playback")]
    Device(AudioPlayback),
}

impl Sink {
    fn stop(&mut self) {
        match self {
            Sink::Headless(sink) => sink.stop(),
            #[cfg(feature = "playback")]
            Sink::Device(playback) => playback.stop(),
        }
    }
}

/// A receive stream from setup to teardown
pub struct StreamSession {
    config: AudioConfig,
    buffer: SharedBlockHandle,
    gate: Arc<StartGate>,
    meter: Arc<FrameRateMeter>,
    running: Arc<AtomicBool>,
    pump: Option<FramePump>,
    sink: Option<Sink>,
}

impl StreamSession {
    /// Allocate the audio buffer for `config`; nothing runs yet
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let buffer = create_shared_block_buffer(config.block_capacity, config.block_len)?;

        tracing::info!(
            "Audio buffer: {} blocks of {} samples ({:?} each), start after {} blocks",
            config.block_capacity,
            config.block_len,
            config.block_duration(),
            config.prebuffer_blocks
        );

        Ok(Self {
            config: config.clone(),
            buffer,
            gate: Arc::new(StartGate::new(config.prebuffer_blocks)),
            meter: Arc::new(FrameRateMeter::new()),
            running: Arc::new(AtomicBool::new(true)),
            pump: None,
            sink: None,
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn buffer(&self) -> &SharedBlockHandle {
        &self.buffer
    }

    pub fn gate(&self) -> &Arc<StartGate> {
        &self.gate
    }

    /// False once the session has been shut down
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// A sink-side callback bound to this session's buffer
    ///
    /// It outputs silence once the session is shut down.
    pub fn render_callback(&self) -> RenderCallback {
        RenderCallback::new(self.buffer.clone(), self.gate.clone(), self.running.clone())
    }

    pub fn pump_handles(&self) -> PumpHandles {
        PumpHandles {
            buffer: self.buffer.clone(),
            gate: self.gate.clone(),
            meter: self.meter.clone(),
        }
    }

    /// Start the producer thread, replacing any previous one
    pub fn start_source<S>(&mut self, source: S, poll_interval: Duration) -> Result<()>
    where
        S: FrameSource + 'static,
    {
        self.ensure_running()?;
        if let Some(mut old) = self.pump.take() {
            old.stop();
        }

        self.pump = Some(FramePump::start(source, self.pump_handles(), poll_interval)?);
        tracing::info!("Frame source started");
        Ok(())
    }

    /// Drive output from a paced thread instead of a device
    pub fn start_headless(&mut self) -> Result<()> {
        let sink = HeadlessSink::new(self.config.sink_chunk_len, self.config.sink_period());
        self.start_headless_with(sink)
    }

    /// Like `start_headless` with a caller-built sink (e.g. one with a tap)
    pub fn start_headless_with(&mut self, mut sink: HeadlessSink) -> Result<()> {
        self.ensure_running()?;
        self.stop_sink();

        sink.start(self.render_callback())?;
        tracing::info!("Headless sink started, period {:?}", sink.period());
        self.sink = Some(Sink::Headless(sink));
        Ok(())
    }

    /// Drive output from the configured audio device
    #[cfg(feature = "playback")]
    pub fn start_playback(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.stop_sink();

        let mut playback = AudioPlayback::new(
            self.config.output_device.as_deref(),
            self.config.sample_rate,
            self.config.channels,
        )?;
        playback.start(self.render_callback())?;
        self.sink = Some(Sink::Device(playback));
        Ok(())
    }

    /// Next error reported by the output device, if any
    #[cfg(feature = "playback")]
    pub fn check_sink_errors(&self) -> Option<AudioError> {
        match &self.sink {
            Some(Sink::Device(playback)) => playback.check_errors(),
            _ => None,
        }
    }

    /// Whether the producer has exited (source closed or stopped)
    pub fn source_finished(&self) -> bool {
        self.pump.as_ref().map_or(true, FramePump::is_finished)
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            video_frames: self.meter.video_total(),
            audio_blocks: self.meter.audio_total(),
            rates: self.meter.sample(),
            buffer: self.buffer.stats(),
            playing: self.is_running() && self.gate.is_open(),
        }
    }

    /// Tear the stream down; idempotent
    pub fn shutdown(&mut self) {
        let was_running = self.running.load(Ordering::Acquire);

        if let Some(mut pump) = self.pump.take() {
            pump.stop();
        }

        // any callback still scheduled now writes silence
        self.running.store(false, Ordering::Release);
        self.stop_sink();

        self.buffer.clear();
        self.gate.reset();

        if was_running {
            tracing::info!("Stream session shut down");
        }
    }

    fn stop_sink(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.is_running() {
            return Err(AudioError::StreamError("session is shut down".into()).into());
        }
        Ok(())
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stream::Render;

    fn small_config() -> AudioConfig {
        AudioConfig {
            sample_rate: 8000,
            block_len: 4,
            block_capacity: 4,
            prebuffer_blocks: 1,
            sink_chunk_len: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        let config = AudioConfig {
            block_capacity: 0,
            ..small_config()
        };
        assert!(StreamSession::new(&config).is_err());
    }

    #[test]
    fn test_shutdown_silences_and_clears() {
        let mut session = StreamSession::new(&small_config()).unwrap();
        let handles = session.pump_handles();
        let mut callback = session.render_callback();

        handles.buffer.push(&[0.5; 4]).unwrap();
        handles.gate.record_arrival();
        handles.buffer.push(&[0.25; 4]).unwrap();

        let mut out = [0.0; 4];
        assert!(matches!(callback.render(&mut out), Render::Played(_)));
        assert_eq!(out, [0.5; 4]);

        session.shutdown();
        assert!(!session.is_running());
        assert!(session.buffer().is_empty());
        assert!(!session.gate().is_open());

        out = [1.0; 4];
        assert_eq!(callback.render(&mut out), Render::Stopped);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_start_after_shutdown_fails() {
        let mut session = StreamSession::new(&small_config()).unwrap();
        session.shutdown();
        assert!(session.start_headless().is_err());
        // second shutdown is a no-op
        session.shutdown();
    }

    #[test]
    fn test_stats_reflect_buffer() {
        let session = StreamSession::new(&small_config()).unwrap();
        session.pump_handles().accept(&crate::source::DecodedFrame {
            audio: Some(vec![0.1; 4]),
            ..Default::default()
        });

        let stats = session.stats();
        assert_eq!(stats.audio_blocks, 1);
        assert_eq!(stats.buffer.level, 1);
        assert!(stats.playing);
        assert!(session.source_finished());
    }
}
