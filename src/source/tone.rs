//! Synthetic frame source
//!
//! Emits a sine tone cut into ring-sized blocks, optionally with a grey
//! colour plane, at the real-time rate of the configured stream. Stands in
//! for the decoder when running headless and in tests.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use crate::audio::buffer::Sample;
use crate::config::{AudioConfig, SourceConfig};
use crate::error::SourceError;
use crate::source::{DecodedFrame, FrameSource, VideoPlane};

/// Sine tone generator paced at one block per block duration
pub struct ToneSource {
    sample_rate: u32,
    block_len: usize,
    frequency: f32,
    amplitude: f32,
    phase: f32,
    video: Option<(u32, u32)>,
    interval: Duration,
    next_due: Option<Instant>,
    sequence: u32,
    limit: Option<u32>,
    start: Instant,
}

impl ToneSource {
    pub fn new(audio: &AudioConfig, source: &SourceConfig) -> Self {
        Self {
            sample_rate: audio.sample_rate,
            block_len: audio.block_len,
            frequency: source.tone_hz,
            amplitude: source.amplitude,
            phase: 0.0,
            video: source
                .with_video
                .then_some((source.video_width, source.video_height)),
            interval: audio.block_duration(),
            next_due: None,
            sequence: 0,
            limit: None,
            start: Instant::now(),
        }
    }

    /// Close after `frames` frames
    pub fn with_limit(mut self, frames: u32) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Emit frames as fast as they are polled
    pub fn unpaced(mut self) -> Self {
        self.interval = Duration::ZERO;
        self
    }

    pub fn frames_emitted(&self) -> u32 {
        self.sequence
    }

    fn next_block(&mut self) -> Vec<Sample> {
        let step = TAU * self.frequency / self.sample_rate as f32;
        let mut block = Vec::with_capacity(self.block_len);
        for _ in 0..self.block_len {
            block.push(self.phase.sin() * self.amplitude);
            self.phase = (self.phase + step) % TAU;
        }
        block
    }

    fn next_plane(&self) -> Option<VideoPlane> {
        let (width, height) = self.video?;
        let shade = (self.sequence % 256) as u8;
        Some(VideoPlane {
            width,
            height,
            linesize: width as usize,
            data: vec![shade; width as usize * height as usize],
        })
    }
}

impl FrameSource for ToneSource {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, SourceError> {
        if self.limit.is_some_and(|limit| self.sequence >= limit) {
            return Err(SourceError::Closed);
        }

        let now = Instant::now();
        let due = *self.next_due.get_or_insert(now);
        if now < due {
            return Ok(None);
        }
        self.next_due = Some(due + self.interval);

        let frame = DecodedFrame {
            sequence: self.sequence,
            timestamp_us: now.duration_since(self.start).as_micros() as u64,
            color: self.next_plane(),
            depth: None,
            audio: Some(self.next_block()),
        };
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }
}
