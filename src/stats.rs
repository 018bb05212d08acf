//! Stream statistics
//!
//! Frame rates are measured over one-second windows: totals are counted
//! with atomics on the producer thread, and the window rolls over whenever
//! someone samples the meter at least a second after the last rollover.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::audio::buffer::BufferStats;

const WINDOW: Duration = Duration::from_secs(1);

/// Frames per second of the last complete window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameRates {
    pub video_fps: u64,
    pub audio_fps: u64,
}

struct Window {
    start: Instant,
    video_at_start: u64,
    audio_at_start: u64,
    rates: FrameRates,
}

/// Counts video frames and audio blocks as they arrive
pub struct FrameRateMeter {
    video_total: AtomicU64,
    audio_total: AtomicU64,
    window: Mutex<Window>,
}

impl FrameRateMeter {
    pub fn new() -> Self {
        Self {
            video_total: AtomicU64::new(0),
            audio_total: AtomicU64::new(0),
            window: Mutex::new(Window {
                start: Instant::now(),
                video_at_start: 0,
                audio_at_start: 0,
                rates: FrameRates::default(),
            }),
        }
    }

    pub fn record_video(&self) {
        self.video_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audio(&self) {
        self.audio_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn video_total(&self) -> u64 {
        self.video_total.load(Ordering::Relaxed)
    }

    pub fn audio_total(&self) -> u64 {
        self.audio_total.load(Ordering::Relaxed)
    }

    /// Rates of the last complete window, rolling it over if it has ended
    pub fn sample(&self) -> FrameRates {
        self.sample_at(Instant::now())
    }

    fn sample_at(&self, now: Instant) -> FrameRates {
        let mut window = self.window.lock();
        let elapsed = now.saturating_duration_since(window.start);
        if elapsed >= WINDOW {
            let video = self.video_total();
            let audio = self.audio_total();
            let secs = elapsed.as_secs_f64();

            window.rates = FrameRates {
                video_fps: ((video - window.video_at_start) as f64 / secs).round() as u64,
                audio_fps: ((audio - window.audio_at_start) as f64 / secs).round() as u64,
            };
            window.start = now;
            window.video_at_start = video;
            window.audio_at_start = audio;
        }
        window.rates
    }
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a running session
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub video_frames: u64,
    pub audio_blocks: u64,
    pub rates: FrameRates,
    pub buffer: BufferStats,
    pub playing: bool,
}

impl fmt::Display for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "video {} frames ({} fps), audio {} blocks ({} blocks/s), buffer {}/{} ({:.0}%), {} overruns, {} underruns, {}",
            self.video_frames,
            self.rates.video_fps,
            self.audio_blocks,
            self.rates.audio_fps,
            self.buffer.level,
            self.buffer.capacity,
            self.buffer.fill_level() * 100.0,
            self.buffer.overruns,
            self.buffer.underruns,
            if self.playing { "playing" } else { "prebuffering" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rollover() {
        let meter = FrameRateMeter::new();
        let start = meter.window.lock().start;

        for _ in 0..30 {
            meter.record_video();
        }
        for _ in 0..15 {
            meter.record_audio();
        }

        // window not complete yet
        assert_eq!(meter.sample_at(start + Duration::from_millis(500)), FrameRates::default());

        let rates = meter.sample_at(start + Duration::from_secs(1));
        assert_eq!(rates, FrameRates { video_fps: 30, audio_fps: 15 });

        // next window starts from the new totals
        meter.record_video();
        let rates = meter.sample_at(start + Duration::from_secs(2));
        assert_eq!(rates, FrameRates { video_fps: 1, audio_fps: 0 });
        assert_eq!(meter.video_total(), 31);
    }

    #[test]
    fn test_display_mentions_state() {
        let stats = StreamStats {
            video_frames: 10,
            audio_blocks: 5,
            rates: FrameRates::default(),
            buffer: BufferStats {
                level: 2,
                capacity: 4,
                overruns: 1,
                underruns: 0,
            },
            playing: false,
        };
        let line = stats.to_string();
        assert!(line.contains("buffer 2/4 (50%)"));
        assert!(line.ends_with("prebuffering"));
    }
}
