//! # Media Stream Receiver
//!
//! Receive-side client for a decoded media stream (colour, depth, audio).
//! Decoded frames arrive on a producer thread at irregular intervals; audio
//! leaves through a real-time output callback with a hard deadline. A bounded
//! ring buffer is the only state the two share.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                          PRODUCER THREAD                                 │
//! │  ┌──────────────────┐      ┌───────────────────────────────────────┐     │
//! │  │   FrameSource    │─────▶│  FramePump (source::pump)             │     │
//! │  │ (decode/network) │      │  colour/depth → FrameRateMeter        │     │
//! │  └──────────────────┘      │  audio        → overwrite(block)      │     │
//! │                            │               → StartGate arrival     │     │
//! │                            └───────────────────┬───────────────────┘     │
//! └────────────────────────────────────────────────┼─────────────────────────┘
//!                                                  │
//!                                                  ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │            SharedBlockBuffer (audio::buffer) - one short lock            │
//! │   ┌────┬────┬────┬────┬────┬────┬────┬────┐                             │
//! │   │ B3 │ B4 │ B5 │    │    │    │ B1 │ B2 │   BlockRingBuffer (ring)     │
//! │   └────┴────┴────┴────┴────┴────┴────┴────┘   head/tail/size             │
//! │                 ▲ head                ▲ tail                             │
//! └──────────────────────────────────────────────────────────────────────────┘
//!                                                  │ try_lock, never waits
//!                                                  ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                         REAL-TIME SINK                                   │
//! │  RenderCallback (audio::stream)                                          │
//! │    stopped / gate closed / lock busy → silence                           │
//! │    otherwise BlockStreamReader drains blocks, zero-pads on underrun      │
//! │  driven by AudioPlayback (cpal) or HeadlessSink (paced thread)           │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod ring;
pub mod session;
pub mod source;
pub mod stats;

pub use error::{BufferError, Error, Result};
pub use ring::{BlockRingBuffer, ElementRingBuffer, ReadOutcome, RingState};
pub use session::StreamSession;

/// Application-wide constants
pub mod constants {
    /// Name used for config directories
    pub const APP_NAME: &str = "media-stream-receiver";

    /// Audio sample rate of the incoming stream
    pub const AUDIO_SAMPLE_RATE: u32 = 22050;

    /// Incoming audio is mono
    pub const AUDIO_CHANNELS: u16 = 1;

    /// Samples per decoded audio frame (one ring block)
    pub const AUDIO_BLOCK_LEN: usize = 1400;

    /// Blocks held by the audio ring buffer
    pub const AUDIO_BLOCK_CAPACITY: usize = 20;

    /// Audio frames to collect before output starts
    pub const PREBUFFER_BLOCKS: usize = 15;

    /// Samples pulled per headless sink callback
    pub const SINK_CHUNK_LEN: usize = 1024;
}
