//! Frame producer interface
//!
//! Decoding and transport happen elsewhere. This crate only sees decoded
//! frames handed over by a [`FrameSource`]; the [`FramePump`] moves them
//! from the source into the shared audio buffer on a producer thread.

pub mod pump;
pub mod tone;

pub use pump::{FramePump, PumpHandles};
pub use tone::ToneSource;

use crate::audio::buffer::Sample;
use crate::error::SourceError;

/// One decoded picture plane (colour or depth)
#[derive(Debug, Clone)]
pub struct VideoPlane {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including any padding
    pub linesize: usize,
    pub data: Vec<u8>,
}

impl VideoPlane {
    /// A plane carries a picture only if it has rows with content
    pub fn is_present(&self) -> bool {
        self.linesize > 0 && !self.data.is_empty()
    }
}

/// A decoded frame as delivered by the producer
#[derive(Debug, Clone, Default)]
pub struct DecodedFrame {
    pub sequence: u32,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
    pub color: Option<VideoPlane>,
    pub depth: Option<VideoPlane>,
    /// Raw PCM, exactly one ring block long
    pub audio: Option<Vec<Sample>>,
}

impl DecodedFrame {
    pub fn has_video(&self) -> bool {
        self.color.as_ref().is_some_and(VideoPlane::is_present)
    }

    pub fn has_depth(&self) -> bool {
        self.depth.as_ref().is_some_and(VideoPlane::is_present)
    }

    /// Audio samples, if the frame carries any
    pub fn audio_samples(&self) -> Option<&[Sample]> {
        self.audio.as_deref().filter(|samples| !samples.is_empty())
    }
}

/// Source of decoded frames, polled from the producer thread
pub trait FrameSource: Send {
    /// Next frame if one is ready
    ///
    /// `Ok(None)` means nothing is ready yet and the caller should poll
    /// again later. `Err(SourceError::Closed)` ends the stream.
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, SourceError> {
        (**self).next_frame()
    }
}
