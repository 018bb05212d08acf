//! Error types for the media stream receiver

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ring buffer contract violations
///
/// Underrun and overrun are not in this list: an underrun is reported through
/// the read outcome and an overrun is absorbed by `overwrite`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded { requested: usize, available: usize },

    #[error("Read from empty buffer")]
    EmptyBufferRead,

    #[error("Index {index} out of range for capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("Block size mismatch: expected {expected}, got {actual}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    #[error("Buffer capacity and block length must be non-zero")]
    ZeroCapacity,

    #[error("Buffer of {capacity} blocks of {block_len} elements is too large")]
    TooLarge { capacity: usize, block_len: usize },
}

/// Audio output errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cpal error: {0}")]
    CpalError(String),
}

/// Frame producer errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source not ready: {0}")]
    NotReady(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Source thread failed: {0}")]
    Thread(String),

    #[error("Source closed")]
    Closed,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
