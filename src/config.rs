//! Application configuration
//!
//! Loaded from TOML. Every section has defaults so a partial file (or no
//! file at all) is valid. Buffer geometry is fixed once a session is built.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds between stats log lines in the receiver
    pub stats_interval_secs: u64,
    pub audio: AudioConfig,
    pub source: SourceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: 5,
            audio: AudioConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

/// Audio stream and ring buffer geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples per block; every incoming audio frame must have this length
    pub block_len: usize,
    /// Blocks the ring buffer can hold
    pub block_capacity: usize,
    /// Blocks that must arrive before output leaves silence
    pub prebuffer_blocks: usize,
    /// Samples the headless sink pulls per callback
    pub sink_chunk_len: usize,
    /// Output device name, default device when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
            block_len: AUDIO_BLOCK_LEN,
            block_capacity: AUDIO_BLOCK_CAPACITY,
            prebuffer_blocks: PREBUFFER_BLOCKS,
            sink_chunk_len: SINK_CHUNK_LEN,
            output_device: None,
        }
    }
}

impl AudioConfig {
    /// Duration of one block at the configured sample rate
    pub fn block_duration(&self) -> Duration {
        self.samples_to_duration(self.block_len)
    }

    /// Period of one sink callback at the configured sample rate
    pub fn sink_period(&self) -> Duration {
        self.samples_to_duration(self.sink_chunk_len)
    }

    fn samples_to_duration(&self, interleaved: usize) -> Duration {
        let frames = interleaved as f64 / self.channels.max(1) as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }
}

/// Synthetic frame source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub tone_hz: f32,
    pub amplitude: f32,
    /// Attach a colour plane to every frame
    pub with_video: bool,
    pub video_width: u32,
    pub video_height: u32,
    /// How long the pump idles when the source has nothing ready
    pub poll_interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            tone_hz: 440.0,
            amplitude: 0.25,
            with_video: true,
            video_width: 64,
            video_height: 48,
            poll_interval_ms: 2,
        }
    }
}

impl SourceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Default config file location for the current user
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject geometry the ring buffers cannot be built with
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;

        if audio.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be non-zero".into()));
        }
        if audio.channels == 0 {
            return Err(Error::Config("channels must be non-zero".into()));
        }
        if audio.block_len == 0 || audio.block_capacity == 0 {
            return Err(Error::Config(
                "block_len and block_capacity must be non-zero".into(),
            ));
        }
        if audio.prebuffer_blocks > audio.block_capacity {
            return Err(Error::Config(format!(
                "prebuffer_blocks ({}) exceeds block_capacity ({})",
                audio.prebuffer_blocks, audio.block_capacity
            )));
        }
        if audio.sink_chunk_len == 0 {
            return Err(Error::Config("sink_chunk_len must be non-zero".into()));
        }
        if self.source.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero".into()));
        }

        Ok(())
    }
}
