//! Output device enumeration and lookup

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// Summary of an output device for listing
#[derive(Debug, Clone)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// Wrapper around a cpal output device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self { inner: device, name }
    }

    pub fn inner(&self) -> &cpal::Device {
        &self.inner
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    /// Get default output config
    pub fn default_output_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_output_config()
            .map_err(|e| AudioError::DeviceNotFound(e.to_string()))
    }

    /// Whether the device can play `channels` channels at `sample_rate`
    pub fn supports(&self, sample_rate: u32, channels: u16) -> bool {
        let rate = cpal::SampleRate(sample_rate);
        self.inner
            .supported_output_configs()
            .map(|mut configs| {
                configs.any(|c| {
                    c.channels() == channels
                        && rate >= c.min_sample_rate()
                        && rate <= c.max_sample_rate()
                })
            })
            .unwrap_or(false)
    }
}

/// List all output devices on the default host
pub fn list_output_devices() -> Vec<OutputDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let Ok(devices) = host.output_devices() else {
        return Vec::new();
    };

    devices
        .filter_map(|device| {
            let name = device.name().ok()?;
            let (sample_rates, channels) = output_capabilities(&device);
            Some(OutputDeviceInfo {
                is_default: default_name.as_ref() == Some(&name),
                name,
                sample_rates,
                channels,
            })
        })
        .collect()
}

/// Common sample rates and channel counts the device accepts
fn output_capabilities(device: &cpal::Device) -> (Vec<u32>, Vec<u16>) {
    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();

    if let Ok(configs) = device.supported_output_configs() {
        for config in configs {
            for rate_val in [22050u32, 44100, 48000, 96000] {
                let rate = cpal::SampleRate(rate_val);
                if rate >= config.min_sample_rate()
                    && rate <= config.max_sample_rate()
                    && !sample_rates.contains(&rate_val)
                {
                    sample_rates.push(rate_val);
                }
            }

            let ch = config.channels();
            if !channels.contains(&ch) {
                channels.push(ch);
            }
        }
    }

    sample_rates.sort_unstable();
    channels.sort_unstable();
    (sample_rates, channels)
}

/// Find an output device by name, or the default one when `name` is `None`
pub fn get_output_device(name: Option<&str>) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();

    let Some(name) = name else {
        return host
            .default_output_device()
            .map(AudioDevice::from_cpal)
            .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()));
    };

    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(AudioDevice::from_cpal(device));
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}
