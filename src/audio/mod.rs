//! Audio subsystem module

pub mod buffer;
#[cfg(feature = "playback")]
pub mod device;
pub mod headless;
#[cfg(feature = "playback")]
pub mod playback;
pub mod stream;

pub use buffer::{
    create_shared_block_buffer, create_shared_element_buffer, BufferStats, Sample,
    SharedBlockBuffer, SharedBlockHandle, SharedElementBuffer, SharedElementHandle,
};
#[cfg(feature = "playback")]
pub use device::{get_output_device, list_output_devices, AudioDevice, OutputDeviceInfo};
pub use headless::HeadlessSink;
#[cfg(feature = "playback")]
pub use playback::AudioPlayback;
pub use stream::{BlockStreamReader, Render, RenderCallback, StartGate};
