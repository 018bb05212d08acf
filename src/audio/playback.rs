//! Audio output through cpal
//!
//! The cpal data callback is the real-time sink: it calls
//! [`RenderCallback::render`] and nothing else that could block. The stream
//! lives on its own thread because cpal streams are not `Send` on every
//! platform.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{StreamConfig, SupportedBufferSize};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::Sample;
use crate::audio::device::get_output_device;
use crate::audio::stream::RenderCallback;
use crate::error::AudioError;

/// Frames of mono scratch allocated up front for upmixing
const SCRATCH_FRAMES: usize = 8192;
/// Upper bound on the scratch, for drivers reporting an absurd maximum period
const MAX_SCRATCH_FRAMES: usize = 1 << 16;

/// Scratch length covering the largest period the device reports
fn scratch_frames(buffer_size: &SupportedBufferSize) -> usize {
    match buffer_size {
        SupportedBufferSize::Range { max, .. } => {
            (*max as usize).clamp(SCRATCH_FRAMES, MAX_SCRATCH_FRAMES)
        }
        SupportedBufferSize::Unknown => SCRATCH_FRAMES,
    }
}

/// Audio playback on an output device
pub struct AudioPlayback {
    device_name: Option<String>,
    source_channels: u16,
    config: StreamConfig,
    scratch_frames: usize,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Option<Receiver<AudioError>>,
}

impl AudioPlayback {
    /// Prepare playback of a `source_channels` stream at `sample_rate`
    ///
    /// A mono stream is duplicated onto every device channel; any other
    /// layout must match the device.
    pub fn new(
        device_name: Option<&str>,
        sample_rate: u32,
        source_channels: u16,
    ) -> Result<Self, AudioError> {
        let device = get_output_device(device_name)?;
        let default_config = device.default_output_config()?;
        let device_channels = default_config.channels();

        if source_channels != 1 && source_channels != device_channels {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} source channels on a {} channel device",
                source_channels, device_channels
            )));
        }
        if !device.supports(sample_rate, device_channels) {
            tracing::warn!(
                "Device {} does not list {} Hz, opening anyway",
                device.name,
                sample_rate
            );
        }

        Ok(Self {
            device_name: device_name.map(str::to_string),
            source_channels,
            config: StreamConfig {
                channels: device_channels,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            },
            scratch_frames: scratch_frames(default_config.buffer_size()),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            error_rx: None,
        })
    }

    /// Open the stream and start pulling from `callback`
    pub fn start(&mut self, mut callback: RenderCallback) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = get_output_device(self.device_name.as_deref())?;
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let config = self.config.clone();
        let device_channels = self.config.channels as usize;
        let upmix = self.source_channels == 1 && device_channels > 1;
        let scratch_len = self.scratch_frames;

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || {
                let cpal_device = device.into_inner();
                let mut scratch = vec![0.0 as Sample; scratch_len];

                let stream = cpal_device.build_output_stream(
                    &config,
                    move |data: &mut [Sample], _: &cpal::OutputCallbackInfo| {
                        if !upmix {
                            callback.render(data);
                            return;
                        }

                        let frames = data.len() / device_channels;
                        if frames > scratch.len() {
                            // no allocation on this thread
                            callback.skip(data);
                            return;
                        }
                        callback.render(&mut scratch[..frames]);
                        for (frame, &sample) in data.chunks_exact_mut(device_channels).zip(&scratch) {
                            frame.fill(sample);
                        }
                    },
                    move |err| {
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::CpalError(e.to_string())));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::CpalError(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }
                // stream dropped here, device stops pulling
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(AudioError::StreamError("playback thread exited".into())));
        if let Err(e) = ready {
            self.stop();
            return Err(e);
        }

        tracing::info!(
            "Playback started: {} Hz, {} device channels",
            self.config.sample_rate.0,
            self.config.channels
        );
        Ok(())
    }

    /// Stop playback and close the stream
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Next stream error reported by the driver, if any
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
