//! Real-time audio output through the default device

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("No audio output devices found")]
    NoDevices,
    #[error("Failed to get default output config: {0}")]
    ConfigError(String),
    #[error("Failed to build output stream: {0}")]
    StreamError(String),
}

/// Default output device name, sample rate and channel count
pub fn default_output_info() -> Result<(String, u32, u16), AudioOutputError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioOutputError::NoDevices)?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioOutputError::ConfigError(e.to_string()))?;

    let name = device.name().unwrap_or_default();
    Ok((name, config.sample_rate().0, config.channels()))
}

/// Output stream that pulls interleaved samples from a callback
pub struct RealtimeOutputStream {
    stop_flag: Arc<AtomicBool>,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl RealtimeOutputStream {
    /// Start a stream on the default device. The callback receives the
    /// interleaved buffer, the device sample rate and the channel count.
    pub fn start<F>(sample_callback: F) -> Result<Self, AudioOutputError>
    where
        F: FnMut(&mut [f32], u32, u16) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::NoDevices)?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioOutputError::ConfigError(e.to_string()))?;

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let config: StreamConfig = supported_config.into();
        let callback = Arc::new(Mutex::new(sample_callback));

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if stop_clone.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        return;
                    }
                    let Ok(mut cb) = callback.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    cb(data, sample_rate, channels);
                },
                move |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioOutputError::StreamError(e.to_string()))?;

        stream.play().map_err(|e| AudioOutputError::StreamError(e.to_string()))?;

        info!(sample_rate, channels, "Started realtime output stream");

        Ok(Self { stop_flag, sample_rate, _stream: stream })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

impl Drop for RealtimeOutputStream {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}
