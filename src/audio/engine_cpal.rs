use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::time::Duration;

use super::capture::{CallbackStatus, CaptureCallback, CaptureStats, CaptureStream};
use super::frame_exchange::FrameExchange;
use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::shutdown::ShutdownFlag;

/// Gap between consecutive capture timestamps, relative to the block length,
/// above which the block is reported as following an overrun.
const OVERRUN_GAP_FACTOR: f64 = 1.5;

/// Live microphone capture through cpal
pub struct CpalCapture {
    /// Input audio stream
    stream: Option<cpal::Stream>,
    device_name: String,
    stats: Arc<CaptureStats>,
}

impl CpalCapture {
    /// Open and start an input stream that publishes frames into `exchange`
    ///
    /// # Errors
    /// - `DeviceNotFound` / `NoInputDevice` when no device can be selected
    /// - `NoInputChannels` when the device has no inputs
    /// - `UnsupportedSampleFormat` for non-f32 devices
    /// - `StreamOpenFailed` / `StreamControlFailed` from the backend
    pub fn start(
        config: &AudioConfig,
        exchange: Arc<FrameExchange>,
        shutdown: ShutdownFlag,
    ) -> Result<Self, AudioError> {
        let device = select_input_device(config.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;

        if supported.channels() == 0 {
            return Err(AudioError::NoInputChannels {
                device: device_name,
            });
        }
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedSampleFormat {
                format: format!("{:?}", supported.sample_format()),
            });
        }

        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels_count = stream_config.channels as usize;
        let sample_rate = config.sample_rate as f64;

        let mut callback = CaptureCallback::new(exchange, shutdown, channels_count)?;
        let stats = callback.stats();

        let mut last_capture: Option<cpal::StreamInstant> = None;
        let err_fn = |err| tracing::warn!("[Capture] Input stream error: {}", err);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], info: &cpal::InputCallbackInfo| {
                    let capture = info.timestamp().capture;
                    let block_secs = (data.len() / channels_count) as f64 / sample_rate;
                    let overflow = last_capture
                        .and_then(|previous| capture.duration_since(&previous))
                        .map(|gap: Duration| gap.as_secs_f64() > block_secs * OVERRUN_GAP_FACTOR)
                        .unwrap_or(false);
                    last_capture = Some(capture);

                    // cpal has no stop-from-callback; after `Stop` the callback
                    // ignores further blocks until the main thread drops the stream.
                    let _status: CallbackStatus = callback.on_input(data, overflow);
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        stream.play().map_err(|e| AudioError::StreamControlFailed {
            reason: format!("Input start failed: {}", e),
        })?;

        tracing::info!(
            "[Capture] Streaming audio from '{}' ({} ch @ {} Hz)",
            device_name,
            channels_count,
            config.sample_rate
        );

        Ok(Self {
            stream: Some(stream),
            device_name,
            stats,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl CaptureStream for CpalCapture {
    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            let paused = stream.pause().map_err(|e| AudioError::StreamControlFailed {
                reason: format!("Input pause failed: {}", e),
            });
            drop(stream);
            tracing::info!("[Capture] Stream '{}' closed", self.device_name);
            paused?;
        }
        Ok(())
    }

    fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn select_input_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();

    match name {
        None => host.default_input_device().ok_or(AudioError::NoInputDevice),
        Some(wanted) => {
            let mut devices =
                host.input_devices()
                    .map_err(|e| AudioError::StreamOpenFailed {
                        reason: format!("Failed to enumerate input devices: {:?}", e),
                    })?;
            devices
                .find(|device| device.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: wanted.to_string(),
                })
        }
    }
}

/// Names of all input devices on the default host
pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to enumerate input devices: {:?}", e),
        })?;
    Ok(devices.filter_map(|device| device.name().ok()).collect())
}
