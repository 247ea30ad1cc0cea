// Audio capture error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1008
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Requested input device does not exist
    pub const DEVICE_NOT_FOUND: i32 = 1001;

    /// Host has no default input device
    pub const NO_INPUT_DEVICE: i32 = 1002;

    /// Selected device exposes zero input channels
    pub const NO_INPUT_CHANNELS: i32 = 1003;

    /// Device sample format is not supported by the capture callback
    pub const UNSUPPORTED_SAMPLE_FORMAT: i32 = 1004;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1005;

    /// Failed to start or pause an open stream
    pub const STREAM_CONTROL_FAILED: i32 = 1006;

    /// Published frame does not match the configured frame size
    pub const FRAME_SIZE_MISMATCH: i32 = 1007;

    /// WAV fixture could not be read
    pub const WAV_LOAD_FAILED: i32 = 1008;
}

/// Log an audio error with structured context
///
/// Emits the error code, component, and message on the `error` level.
/// Never called from the real-time capture callback.
pub fn log_audio_error(err: &AudioError, context: &str) {
    tracing::error!(
        "Audio error in {}: code={}, component=AudioCapture, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover device selection, stream management, and frame
/// hand-off. Device and stream errors are fatal at startup.
///
/// Error code range: 1001-1008
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No input device with the requested name
    DeviceNotFound { name: String },

    /// Host reports no default input device
    NoInputDevice,

    /// Selected device has no input channels
    NoInputChannels { device: String },

    /// Only f32 capture is supported
    UnsupportedSampleFormat { format: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Failed to play or pause the stream
    StreamControlFailed { reason: String },

    /// Frame length differs from the configured frame size
    FrameSizeMismatch { expected: usize, actual: usize },

    /// WAV file could not be opened or decoded
    WavLoadFailed { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::DeviceNotFound { .. } => AudioErrorCodes::DEVICE_NOT_FOUND,
            AudioError::NoInputDevice => AudioErrorCodes::NO_INPUT_DEVICE,
            AudioError::NoInputChannels { .. } => AudioErrorCodes::NO_INPUT_CHANNELS,
            AudioError::UnsupportedSampleFormat { .. } => {
                AudioErrorCodes::UNSUPPORTED_SAMPLE_FORMAT
            }
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::StreamControlFailed { .. } => AudioErrorCodes::STREAM_CONTROL_FAILED,
            AudioError::FrameSizeMismatch { .. } => AudioErrorCodes::FRAME_SIZE_MISMATCH,
            AudioError::WavLoadFailed { .. } => AudioErrorCodes::WAV_LOAD_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::DeviceNotFound { name } => {
                format!("Input device '{}' not found", name)
            }
            AudioError::NoInputDevice => "No default input device found".to_string(),
            AudioError::NoInputChannels { device } => {
                format!("Selected device '{}' has no input channels", device)
            }
            AudioError::UnsupportedSampleFormat { format } => {
                format!(
                    "Sample format {} is not supported (only f32 capture)",
                    format
                )
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::StreamControlFailed { reason } => {
                format!("Audio stream control failed: {}", reason)
            }
            AudioError::FrameSizeMismatch { expected, actual } => {
                format!(
                    "Frame size mismatch: expected {} samples, got {}",
                    expected, actual
                )
            }
            AudioError::WavLoadFailed { reason } => {
                format!("Failed to load WAV file: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::WavLoadFailed {
            reason: err.to_string(),
        }
    }
}
