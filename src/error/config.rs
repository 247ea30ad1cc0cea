// Configuration validation errors

use crate::error::ErrorCode;
use std::fmt;

/// Config error code constants
///
/// Error code range: 3001-3009
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    pub const ZERO_FRAME_SIZE: i32 = 3001;
    pub const ODD_FRAME_SIZE: i32 = 3002;
    pub const ZERO_SAMPLE_RATE: i32 = 3003;
    pub const MIN_FREQUENCY_ABOVE_NYQUIST: i32 = 3004;
    pub const INVALID_BRIGHTNESS: i32 = 3005;
    pub const ZERO_LEDS: i32 = 3006;
    pub const INVALID_THRESHOLD: i32 = 3007;
    pub const INVALID_REFERENCE_PITCH: i32 = 3008;
    pub const INVALID_LEDS_PER_NOTE: i32 = 3009;
}

/// Invalid configuration values, detected before the pipeline is built
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroFrameSize,
    OddFrameSize { frame_size: usize },
    ZeroSampleRate,
    MinFrequencyAboveNyquist { min_frequency_hz: f32, nyquist_hz: f32 },
    InvalidBrightness { brightness: f32 },
    ZeroLeds,
    InvalidThreshold { threshold: f32 },
    InvalidReferencePitch { reference_pitch_hz: f64 },
    InvalidLedsPerNote { leds_per_note: usize },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::ZeroFrameSize => ConfigErrorCodes::ZERO_FRAME_SIZE,
            ConfigError::OddFrameSize { .. } => ConfigErrorCodes::ODD_FRAME_SIZE,
            ConfigError::ZeroSampleRate => ConfigErrorCodes::ZERO_SAMPLE_RATE,
            ConfigError::MinFrequencyAboveNyquist { .. } => {
                ConfigErrorCodes::MIN_FREQUENCY_ABOVE_NYQUIST
            }
            ConfigError::InvalidBrightness { .. } => ConfigErrorCodes::INVALID_BRIGHTNESS,
            ConfigError::ZeroLeds => ConfigErrorCodes::ZERO_LEDS,
            ConfigError::InvalidThreshold { .. } => ConfigErrorCodes::INVALID_THRESHOLD,
            ConfigError::InvalidReferencePitch { .. } => ConfigErrorCodes::INVALID_REFERENCE_PITCH,
            ConfigError::InvalidLedsPerNote { .. } => ConfigErrorCodes::INVALID_LEDS_PER_NOTE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::ZeroFrameSize => "Frame size must be greater than 0".to_string(),
            ConfigError::OddFrameSize { frame_size } => {
                format!("Frame size must be even (got {})", frame_size)
            }
            ConfigError::ZeroSampleRate => "Sample rate must be greater than 0".to_string(),
            ConfigError::MinFrequencyAboveNyquist {
                min_frequency_hz,
                nyquist_hz,
            } => format!(
                "Minimum frequency {} Hz is above the Nyquist frequency {} Hz",
                min_frequency_hz, nyquist_hz
            ),
            ConfigError::InvalidBrightness { brightness } => {
                format!("Brightness must be within 0.0..=1.0 (got {})", brightness)
            }
            ConfigError::ZeroLeds => "Strip must have at least one LED".to_string(),
            ConfigError::InvalidThreshold { threshold } => {
                format!(
                    "Magnitude threshold must be a finite non-negative number (got {})",
                    threshold
                )
            }
            ConfigError::InvalidReferencePitch { reference_pitch_hz } => format!(
                "Reference pitch must be a finite frequency above 0 Hz (got {})",
                reference_pitch_hz
            ),
            ConfigError::InvalidLedsPerNote { leds_per_note } => format!(
                "LEDs per note must be between 1 and {} (got {})",
                crate::config::MAX_LEDS_PER_NOTE,
                leds_per_note
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
