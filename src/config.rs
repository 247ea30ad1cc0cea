//! Configuration management for the note strip pipeline
//!
//! This module provides runtime configuration loading from JSON files so that
//! frame size, detection threshold, and strip layout can be tuned without
//! recompilation. Every section falls back to its defaults when absent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Upper bound for `strip.leds_per_note`
pub const MAX_LEDS_PER_NOTE: usize = 4096;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub analysis: AnalysisConfig,
    pub strip: StripConfig,
    pub pipeline: PipelineConfig,
}

/// Audio capture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Samples per analysis frame (fixed for the process lifetime)
    pub frame_size: usize,
    /// Input device name; the host default device is used when absent
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            frame_size: 2048,
            device: None,
        }
    }
}

/// Spectral analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bins below this frequency are ignored (DC and mains hum)
    pub min_frequency_hz: f32,
    /// A bin counts as a sounding note only above this magnitude
    pub magnitude_threshold: f32,
    /// Reference pitch for A4 (MIDI 69)
    pub reference_pitch_hz: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_frequency_hz: 70.0,
            magnitude_threshold: 45.0,
            reference_pitch_hz: 440.0,
        }
    }
}

/// How pitch classes are assigned colors from the palette table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteOrder {
    /// Palette row `i` colors chromatic pitch class `i`
    #[default]
    Chromatic,
    /// Palette rows follow the circle of fifths starting at C
    Fifths,
}

/// What a rendered frame shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Every active pitch class lights its own block
    #[default]
    Classes,
    /// The whole strip takes the color of the strongest bin's pitch class
    Dominant,
}

/// LED strip and SPI bus parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Number of LEDs on the strip
    pub num_leds: usize,
    /// Consecutive LEDs lit per pitch class
    pub leds_per_note: usize,
    /// spidev device node
    pub spi_device: String,
    /// SPI clock, three bus bits per protocol bit
    pub spi_clock_hz: u32,
    /// Dimming factor applied to every pixel write (0.0..=1.0)
    pub brightness: f32,
    /// Minimum idle time between frames
    pub reset_gap_us: u64,
    pub palette_order: PaletteOrder,
    pub render_mode: RenderMode,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            num_leds: 48,
            leds_per_note: 4,
            spi_device: "/dev/spidev0.0".to_string(),
            spi_clock_hz: 2_400_000,
            brightness: 1.0,
            reset_gap_us: 80,
            palette_order: PaletteOrder::Chromatic,
            render_mode: RenderMode::Classes,
        }
    }
}

/// Main loop scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sleep when no new frame is available; 0 busy-polls with `yield_now`
    pub idle_sleep_us: u64,
    /// Interval between cycles-per-second log lines
    pub stats_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            idle_sleep_us: 0,
            stats_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults when the file doesn't exist
    /// or the JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check every value the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;
        if audio.frame_size == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        if audio.frame_size % 2 != 0 {
            return Err(ConfigError::OddFrameSize {
                frame_size: audio.frame_size,
            });
        }
        if audio.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }

        let nyquist_hz = audio.sample_rate as f32 / 2.0;
        let min_frequency_hz = self.analysis.min_frequency_hz;
        if min_frequency_hz.is_nan() || min_frequency_hz >= nyquist_hz {
            return Err(ConfigError::MinFrequencyAboveNyquist {
                min_frequency_hz: self.analysis.min_frequency_hz,
                nyquist_hz,
            });
        }

        let threshold = self.analysis.magnitude_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold { threshold });
        }

        let reference_pitch_hz = self.analysis.reference_pitch_hz;
        if !reference_pitch_hz.is_finite() || reference_pitch_hz <= 0.0 {
            return Err(ConfigError::InvalidReferencePitch { reference_pitch_hz });
        }

        let brightness = self.strip.brightness;
        if !(0.0..=1.0).contains(&brightness) {
            return Err(ConfigError::InvalidBrightness { brightness });
        }
        if self.strip.num_leds == 0 {
            return Err(ConfigError::ZeroLeds);
        }
        let leds_per_note = self.strip.leds_per_note;
        if !(1..=MAX_LEDS_PER_NOTE).contains(&leds_per_note) {
            return Err(ConfigError::InvalidLedsPerNote { leds_per_note });
        }

        Ok(())
    }
}
