//! Fixture utilities for offline runs.
//!
//! Loads PCM WAV clips as mono f32 samples and runs the spectral analyzer over
//! them frame by frame without touching audio hardware. The CLI's `analyze`
//! command and the WAV replay source are built on these helpers.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::{ActiveNote, SpectralAnalyzer};
use crate::config::{AnalysisConfig, AudioConfig};
use crate::error::AudioError;

pub mod synth;

/// Decoded WAV clip, reduced to its first channel
#[derive(Debug, Clone)]
pub struct WavClip {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl WavClip {
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// Load a PCM WAV file (16/24/32-bit integer or 32-bit float)
///
/// Multi-channel files keep only their first channel, matching what the live
/// capture path does with interleaved input.
pub fn load_wav(path: &Path) -> Result<WavClip, AudioError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| AudioError::WavLoadFailed {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::WavLoadFailed {
            reason: format!("{} has zero channels", path.display()),
        });
    }

    let read_err = |err: hound::Error| AudioError::WavLoadFailed {
        reason: format!("error reading {}: {err}", path.display()),
    };

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(read_err))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .samples::<i16>()
                .map(|sample| sample.map(|v| v as f32 / i16::MAX as f32).map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?,
            24 => reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / 8_388_607.0).map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?,
            32 => reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / i32::MAX as f32).map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?,
            bits => {
                return Err(AudioError::WavLoadFailed {
                    reason: format!(
                        "unsupported bits_per_sample={} for {}",
                        bits,
                        path.display()
                    ),
                })
            }
        },
    };

    let samples = if spec.channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(spec.channels as usize)
            .map(|frame| frame[0])
            .collect()
    };

    tracing::debug!(
        "[Fixtures] Loaded {} ({} samples @ {} Hz, {} ch)",
        path.display(),
        samples.len(),
        spec.sample_rate,
        spec.channels
    );

    Ok(WavClip {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Write mono f32 samples as a 32-bit float WAV file
pub fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Strongest bin of one analyzed frame, named by its nearest note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominantReport {
    pub note: String,
    pub frequency_hz: f64,
    pub magnitude: f32,
}

/// Analysis result of one frame of a clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: usize,
    pub time_ms: f64,
    pub notes: Vec<ActiveNote>,
    pub dominant: Option<DominantReport>,
}

/// Analyze every complete, non-overlapping frame of `clip`
///
/// The clip's own sample rate replaces `audio.sample_rate` so bin frequencies
/// stay correct; a trailing partial frame is not analyzed.
pub fn analyze_clip(
    clip: &WavClip,
    audio: &AudioConfig,
    analysis: &AnalysisConfig,
) -> Vec<FrameReport> {
    let audio = AudioConfig {
        sample_rate: clip.sample_rate,
        ..audio.clone()
    };
    let mut analyzer = SpectralAnalyzer::new(&audio, analysis);
    let frame_size = audio.frame_size;

    clip.samples
        .chunks_exact(frame_size)
        .enumerate()
        .map(|(index, frame)| {
            let activity = analyzer.analyze(frame);
            let dominant = analyzer.dominant_bin().and_then(|bin| {
                analyzer
                    .mapper()
                    .frequency_to_note(bin.frequency_hz)
                    .map(|note| DominantReport {
                        note: note.to_string(),
                        frequency_hz: bin.frequency_hz,
                        magnitude: bin.magnitude,
                    })
            });

            FrameReport {
                frame: index,
                time_ms: (index * frame_size) as f64 * 1000.0 / audio.sample_rate as f64,
                notes: activity.to_report(),
                dominant,
            }
        })
        .collect()
}
