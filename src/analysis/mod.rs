// Analysis module - spectral magnitude analysis and pitch-class detection
//
// Each cycle the analyzer transforms one frame, computes bin magnitudes from
// the minimum-frequency bin upward, and marks every pitch class that owns at
// least one bin above the magnitude threshold.
//
// Pipeline:
//   AudioFrame → FftPlan → |X[k]| for k ≥ min_bin → PitchMapper → NoteActivity

use serde::Serialize;

use crate::config::{AnalysisConfig, AudioConfig};

pub mod fft;
pub mod pitch;

use fft::FftPlan;
use pitch::{PitchClass, PitchMapper};

/// Pitch classes sounding in one analysis cycle
///
/// Holds, per active class, the strongest magnitude among the bins that mapped
/// to it in this cycle. Rebuilt from scratch every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoteActivity {
    magnitudes: [Option<f32>; 12],
}

impl NoteActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `class` active with `magnitude`, keeping the maximum seen so far
    ///
    /// The result does not depend on the order in which bins are recorded.
    pub fn record(&mut self, class: PitchClass, magnitude: f32) {
        let slot = &mut self.magnitudes[class.index()];
        *slot = Some(match *slot {
            Some(current) => current.max(magnitude),
            None => magnitude,
        });
    }

    pub fn is_active(&self, class: PitchClass) -> bool {
        self.magnitudes[class.index()].is_some()
    }

    /// Strongest magnitude of `class` this cycle, if active
    pub fn magnitude(&self, class: PitchClass) -> Option<f32> {
        self.magnitudes[class.index()]
    }

    /// Active classes in chromatic order with their magnitudes
    pub fn active(&self) -> impl Iterator<Item = (PitchClass, f32)> + '_ {
        PitchClass::ALL
            .iter()
            .filter_map(move |&class| self.magnitude(class).map(|mag| (class, mag)))
    }

    pub fn len(&self) -> usize {
        self.magnitudes.iter().filter(|m| m.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.iter().all(Option::is_none)
    }

    /// Serializable form used by reports
    pub fn to_report(&self) -> Vec<ActiveNote> {
        self.active()
            .map(|(pitch_class, magnitude)| ActiveNote {
                pitch_class,
                magnitude,
            })
            .collect()
    }
}

/// One entry of a serialized [`NoteActivity`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveNote {
    pub pitch_class: PitchClass,
    pub magnitude: f32,
}

/// Strongest qualifying bin of a cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantBin {
    pub bin: usize,
    pub frequency_hz: f64,
    pub magnitude: f32,
}

/// Converts frames into per-bin magnitudes and the active pitch-class set
///
/// Owns the FFT plan and the magnitude buffer; both are allocated once in
/// [`SpectralAnalyzer::new`].
pub struct SpectralAnalyzer {
    plan: FftPlan,
    mapper: PitchMapper,
    /// magnitude[k] for every bin; bins below `min_bin` stay 0.0
    magnitudes: Vec<f32>,
    /// Pitch class of each bin, precomputed (None below `min_bin` and for DC)
    bin_classes: Vec<Option<PitchClass>>,
    min_bin: usize,
    threshold: f32,
}

impl SpectralAnalyzer {
    /// Build an analyzer for the configured frame geometry
    ///
    /// `min_bin = floor(min_frequency × frame_size / sample_rate)`
    pub fn new(audio: &AudioConfig, analysis: &AnalysisConfig) -> Self {
        let plan = FftPlan::new(audio.frame_size);
        let mapper = PitchMapper::new(audio.sample_rate, audio.frame_size)
            .with_reference(analysis.reference_pitch_hz);

        let bin_count = plan.bin_count();
        let min_bin = min_bin_for(
            analysis.min_frequency_hz,
            audio.frame_size,
            audio.sample_rate,
        )
        .min(bin_count);
        let bin_classes = (0..bin_count)
            .map(|bin| {
                if bin < min_bin {
                    None
                } else {
                    mapper.bin_to_pitch_class(bin)
                }
            })
            .collect();

        tracing::debug!(
            "[Analyzer] frame_size={} sample_rate={} min_bin={} threshold={}",
            audio.frame_size,
            audio.sample_rate,
            min_bin,
            analysis.magnitude_threshold
        );

        Self {
            plan,
            mapper,
            magnitudes: vec![0.0; bin_count],
            bin_classes,
            min_bin,
            threshold: analysis.magnitude_threshold,
        }
    }

    pub fn min_bin(&self) -> usize {
        self.min_bin
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn mapper(&self) -> &PitchMapper {
        &self.mapper
    }

    /// Magnitude spectrum of the last analyzed frame (frame_size / 2 + 1 bins)
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Analyze one frame and return the pitch classes sounding in it
    pub fn analyze(&mut self, frame: &[f32]) -> NoteActivity {
        let min_bin = self.min_bin;
        let bins = self.plan.process(frame);

        self.magnitudes[..min_bin].fill(0.0);
        for (magnitude, bin) in self.magnitudes[min_bin..]
            .iter_mut()
            .zip(&bins[min_bin..])
        {
            *magnitude = (bin.re * bin.re + bin.im * bin.im).sqrt();
        }

        self.activity_from_magnitudes()
    }

    /// Threshold the current magnitude spectrum into a [`NoteActivity`]
    ///
    /// Comparison is done in floating point; magnitudes are never truncated.
    fn activity_from_magnitudes(&self) -> NoteActivity {
        let mut activity = NoteActivity::new();
        for (bin, &magnitude) in self.magnitudes.iter().enumerate().skip(self.min_bin) {
            if magnitude > self.threshold {
                if let Some(class) = self.bin_classes[bin] {
                    activity.record(class, magnitude);
                }
            }
        }
        activity
    }

    /// Strongest bin at or above `min_bin`, if it clears the threshold
    pub fn dominant_bin(&self) -> Option<DominantBin> {
        self.magnitudes
            .iter()
            .enumerate()
            .skip(self.min_bin)
            .filter(|(_, &magnitude)| magnitude > self.threshold)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(bin, &magnitude)| DominantBin {
                bin,
                frequency_hz: self.mapper.bin_frequency(bin),
                magnitude,
            })
    }

    /// Pitch class of [`SpectralAnalyzer::dominant_bin`]
    pub fn dominant_class(&self) -> Option<PitchClass> {
        self.dominant_bin()
            .and_then(|dominant| self.bin_classes[dominant.bin])
    }
}

/// First bin considered by the analyzer for a given minimum frequency
pub fn min_bin_for(min_frequency_hz: f32, frame_size: usize, sample_rate: u32) -> usize {
    let bin = (min_frequency_hz as f64 * frame_size as f64 / sample_rate as f64).floor();
    if bin.is_finite() && bin > 0.0 {
        bin as usize
    } else {
        0
    }
}
