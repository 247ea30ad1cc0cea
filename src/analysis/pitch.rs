// Pitch module - frequency to equal-tempered pitch class mapping
//
// Frequencies are converted to the nearest MIDI note relative to A4 and then
// folded into one of the 12 chromatic pitch classes:
//
//   semitones = 12 × log2(f / 440)
//   midi      = round(semitones) + 69        (round half away from zero)
//   class     = midi mod 12                  (Euclidean, never negative)
//   octave    = floor(midi / 12) − 1         (C4 = MIDI 60)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PaletteOrder;

/// Reference frequency of A4 in Hz
pub const A4_FREQUENCY_HZ: f64 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI_NUMBER: i32 = 69;

/// Color table, one RGB row per palette slot.
///
/// Rows are laid out around the circle of fifths (C, G, D, A, E, B, F#/Gb,
/// C#/Db, G#/Ab, D#/Eb, A#/Bb, F), sweeping from blue through green and red
/// to violet.
pub const PALETTE: [[u8; 3]; 12] = [
    [0, 0, 255],
    [0, 128, 255],
    [0, 255, 255],
    [0, 255, 128],
    [0, 255, 0],
    [128, 255, 0],
    [255, 255, 0],
    [255, 128, 0],
    [255, 0, 0],
    [255, 0, 128],
    [255, 0, 255],
    [128, 0, 255],
];

/// One of the 12 chromatic pitch classes, independent of octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Chromatic index, C = 0 … B = 11
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class for a chromatic index (taken modulo 12)
    pub fn from_index(index: usize) -> PitchClass {
        Self::ALL[index % 12]
    }

    /// Pitch class of a MIDI note number; negative numbers are folded correctly
    pub fn from_midi(midi: i32) -> PitchClass {
        Self::ALL[midi.rem_euclid(12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Fixed display color of this pitch class
    pub fn color(self, order: PaletteOrder) -> [u8; 3] {
        let row = match order {
            PaletteOrder::Chromatic => self.index(),
            // 7 semitones per step around the circle; 7 is its own inverse mod 12
            PaletteOrder::Fifths => (self.index() * 7) % 12,
        };
        PALETTE[row]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pitch class together with its octave and MIDI number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
    pub midi: i32,
}

impl Note {
    pub fn from_midi(midi: i32) -> Self {
        Self {
            pitch_class: PitchClass::from_midi(midi),
            octave: midi.div_euclid(12) - 1,
            midi,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

/// Maps FFT bins and frequencies to pitch classes for one frame geometry
#[derive(Debug, Clone, Copy)]
pub struct PitchMapper {
    sample_rate: u32,
    frame_size: usize,
    reference_hz: f64,
}

impl PitchMapper {
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `frame_size` - FFT length in samples
    pub fn new(sample_rate: u32, frame_size: usize) -> Self {
        Self {
            sample_rate,
            frame_size,
            reference_hz: A4_FREQUENCY_HZ,
        }
    }

    /// Use a different tuning reference for A4
    pub fn with_reference(mut self, reference_hz: f64) -> Self {
        self.reference_hz = reference_hz;
        self
    }

    /// Center frequency of `bin`: bin × sample_rate / frame_size
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.frame_size as f64
    }

    /// Pitch class of an FFT bin; `None` for bin 0 (0 Hz has no pitch)
    pub fn bin_to_pitch_class(&self, bin: usize) -> Option<PitchClass> {
        self.frequency_to_pitch_class(self.bin_frequency(bin))
    }

    /// Pitch class nearest to `freq_hz`
    ///
    /// Returns `None` for zero, negative, or non-finite frequencies instead of
    /// evaluating log2 of a non-positive number.
    pub fn frequency_to_pitch_class(&self, freq_hz: f64) -> Option<PitchClass> {
        self.nearest_midi(freq_hz).map(PitchClass::from_midi)
    }

    /// Nearest note (pitch class, octave, MIDI number) to `freq_hz`
    pub fn frequency_to_note(&self, freq_hz: f64) -> Option<Note> {
        self.nearest_midi(freq_hz).map(Note::from_midi)
    }

    fn nearest_midi(&self, freq_hz: f64) -> Option<i32> {
        if !freq_hz.is_finite() || freq_hz <= 0.0 {
            return None;
        }
        let semitones_from_a4 = 12.0 * (freq_hz / self.reference_hz).log2();
        if !semitones_from_a4.is_finite() {
            return None;
        }
        // f64::round rounds half away from zero
        (semitones_from_a4.round() as i32).checked_add(A4_MIDI_NUMBER)
    }
}
