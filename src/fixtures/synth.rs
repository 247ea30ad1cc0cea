//! Deterministic synthetic signals for tests and offline demos.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::PI;

/// `len` samples of a sine at `frequency_hz` with peak `amplitude`
pub fn sine(frequency_hz: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let step = 2.0 * PI * frequency_hz / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}

/// Sample-wise sum of `signals`; the result is as long as the longest input
pub fn mix(signals: &[Vec<f32>]) -> Vec<f32> {
    let len = signals.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = vec![0.0; len];
    for signal in signals {
        for (acc, sample) in out.iter_mut().zip(signal) {
            *acc += sample;
        }
    }
    out
}

/// Uniform white noise in `[-amplitude, amplitude]`, reproducible from `seed`
pub fn white_noise(amplitude: f32, len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| amplitude * (rng.gen::<f32>() * 2.0 - 1.0))
        .collect()
}
