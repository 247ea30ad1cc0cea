// FFT module - precomputed forward transform for real-valued frames
//
// The plan and its working buffers are created once; `process` only copies the
// frame in and executes the plan, so the steady-state loop does no planning and
// no allocation. Real input is carried in the real part of a complex buffer and
// only the non-negative half of the spectrum (frame_size / 2 + 1 bins) is
// exposed.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Forward real-to-complex transform of a fixed length
pub struct FftPlan {
    fft: Arc<dyn Fft<f32>>,
    frame_size: usize,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftPlan {
    /// Plan a forward transform of `frame_size` samples
    ///
    /// # Panics
    /// Panics if `frame_size` is 0
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be greater than 0");

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            frame_size,
            buffer: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Number of output bins: frame_size / 2 + 1
    pub fn bin_count(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Transform `frame` and return its non-negative frequency bins
    ///
    /// Shorter frames are zero-padded; extra samples are ignored.
    pub fn process(&mut self, frame: &[f32]) -> &[Complex<f32>] {
        for (slot, sample) in self
            .buffer
            .iter_mut()
            .zip(frame.iter().copied().chain(std::iter::repeat(0.0)))
        {
            *slot = Complex::new(sample, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        &self.buffer[..self.frame_size / 2 + 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_bin_count() {
        let plan = FftPlan::new(2048);
        assert_eq!(plan.bin_count(), 1025);
    }

    #[test]
    fn test_constant_signal_lands_in_dc_bin() {
        let mut plan = FftPlan::new(64);
        let bins = plan.process(&[1.0; 64]);
        assert_eq!(bins.len(), 33);
        assert!((bins[0].norm() - 64.0).abs() < 1e-3);
        assert!(bins[1..].iter().all(|c| c.norm() < 1e-3));
    }

    #[test]
    fn test_bin_centered_sine() {
        let n = 256;
        let k = 10;
        let frame: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * k as f32 * i as f32 / n as f32).sin())
            .collect();

        let mut plan = FftPlan::new(n);
        let bins = plan.process(&frame);
        // A unit sine centred on bin k has magnitude n / 2 there
        assert!((bins[k].norm() - n as f32 / 2.0).abs() < 1e-2);
        assert!(bins[k + 3].norm() < 1e-2);
    }

    #[test]
    fn test_plan_is_reusable() {
        let mut plan = FftPlan::new(32);
        let first = plan.process(&[1.0; 32])[0];
        let _ = plan.process(&[0.0; 32]);
        let again = plan.process(&[1.0; 32])[0];
        assert_eq!(first, again);
    }

    #[test]
    fn test_short_frame_is_zero_padded() {
        let mut plan = FftPlan::new(8);
        let bins = plan.process(&[1.0; 4]);
        assert!((bins[0].re - 4.0).abs() < 1e-6);
    }
}
