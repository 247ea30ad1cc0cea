// FrameExchange - single-slot hand-off between the capture thread and the analysis loop
//
// The capture callback copies each completed frame into a pre-allocated slot and
// bumps a generation counter inside the same critical section. The analysis
// loop compares that generation against the last one it consumed, again under
// the lock, before copying the samples out. Only the freshest frame is kept:
// frames published while the consumer is busy overwrite each other.
//
// Buffer flow:
// 1. Capture thread: lock, copy samples into slot, generation += 1, unlock
// 2. Analysis loop:  lock, compare generation with last consumed, copy out, unlock

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::AudioError;

/// One captured block of samples, immutable after hand-off
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Generation assigned when the frame was published (starts at 1)
    pub generation: u64,
    pub samples: Vec<f32>,
}

struct FrameSlot {
    samples: Vec<f32>,
    /// Incremented on every publish
    generation: u64,
    /// Generation most recently handed to the consumer
    consumed: u64,
}

/// Latest-frame mailbox shared by the capture callback and the analysis loop
///
/// # Thread Safety
/// - One producer (capture callback) and one consumer (analysis loop)
/// - The lock is held only for a `frame_size` memcpy on either side
/// - `publish` never allocates
pub struct FrameExchange {
    slot: Mutex<FrameSlot>,
    frame_size: usize,
}

impl FrameExchange {
    /// Create an exchange whose slot holds exactly `frame_size` samples
    ///
    /// # Panics
    /// Panics if `frame_size` is 0
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be greater than 0");
        Self {
            slot: Mutex::new(FrameSlot {
                samples: vec![0.0; frame_size],
                generation: 0,
                consumed: 0,
            }),
            frame_size,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    // A poisoned slot still holds plain samples and counters, so the data is
    // usable; the capture thread cannot report errors anyway.
    fn lock_slot(&self) -> MutexGuard<'_, FrameSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored frame with `frame` and return its generation
    ///
    /// Called from the real-time capture callback: bounded copy, no I/O, no
    /// allocation.
    pub fn publish(&self, frame: &[f32]) -> Result<u64, AudioError> {
        if frame.len() != self.frame_size {
            return Err(AudioError::FrameSizeMismatch {
                expected: self.frame_size,
                actual: frame.len(),
            });
        }

        let mut slot = self.lock_slot();
        slot.samples.copy_from_slice(frame);
        slot.generation += 1;
        Ok(slot.generation)
    }

    /// Copy the latest frame into `out` if it is newer than the last consumed one
    ///
    /// Returns the generation of the copied frame, or `None` when nothing new
    /// was published since the previous successful call.
    ///
    /// # Panics
    /// Panics if `out.len()` differs from the frame size
    pub fn try_consume_into(&self, out: &mut [f32]) -> Option<u64> {
        assert_eq!(
            out.len(),
            self.frame_size,
            "output buffer must hold exactly one frame"
        );

        let mut slot = self.lock_slot();
        if slot.generation == slot.consumed {
            return None;
        }
        out.copy_from_slice(&slot.samples);
        slot.consumed = slot.generation;
        Some(slot.generation)
    }

    /// Allocating variant of [`FrameExchange::try_consume_into`]
    pub fn try_consume(&self) -> Option<AudioFrame> {
        let mut samples = vec![0.0; self.frame_size];
        self.try_consume_into(&mut samples)
            .map(|generation| AudioFrame {
                generation,
                samples,
            })
    }

    /// Generation of the most recently published frame (0 if none yet)
    pub fn latest_generation(&self) -> u64 {
        self.lock_slot().generation
    }

    /// Frames published since the consumer last took one
    pub fn pending(&self) -> u64 {
        let slot = self.lock_slot();
        slot.generation - slot.consumed
    }
}
