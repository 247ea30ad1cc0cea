//! Capture callback - real-time side of the audio hand-off
//!
//! The audio subsystem invokes [`CaptureCallback::on_input`] synchronously on
//! its own thread with whatever block size the device delivers. The callback
//! downmixes to mono (first channel), assembles fixed-size frames in a
//! pre-allocated buffer, and publishes each completed frame to the
//! [`FrameExchange`].
//!
//! # Real-Time Safety
//! All operations in `on_input` are:
//! - Allocation-free (the frame buffer is allocated in `new`)
//! - Free of I/O and logging (overruns are only counted)
//! - Bounded (one pass over the block plus at most one frame copy per frame)
//!
//! # Architecture
//! ```text
//! audio subsystem thread
//!   └─> CaptureCallback::on_input(block, overflow)
//!       ├─> overflow? → CaptureStats::overflows += 1
//!       ├─> accumulate first channel into frame buffer
//!       └─> frame full → FrameExchange::publish()
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::frame_exchange::FrameExchange;
use crate::error::AudioError;
use crate::shutdown::ShutdownFlag;

/// Status returned to the audio subsystem after each callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    /// Keep streaming
    Continue,
    /// Ask the audio subsystem to stop the stream
    Stop,
}

impl CallbackStatus {
    /// Numeric status: 0 continues the stream, non-zero requests a stop
    pub fn code(self) -> i32 {
        match self {
            CallbackStatus::Continue => 0,
            CallbackStatus::Stop => 1,
        }
    }
}

/// Counters written by the capture thread and read by the analysis loop
#[derive(Debug, Default)]
pub struct CaptureStats {
    overflows: AtomicU64,
    frames_published: AtomicU64,
}

impl CaptureStats {
    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published.load(Ordering::Relaxed)
    }
}

/// State owned by the real-time capture callback
pub struct CaptureCallback {
    exchange: Arc<FrameExchange>,
    shutdown: ShutdownFlag,
    stats: Arc<CaptureStats>,
    /// Interleaved channel count of incoming blocks
    channels: usize,
    frame: Vec<f32>,
    filled: usize,
    stopped: bool,
}

impl CaptureCallback {
    /// Create a callback that publishes frames of `exchange.frame_size()` samples
    ///
    /// # Arguments
    /// * `exchange` - Destination for completed frames
    /// * `shutdown` - Observed on every call; once set the callback returns `Stop`
    /// * `channels` - Interleaved channels per input block (first one is kept)
    pub fn new(
        exchange: Arc<FrameExchange>,
        shutdown: ShutdownFlag,
        channels: usize,
    ) -> Result<Self, AudioError> {
        if channels == 0 {
            return Err(AudioError::NoInputChannels {
                device: "capture callback".to_string(),
            });
        }

        let frame = vec![0.0; exchange.frame_size()];
        Ok(Self {
            exchange,
            shutdown,
            stats: Arc::new(CaptureStats::default()),
            channels,
            frame,
            filled: 0,
            stopped: false,
        })
    }

    /// Shared counters, readable from any thread
    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }

    /// Consume one interleaved input block
    ///
    /// `overflow` reports that the audio subsystem dropped input before this
    /// block; it is counted and otherwise ignored.
    pub fn on_input(&mut self, data: &[f32], overflow: bool) -> CallbackStatus {
        if self.stopped || self.shutdown.is_requested() {
            self.stopped = true;
            return CallbackStatus::Stop;
        }

        if overflow {
            self.stats.overflows.fetch_add(1, Ordering::Relaxed);
        }

        for sample in data.chunks(self.channels).map(|frame| frame[0]) {
            self.frame[self.filled] = sample;
            self.filled += 1;

            if self.filled == self.frame.len() {
                // Length always matches: the buffer was sized from the exchange
                if self.exchange.publish(&self.frame).is_ok() {
                    self.stats.frames_published.fetch_add(1, Ordering::Relaxed);
                }
                self.filled = 0;
            }
        }

        CallbackStatus::Continue
    }
}

/// A running audio source that can be stopped exactly once
///
/// Implemented by the live cpal stream and by the WAV replay thread.
pub trait CaptureStream {
    /// Stop delivering frames and release the underlying stream
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Counters of the callback driving this stream
    fn stats(&self) -> Arc<CaptureStats>;
}
