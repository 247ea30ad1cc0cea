//! WAV replay - feeds a decoded clip through the capture callback
//!
//! Stands in for the microphone when no input device is available. A feeder
//! thread hands the clip to [`CaptureCallback::on_input`] in device-sized
//! blocks, optionally sleeping one block duration between calls so frames
//! arrive at the rate a live stream would deliver them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::capture::{CallbackStatus, CaptureCallback, CaptureStats, CaptureStream};
use super::frame_exchange::FrameExchange;
use crate::error::AudioError;
use crate::fixtures::WavClip;
use crate::shutdown::ShutdownFlag;

/// Block size handed to the callback per call, typical of desktop devices
pub const DEFAULT_REPLAY_BLOCK: usize = 512;

/// Replay behaviour
#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    /// Samples passed to the callback per call
    pub block_size: usize,
    /// Sleep one block duration between calls
    pub realtime: bool,
    /// Request process shutdown once the clip is exhausted
    pub shutdown_at_end: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_REPLAY_BLOCK,
            realtime: true,
            shutdown_at_end: true,
        }
    }
}

/// Capture source backed by a WAV clip
pub struct WavReplay {
    running: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
    stats: Arc<CaptureStats>,
}

impl WavReplay {
    /// Start replaying `clip` into `exchange`
    pub fn start(
        clip: WavClip,
        exchange: Arc<FrameExchange>,
        shutdown: ShutdownFlag,
        options: ReplayOptions,
    ) -> Result<Self, AudioError> {
        let block_size = options.block_size.max(1);
        let mut callback = CaptureCallback::new(exchange, shutdown.clone(), 1)?;
        let stats = callback.stats();
        let running = Arc::new(AtomicBool::new(true));

        let block_duration = if clip.sample_rate > 0 {
            Duration::from_secs_f64(block_size as f64 / clip.sample_rate as f64)
        } else {
            Duration::ZERO
        };

        tracing::info!(
            "[Replay] Streaming {} ({:.1} ms @ {} Hz)",
            clip.path.display(),
            clip.duration_ms(),
            clip.sample_rate
        );

        let feeder_running = Arc::clone(&running);
        let feeder = thread::Builder::new()
            .name("wav-replay".to_string())
            .spawn(move || {
                for block in clip.samples.chunks(block_size) {
                    if !feeder_running.load(Ordering::SeqCst) {
                        return;
                    }
                    if callback.on_input(block, false) == CallbackStatus::Stop {
                        return;
                    }
                    if options.realtime {
                        thread::sleep(block_duration);
                    }
                }

                tracing::info!("[Replay] End of clip");
                if options.shutdown_at_end {
                    shutdown.request();
                }
            })
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to spawn replay thread: {}", e),
            })?;

        Ok(Self {
            running,
            feeder: Some(feeder),
            stats,
        })
    }

    pub fn is_running(&self) -> bool {
        self.feeder
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Block until the whole clip has been fed (or shutdown cut it short)
    pub fn wait(&mut self) -> Result<(), AudioError> {
        self.join_feeder()
    }

    fn join_feeder(&mut self) -> Result<(), AudioError> {
        if let Some(handle) = self.feeder.take() {
            handle.join().map_err(|_| AudioError::StreamControlFailed {
                reason: "replay thread panicked".to_string(),
            })?;
            tracing::info!("[Replay] Stream closed");
        }
        Ok(())
    }
}

impl CaptureStream for WavReplay {
    /// Cancel the replay wherever it is and join the feeder thread
    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::SeqCst);
        self.join_feeder()
    }

    fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for WavReplay {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
