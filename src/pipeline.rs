// Pipeline - the long-lived object tying capture, analysis and the LED strip together
//
// Built once at startup, it owns the frame exchange, the FFT plan (inside the
// analyzer), the capture stream and the strip. The main loop polls the exchange,
// analyzes each new frame, renders active pitch classes and flushes the strip.
// Teardown stops capture and closes the strip exactly once, whether the loop
// ended on request, on a transmission error, or because the pipeline was dropped.
//
// Loop:
//   shutdown? ──yes──> teardown
//      │ no
//   try_consume_into(frame) ──none──> yield / sleep
//      │ some
//   analyze → render → show ──err──> teardown → Err

use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::analysis::pitch::PitchClass;
use crate::analysis::{NoteActivity, SpectralAnalyzer};
use crate::audio::{CaptureStream, FrameExchange};
use crate::config::{AppConfig, PaletteOrder, PipelineConfig, RenderMode, StripConfig};
use crate::error::{log_audio_error, log_strip_error, StripError};
use crate::led::{LedBus, PixelStrip};
use crate::shutdown::ShutdownFlag;

/// Maps pitch-class activity onto blocks of LEDs
///
/// Pitch class `i` owns LEDs `i × leds_per_note .. (i + 1) × leds_per_note`.
/// In [`RenderMode::Dominant`] the whole strip shows the strongest class instead.
#[derive(Debug, Clone, Copy)]
pub struct NoteRenderer {
    leds_per_note: usize,
    palette_order: PaletteOrder,
    mode: RenderMode,
}

impl NoteRenderer {
    pub fn new(leds_per_note: usize, palette_order: PaletteOrder) -> Self {
        Self {
            leds_per_note,
            palette_order,
            mode: RenderMode::Classes,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn from_config(config: &StripConfig) -> Self {
        Self::new(config.leds_per_note, config.palette_order).with_mode(config.render_mode)
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// LED indices owned by `class`, saturating at `usize::MAX`
    pub fn block(&self, class: PitchClass) -> Range<usize> {
        let start = class.index().saturating_mul(self.leds_per_note);
        start..start.saturating_add(self.leds_per_note)
    }

    /// Light the block of `class` with its palette color, truncated to the strip
    pub fn light<B: LedBus>(&self, class: PitchClass, strip: &mut PixelStrip<B>) {
        let [r, g, b] = class.color(self.palette_order);
        let block = self.block(class);
        for index in block.start.min(strip.len())..block.end.min(strip.len()) {
            strip.set_pixel(index, r, g, b);
        }
    }

    /// Light every LED with the color of `class`
    pub fn fill<B: LedBus>(&self, class: PitchClass, strip: &mut PixelStrip<B>) {
        let [r, g, b] = class.color(self.palette_order);
        for index in 0..strip.len() {
            strip.set_pixel(index, r, g, b);
        }
    }

    /// Replace the strip contents for one analyzed frame; does not flush
    ///
    /// `dominant` is only read in [`RenderMode::Dominant`]; `None` leaves the
    /// strip dark.
    pub fn render<B: LedBus>(
        &self,
        activity: &NoteActivity,
        dominant: Option<PitchClass>,
        strip: &mut PixelStrip<B>,
    ) {
        strip.clear();
        match self.mode {
            RenderMode::Classes => {
                for (class, _) in activity.active() {
                    self.light(class, strip);
                }
            }
            RenderMode::Dominant => {
                if let Some(class) = dominant {
                    self.fill(class, strip);
                }
            }
        }
    }
}

/// Counters maintained by the main loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames taken from the exchange and analyzed
    pub frames_analyzed: u64,
    /// Frames successfully flushed to the strip
    pub frames_rendered: u64,
    /// Capture overruns observed so far
    pub overflows: u64,
}

/// Capture → analysis → LED pipeline
pub struct NotePipeline<B: LedBus> {
    exchange: Arc<FrameExchange>,
    analyzer: SpectralAnalyzer,
    renderer: NoteRenderer,
    strip: PixelStrip<B>,
    capture: Option<Box<dyn CaptureStream>>,
    shutdown: ShutdownFlag,
    config: PipelineConfig,
    /// Consumer-side copy of the latest frame
    frame: Vec<f32>,
    stats: PipelineStats,
    torn_down: bool,
}

impl<B: LedBus> NotePipeline<B> {
    /// Build the pipeline around `bus`; the strip is cleared and flushed once
    ///
    /// `config` must already have passed [`AppConfig::validate`]. Capture is
    /// attached separately with [`NotePipeline::attach_capture`] so the stream
    /// can be started against [`NotePipeline::exchange`].
    pub fn new(config: &AppConfig, bus: B, shutdown: ShutdownFlag) -> Result<Self, StripError> {
        let frame_size = config.audio.frame_size;
        let strip = PixelStrip::from_config(bus, &config.strip)?;

        tracing::info!(
            "[Pipeline] {} LEDs, {} per note, {:?} mode, frame_size={} @ {} Hz",
            config.strip.num_leds,
            config.strip.leds_per_note,
            config.strip.render_mode,
            frame_size,
            config.audio.sample_rate
        );

        Ok(Self {
            exchange: Arc::new(FrameExchange::new(frame_size)),
            analyzer: SpectralAnalyzer::new(&config.audio, &config.analysis),
            renderer: NoteRenderer::from_config(&config.strip),
            strip,
            capture: None,
            shutdown,
            config: config.pipeline.clone(),
            frame: vec![0.0; frame_size],
            stats: PipelineStats::default(),
            torn_down: false,
        })
    }

    /// Exchange the capture source must publish into
    pub fn exchange(&self) -> Arc<FrameExchange> {
        Arc::clone(&self.exchange)
    }

    pub fn attach_capture(&mut self, capture: Box<dyn CaptureStream>) {
        self.capture = Some(capture);
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn strip(&self) -> &PixelStrip<B> {
        &self.strip
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Process the newest frame, if any
    ///
    /// Returns `Ok(true)` when a frame was analyzed and flushed, `Ok(false)`
    /// when nothing new was published since the previous cycle.
    pub fn run_cycle(&mut self) -> Result<bool, StripError> {
        self.check_overflows();

        if self.exchange.try_consume_into(&mut self.frame).is_none() {
            return Ok(false);
        }

        let activity = self.analyzer.analyze(&self.frame);
        self.stats.frames_analyzed += 1;
        self.log_detected_note(&activity);

        let dominant = match self.renderer.mode() {
            RenderMode::Dominant => self.analyzer.dominant_class(),
            RenderMode::Classes => None,
        };
        self.renderer.render(&activity, dominant, &mut self.strip);
        self.strip.show()?;
        self.stats.frames_rendered += 1;
        Ok(true)
    }

    /// Poll until shutdown is requested or a frame cannot be transmitted
    ///
    /// Teardown runs before returning in both cases.
    pub fn run(&mut self) -> Result<(), StripError> {
        tracing::info!("[Pipeline] Entering main loop");

        let idle_sleep = Duration::from_micros(self.config.idle_sleep_us);
        let stats_interval = Duration::from_millis(self.config.stats_interval_ms.max(1));
        let mut window_start = Instant::now();
        let mut window_cycles: u64 = 0;

        let result = loop {
            if self.shutdown.is_requested() {
                tracing::info!("[Pipeline] Shutdown requested, leaving main loop");
                break Ok(());
            }

            match self.run_cycle() {
                Ok(true) => window_cycles += 1,
                Ok(false) if idle_sleep.is_zero() => thread::yield_now(),
                Ok(false) => thread::sleep(idle_sleep),
                Err(err) => {
                    log_strip_error(&err, "main loop show");
                    self.shutdown.request();
                    break Err(err);
                }
            }

            let elapsed = window_start.elapsed();
            if elapsed >= stats_interval {
                tracing::debug!(
                    "[Pipeline] Cycles per second: {:.1}",
                    window_cycles as f64 / elapsed.as_secs_f64()
                );
                window_start = Instant::now();
                window_cycles = 0;
            }
        };

        self.teardown();
        result
    }

    /// Stop capture, then clear and flush the strip and release the bus
    ///
    /// Runs at most once; errors are logged and swallowed.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(mut capture) = self.capture.take() {
            if let Err(err) = capture.stop() {
                log_audio_error(&err, "teardown");
            }
        }
        self.strip.close();

        tracing::info!(
            "[Pipeline] Stopped after {} frames ({} rendered, {} overruns)",
            self.stats.frames_analyzed,
            self.stats.frames_rendered,
            self.stats.overflows
        );
    }

    fn check_overflows(&mut self) {
        let Some(capture) = self.capture.as_ref() else {
            return;
        };
        let overflows = capture.stats().overflows();
        if overflows > self.stats.overflows {
            tracing::warn!(
                "[Pipeline] Audio input overrun ({} new, {} total)",
                overflows - self.stats.overflows,
                overflows
            );
            self.stats.overflows = overflows;
        }
    }

    fn log_detected_note(&self, activity: &NoteActivity) {
        if activity.is_empty() || !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }
        if let Some(dominant) = self.analyzer.dominant_bin() {
            if let Some(note) = self.analyzer.mapper().frequency_to_note(dominant.frequency_hz) {
                tracing::debug!(
                    "[Pipeline] Note detected: {} ({:.1} Hz, magnitude {:.1})",
                    note,
                    dominant.frequency_hz,
                    dominant.magnitude
                );
            }
        }
    }
}

impl<B: LedBus> Drop for NotePipeline<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests;
