//! Pixel buffer and bus lifecycle for one LED strip
//!
//! The strip is cleared and flushed when it is created and again, exactly
//! once, when it is closed or dropped. Failures during that final flush are
//! logged and swallowed so shutdown always completes; failures during normal
//! frames are returned to the caller.

use std::thread;
use std::time::{Duration, Instant};

use super::bus::LedBus;
use super::encoder;
use crate::config::StripConfig;
use crate::error::{log_strip_error, StripError};

/// One LED color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const OFF: Pixel = Pixel { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    /// Scale every channel by `factor` (0.0..=1.0), rounding to nearest
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Owned pixel buffer plus the bus it is flushed to
pub struct PixelStrip<B: LedBus> {
    /// `None` once the strip has been closed
    bus: Option<B>,
    pixels: Vec<Pixel>,
    encoded: Vec<u8>,
    brightness: f32,
    reset_gap: Duration,
    last_flush: Option<Instant>,
    flushes: u64,
}

impl<B: LedBus> PixelStrip<B> {
    /// Take ownership of `bus`, then clear and flush once
    ///
    /// # Arguments
    /// * `num_leds` - LEDs on the strip; writes beyond this are ignored
    /// * `brightness` - Dimming factor applied in `set_pixel`
    /// * `reset_gap` - Minimum idle time between consecutive frames
    pub fn new(
        bus: B,
        num_leds: usize,
        brightness: f32,
        reset_gap: Duration,
    ) -> Result<Self, StripError> {
        let mut strip = Self {
            bus: Some(bus),
            pixels: vec![Pixel::OFF; num_leds],
            encoded: Vec::with_capacity(encoder::encoded_len(num_leds)),
            brightness: brightness.clamp(0.0, 1.0),
            reset_gap,
            last_flush: None,
            flushes: 0,
        };

        strip.clear();
        if let Err(err) = strip.show() {
            // Drop must not retry the bus that just failed
            strip.bus = None;
            return Err(err);
        }
        tracing::debug!("[Strip] Initialized {} LEDs", num_leds);
        Ok(strip)
    }

    /// Build a strip from the `strip` config section
    pub fn from_config(bus: B, config: &StripConfig) -> Result<Self, StripError> {
        Self::new(
            bus,
            config.num_leds,
            config.brightness,
            Duration::from_micros(config.reset_gap_us),
        )
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Frames successfully written, including the initial and final clear
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn is_closed(&self) -> bool {
        self.bus.is_none()
    }

    /// Set LED `index`; an out-of-range index is ignored
    pub fn set_pixel(&mut self, index: usize, r: u8, g: u8, b: u8) {
        let brightness = self.brightness;
        match self.pixels.get_mut(index) {
            Some(pixel) => *pixel = Pixel::new(r, g, b).scaled(brightness),
            None => tracing::trace!(
                "[Strip] Ignoring pixel {} beyond {} LEDs",
                index,
                self.pixels.len()
            ),
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Pixel::OFF);
    }

    /// Encode the buffer and write it to the bus in a single call
    ///
    /// Waits out whatever remains of the reset gap since the previous frame.
    ///
    /// # Errors
    /// - `Closed` after [`PixelStrip::close`]
    /// - `WriteFailed` when the bus write fails
    /// - `ShortWrite` when the bus accepts fewer bytes than the frame holds
    pub fn show(&mut self) -> Result<(), StripError> {
        let bus = self.bus.as_mut().ok_or(StripError::Closed)?;
        encoder::encode_into(&self.pixels, &mut self.encoded);

        if let Some(last) = self.last_flush {
            let elapsed = last.elapsed();
            if elapsed < self.reset_gap {
                thread::sleep(self.reset_gap - elapsed);
            }
        }

        let written = bus.write(&self.encoded);
        self.last_flush = Some(Instant::now());
        let written = written?;

        if written != self.encoded.len() {
            return Err(StripError::ShortWrite {
                expected: self.encoded.len(),
                written,
            });
        }
        self.flushes += 1;
        Ok(())
    }

    /// Clear, flush once more, and release the bus
    ///
    /// Safe to call repeatedly; only the first call touches the bus.
    pub fn close(&mut self) {
        if self.bus.is_none() {
            return;
        }

        self.clear();
        if let Err(err) = self.show() {
            log_strip_error(&err, "teardown flush");
        }
        self.bus = None;
        tracing::debug!("[Strip] Closed after {} frames", self.flushes);
    }
}

impl<B: LedBus> Drop for PixelStrip<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::bus::MemoryBus;
    use crate::led::encoder::decode::decode;

    fn strip(num_leds: usize) -> (PixelStrip<MemoryBus>, MemoryBus) {
        let bus = MemoryBus::new();
        let strip = PixelStrip::new(bus.clone(), num_leds, 1.0, Duration::ZERO).unwrap();
        (strip, bus)
    }

    #[test]
    fn test_construction_clears_and_flushes_once() {
        let (strip, bus) = strip(3);
        assert_eq!(bus.write_count(), 1);
        assert_eq!(bus.writes()[0], encoder::encode(&[Pixel::OFF; 3]));
        assert_eq!(strip.flush_count(), 1);
    }

    #[test]
    fn test_set_pixel_and_show() {
        let (mut strip, bus) = strip(2);
        strip.set_pixel(1, 255, 0, 0);
        strip.show().unwrap();

        let decoded = decode(&bus.last_write().unwrap()).unwrap();
        assert_eq!(decoded, vec![0, 0, 0, 0, 255, 0]);
    }

    #[test]
    fn test_out_of_range_pixel_is_ignored() {
        let (mut strip, _bus) = strip(2);
        strip.set_pixel(2, 255, 255, 255);
        strip.set_pixel(usize::MAX, 255, 255, 255);
        assert!(strip.pixels().iter().all(|p| *p == Pixel::OFF));
    }

    #[test]
    fn test_brightness_scales_writes() {
        let bus = MemoryBus::new();
        let mut strip = PixelStrip::new(bus, 1, 0.5, Duration::ZERO).unwrap();
        strip.set_pixel(0, 255, 128, 0);
        assert_eq!(strip.pixels()[0], Pixel::new(128, 64, 0));
    }

    #[test]
    fn test_clear_resets_all_pixels() {
        let (mut strip, _bus) = strip(4);
        for i in 0..4 {
            strip.set_pixel(i, 1, 2, 3);
        }
        strip.clear();
        assert!(strip.pixels().iter().all(|p| *p == Pixel::OFF));
    }

    #[test]
    fn test_short_write_is_an_error() {
        let (mut strip, bus) = strip(2);
        bus.limit_writes(10);
        assert!(matches!(
            strip.show(),
            Err(StripError::ShortWrite {
                expected: 18,
                written: 10
            })
        ));
    }

    #[test]
    fn test_bus_failure_is_an_error() {
        let (mut strip, bus) = strip(1);
        bus.fail_writes();
        assert!(matches!(strip.show(), Err(StripError::WriteFailed { .. })));
    }

    #[test]
    fn test_close_flushes_exactly_once() {
        let (mut strip, bus) = strip(2);
        strip.set_pixel(0, 9, 9, 9);

        strip.close();
        strip.close();
        drop(strip);

        // initial clear + one teardown clear
        assert_eq!(bus.write_count(), 2);
        assert_eq!(bus.last_write().unwrap(), encoder::encode(&[Pixel::OFF; 2]));
    }

    #[test]
    fn test_drop_flushes_once() {
        let (strip, bus) = strip(2);
        drop(strip);
        assert_eq!(bus.write_count(), 2);
    }

    #[test]
    fn test_teardown_failure_is_swallowed() {
        let (mut strip, bus) = strip(2);
        bus.fail_writes();
        strip.close();
        assert!(strip.is_closed());
        assert!(matches!(strip.show(), Err(StripError::Closed)));
    }

    #[test]
    fn test_failed_construction_writes_once() {
        let bus = MemoryBus::new();
        bus.limit_writes(4);

        let result = PixelStrip::new(bus.clone(), 2, 1.0, Duration::ZERO);

        assert!(matches!(
            result,
            Err(StripError::ShortWrite {
                expected: 18,
                written: 4
            })
        ));
        assert_eq!(bus.write_count(), 1);
    }

    #[test]
    fn test_reset_gap_between_frames() {
        let bus = MemoryBus::new();
        let gap = Duration::from_millis(5);
        let mut strip = PixelStrip::new(bus, 1, 1.0, gap).unwrap();

        strip.show().unwrap();
        let start = Instant::now();
        strip.show().unwrap();
        assert!(start.elapsed() >= gap / 2);
    }
}
