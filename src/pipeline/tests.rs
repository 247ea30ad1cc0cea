use super::*;
use crate::audio::{CaptureCallback, CaptureStats};
use crate::error::AudioError;
use crate::fixtures::synth;
use crate::led::encoder::decode::decode;
use crate::led::{MemoryBus, Pixel};
use std::sync::atomic::{AtomicUsize, Ordering};

const SAMPLE_RATE: u32 = 44_100;
const FRAME_SIZE: usize = 2048;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.strip.reset_gap_us = 0;
    config
}

fn pipeline() -> (NotePipeline<MemoryBus>, MemoryBus, ShutdownFlag) {
    let bus = MemoryBus::new();
    let shutdown = ShutdownFlag::new();
    let pipeline = NotePipeline::new(&config(), bus.clone(), shutdown.clone()).unwrap();
    (pipeline, bus, shutdown)
}

/// Decode the last frame written to `bus` back into pixels
fn last_pixels(bus: &MemoryBus) -> Vec<Pixel> {
    let grb = decode(&bus.last_write().unwrap()).unwrap();
    grb.chunks(3)
        .map(|c| Pixel::new(c[1], c[0], c[2]))
        .collect()
}

fn lit_leds(pixels: &[Pixel]) -> Vec<usize> {
    pixels
        .iter()
        .enumerate()
        .filter(|(_, p)| **p != Pixel::OFF)
        .map(|(i, _)| i)
        .collect()
}

/// Capture stand-in counting how often it is stopped
struct CountingCapture {
    stops: Arc<AtomicUsize>,
    stats: Arc<CaptureStats>,
}

impl CaptureStream for CountingCapture {
    fn stop(&mut self) -> Result<(), AudioError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }
}

#[test]
fn test_construction_flushes_cleared_strip() {
    let (pipeline, bus, _shutdown) = pipeline();
    assert_eq!(bus.write_count(), 1);
    assert_eq!(last_pixels(&bus).len(), 48);
    assert!(lit_leds(&last_pixels(&bus)).is_empty());
    assert!(!pipeline.is_torn_down());
}

#[test]
fn test_cycle_without_new_frame_does_nothing() {
    let (mut pipeline, bus, _shutdown) = pipeline();
    assert!(!pipeline.run_cycle().unwrap());
    assert_eq!(bus.write_count(), 1);
}

#[test]
fn test_a440_lights_a_block() {
    let (mut pipeline, bus, _shutdown) = pipeline();
    let frame = synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE);
    pipeline.exchange().publish(&frame).unwrap();

    assert!(pipeline.run_cycle().unwrap());

    let pixels = last_pixels(&bus);
    assert_eq!(lit_leds(&pixels), vec![36, 37, 38, 39]);
    assert_eq!(pixels[36], Pixel::new(255, 0, 128));
    assert_eq!(pipeline.stats().frames_rendered, 1);
}

#[test]
fn test_two_tones_light_two_blocks() {
    let (mut pipeline, bus, _shutdown) = pipeline();
    let frame = synth::mix(&[
        synth::sine(261.63, 0.1, SAMPLE_RATE, FRAME_SIZE),
        synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE),
    ]);
    pipeline.exchange().publish(&frame).unwrap();
    pipeline.run_cycle().unwrap();

    let pixels = last_pixels(&bus);
    assert_eq!(lit_leds(&pixels), vec![0, 1, 2, 3, 36, 37, 38, 39]);
    assert_eq!(pixels[0], Pixel::new(0, 0, 255));
}

#[test]
fn test_silence_clears_previous_notes() {
    let (mut pipeline, bus, _shutdown) = pipeline();
    let exchange = pipeline.exchange();

    exchange
        .publish(&synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE))
        .unwrap();
    pipeline.run_cycle().unwrap();
    assert!(!lit_leds(&last_pixels(&bus)).is_empty());

    exchange.publish(&vec![0.0; FRAME_SIZE]).unwrap();
    pipeline.run_cycle().unwrap();
    assert!(lit_leds(&last_pixels(&bus)).is_empty());
}

#[test]
fn test_only_latest_frame_is_rendered() {
    let (mut pipeline, bus, _shutdown) = pipeline();
    let exchange = pipeline.exchange();

    exchange
        .publish(&synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE))
        .unwrap();
    exchange
        .publish(&synth::sine(261.63, 0.1, SAMPLE_RATE, FRAME_SIZE))
        .unwrap();

    assert!(pipeline.run_cycle().unwrap());
    assert!(!pipeline.run_cycle().unwrap());
    assert_eq!(lit_leds(&last_pixels(&bus)), vec![0, 1, 2, 3]);
}

#[test]
fn test_shutdown_before_run_tears_down_once() {
    let (mut pipeline, bus, shutdown) = pipeline();
    let stops = Arc::new(AtomicUsize::new(0));
    pipeline.attach_capture(Box::new(CountingCapture {
        stops: Arc::clone(&stops),
        stats: Arc::new(CaptureStats::default()),
    }));

    shutdown.request();
    pipeline.run().unwrap();
    pipeline.teardown();
    drop(pipeline);

    // initial clear + teardown clear
    assert_eq!(bus.write_count(), 2);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_mid_run_flushes_exactly_once_more() {
    let (mut pipeline, bus, shutdown) = pipeline();
    let exchange = pipeline.exchange();

    let producer = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            let tone = synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE);
            for _ in 0..20 {
                exchange.publish(&tone).unwrap();
                thread::sleep(Duration::from_millis(2));
            }
            shutdown.request();
        })
    };

    pipeline.run().unwrap();
    producer.join().unwrap();

    let rendered = pipeline.stats().frames_rendered;
    assert!(rendered >= 1);
    assert!(pipeline.is_torn_down());
    assert_eq!(bus.write_count() as u64, rendered + 2);
    assert!(lit_leds(&last_pixels(&bus)).is_empty());

    drop(pipeline);
    assert_eq!(bus.write_count() as u64, rendered + 2);
}

#[test]
fn test_short_write_ends_loop_with_error() {
    let (mut pipeline, bus, shutdown) = pipeline();
    bus.limit_writes(100);
    pipeline
        .exchange()
        .publish(&synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE))
        .unwrap();

    let err = pipeline.run().unwrap_err();

    assert!(matches!(
        err,
        StripError::ShortWrite {
            expected: 432,
            written: 100
        }
    ));
    assert!(shutdown.is_requested());
    assert!(pipeline.is_torn_down());
    // initial + failed frame + teardown attempt
    assert_eq!(bus.write_count(), 3);
    assert_eq!(pipeline.stats().frames_rendered, 0);
}

#[test]
fn test_drop_without_run_tears_down() {
    let (mut pipeline, bus, _shutdown) = pipeline();
    let stops = Arc::new(AtomicUsize::new(0));
    pipeline.attach_capture(Box::new(CountingCapture {
        stops: Arc::clone(&stops),
        stats: Arc::new(CaptureStats::default()),
    }));

    drop(pipeline);

    assert_eq!(bus.write_count(), 2);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_overflows_are_tracked() {
    let (mut pipeline, _bus, shutdown) = pipeline();
    let mut callback = CaptureCallback::new(pipeline.exchange(), shutdown, 1).unwrap();
    pipeline.attach_capture(Box::new(CountingCapture {
        stops: Arc::new(AtomicUsize::new(0)),
        stats: callback.stats(),
    }));

    callback.on_input(&[0.0; 16], true);
    callback.on_input(&[0.0; 16], true);
    pipeline.run_cycle().unwrap();

    assert_eq!(pipeline.stats().overflows, 2);
}

#[test]
fn test_renderer_blocks_and_truncation() {
    let renderer = NoteRenderer::new(4, PaletteOrder::Chromatic);
    assert_eq!(renderer.block(PitchClass::C), 0..4);
    assert_eq!(renderer.block(PitchClass::B), 44..48);

    let bus = MemoryBus::new();
    let mut strip = PixelStrip::new(bus, 10, 1.0, Duration::ZERO).unwrap();
    let mut activity = NoteActivity::new();
    activity.record(PitchClass::D, 50.0);
    activity.record(PitchClass::A, 50.0);

    renderer.render(&activity, None, &mut strip);

    // D owns 8..12, of which only 8 and 9 exist; A's block is past the end
    let lit = lit_leds(strip.pixels());
    assert_eq!(lit, vec![8, 9]);
}

#[test]
fn test_renderer_fifths_palette() {
    let renderer = NoteRenderer::new(1, PaletteOrder::Fifths);
    let bus = MemoryBus::new();
    let mut strip = PixelStrip::new(bus, 12, 1.0, Duration::ZERO).unwrap();

    renderer.light(PitchClass::G, &mut strip);
    assert_eq!(strip.pixels()[7], Pixel::new(0, 128, 255));
}

#[test]
fn test_renderer_block_saturates() {
    let renderer = NoteRenderer::new(usize::MAX / 2, PaletteOrder::Chromatic);
    let block = renderer.block(PitchClass::B);
    assert_eq!(block.start, usize::MAX);
    assert!(block.is_empty());

    let mut strip = PixelStrip::new(MemoryBus::new(), 12, 1.0, Duration::ZERO).unwrap();
    renderer.light(PitchClass::B, &mut strip);
    assert!(lit_leds(strip.pixels()).is_empty());

    // C's block starts at 0 and runs past the strip
    renderer.light(PitchClass::C, &mut strip);
    assert_eq!(lit_leds(strip.pixels()).len(), 12);
}

#[test]
fn test_dominant_mode_fills_strip_with_strongest_class() {
    let renderer = NoteRenderer::new(4, PaletteOrder::Chromatic).with_mode(RenderMode::Dominant);
    let mut strip = PixelStrip::new(MemoryBus::new(), 48, 1.0, Duration::ZERO).unwrap();
    let mut activity = NoteActivity::new();
    activity.record(PitchClass::C, 50.0);
    activity.record(PitchClass::A, 90.0);

    renderer.render(&activity, Some(PitchClass::A), &mut strip);
    assert_eq!(lit_leds(strip.pixels()).len(), 48);
    assert!(strip.pixels().iter().all(|p| *p == Pixel::new(255, 0, 128)));

    renderer.render(&activity, None, &mut strip);
    assert!(lit_leds(strip.pixels()).is_empty());
}

#[test]
fn test_dominant_mode_pipeline_lights_whole_strip() {
    let mut config = config();
    config.strip.render_mode = RenderMode::Dominant;
    let bus = MemoryBus::new();
    let mut pipeline = NotePipeline::new(&config, bus.clone(), ShutdownFlag::new()).unwrap();

    pipeline
        .exchange()
        .publish(&synth::sine(440.0, 0.1, SAMPLE_RATE, FRAME_SIZE))
        .unwrap();
    assert!(pipeline.run_cycle().unwrap());

    let pixels = last_pixels(&bus);
    assert_eq!(pixels.len(), 48);
    assert!(pixels.iter().all(|p| *p == Pixel::new(255, 0, 128)));
}
