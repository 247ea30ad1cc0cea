//! Cross-thread behaviour of the frame exchange under a fast producer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use note_strip::audio::{CaptureCallback, FrameExchange};
use note_strip::ShutdownFlag;

const FRAME_SIZE: usize = 1024;

#[test]
fn test_consumer_never_sees_torn_frames() {
    let exchange = Arc::new(FrameExchange::new(FRAME_SIZE));
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let exchange = Arc::clone(&exchange);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut frame = vec![0.0f32; FRAME_SIZE];
            for generation in 1..=5_000u64 {
                frame.fill(generation as f32);
                exchange.publish(&frame).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut out = vec![0.0f32; FRAME_SIZE];
    let mut last_generation = 0u64;
    let mut observed = 0usize;
    loop {
        let finished = done.load(Ordering::SeqCst);
        if let Some(generation) = exchange.try_consume_into(&mut out) {
            assert!(generation > last_generation);
            let first = out[0];
            assert!(out.iter().all(|&s| s == first), "torn frame at {generation}");
            assert_eq!(first as u64, generation);
            last_generation = generation;
            observed += 1;
        } else if finished {
            break;
        }
    }

    producer.join().unwrap();
    assert!(observed >= 1);
    assert_eq!(last_generation, 5_000);
}

#[test]
fn test_capture_callback_on_foreign_thread() {
    let exchange = Arc::new(FrameExchange::new(FRAME_SIZE));
    let shutdown = ShutdownFlag::new();
    let mut callback = CaptureCallback::new(Arc::clone(&exchange), shutdown.clone(), 2).unwrap();
    let stats = callback.stats();

    let handle = thread::spawn(move || {
        // Stereo blocks of 256 frames; left carries the signal
        let block: Vec<f32> = (0..256).flat_map(|i| [i as f32, -1.0]).collect();
        for _ in 0..8 {
            callback.on_input(&block, false);
        }
    });
    handle.join().unwrap();

    assert_eq!(stats.frames_published(), 2);
    let frame = exchange.try_consume().unwrap();
    assert_eq!(frame.samples[0], 0.0);
    assert_eq!(frame.samples[255], 255.0);
    assert_eq!(frame.samples[256], 0.0);
    assert!(frame.samples.iter().all(|&s| s >= 0.0));
}
