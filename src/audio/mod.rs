// Audio module - microphone capture and frame hand-off to the analysis loop

pub mod capture;
pub mod engine_cpal;
pub mod frame_exchange;
pub mod replay;

// Re-export commonly used types for convenience
pub use capture::{CallbackStatus, CaptureCallback, CaptureStats, CaptureStream};
pub use engine_cpal::{list_input_devices, CpalCapture};
pub use frame_exchange::{AudioFrame, FrameExchange};
pub use replay::{ReplayOptions, WavReplay};
