// Note Strip Core - live pitch-class detection driving a WS2812 LED strip
// Microphone frames are analyzed with an FFT, folded into the 12 chromatic
// pitch classes, and shown as colored blocks on an SPI-driven strip

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod led;
pub mod pipeline;
pub mod shutdown;

// Re-exports for convenience
pub use config::AppConfig;
pub use pipeline::{NotePipeline, NoteRenderer, PipelineStats};
pub use shutdown::ShutdownFlag;
