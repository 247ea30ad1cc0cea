// Error types for the note strip pipeline
//
// This module defines the error taxonomy for audio capture, LED transmission,
// and configuration, with numeric codes so that failures can be reported
// consistently in logs and at the process boundary.

mod audio;
mod config;
mod strip;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use strip::{log_strip_error, StripError, StripErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// module boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
