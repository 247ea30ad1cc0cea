// LED strip / serial bus error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Strip error code constants
///
/// Error code range: 2001-2005
pub struct StripErrorCodes {}

impl StripErrorCodes {
    /// Bus device could not be opened
    pub const BUS_OPEN_FAILED: i32 = 2001;

    /// Bus mode, word size, or clock could not be applied
    pub const BUS_CONFIGURE_FAILED: i32 = 2002;

    /// The bus write call itself failed
    pub const WRITE_FAILED: i32 = 2003;

    /// The bus accepted fewer bytes than the encoded frame
    pub const SHORT_WRITE: i32 = 2004;

    /// The bus handle was already released
    pub const CLOSED: i32 = 2005;
}

/// Log a strip error with structured context
pub fn log_strip_error(err: &StripError, context: &str) {
    tracing::error!(
        "Strip error in {}: code={}, component=PixelStrip, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while opening the LED bus or transmitting a frame
///
/// Open/configure failures are fatal at startup. Write failures are fatal
/// for the frame being transmitted.
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum StripError {
    /// Bus device could not be opened
    BusOpenFailed { device: String, reason: String },

    /// Bus could not be configured
    BusConfigureFailed { reason: String },

    /// Write call returned an error
    WriteFailed { reason: String },

    /// Fewer bytes were written than requested
    ShortWrite { expected: usize, written: usize },

    /// The strip has already released its bus
    Closed,
}

impl ErrorCode for StripError {
    fn code(&self) -> i32 {
        match self {
            StripError::BusOpenFailed { .. } => StripErrorCodes::BUS_OPEN_FAILED,
            StripError::BusConfigureFailed { .. } => StripErrorCodes::BUS_CONFIGURE_FAILED,
            StripError::WriteFailed { .. } => StripErrorCodes::WRITE_FAILED,
            StripError::ShortWrite { .. } => StripErrorCodes::SHORT_WRITE,
            StripError::Closed => StripErrorCodes::CLOSED,
        }
    }

    fn message(&self) -> String {
        match self {
            StripError::BusOpenFailed { device, reason } => {
                format!(
                    "Cannot open SPI device {}: {}. Check permissions or if SPI is enabled.",
                    device, reason
                )
            }
            StripError::BusConfigureFailed { reason } => {
                format!("Cannot configure SPI device: {}", reason)
            }
            StripError::WriteFailed { reason } => {
                format!("Failed to write to SPI device: {}", reason)
            }
            StripError::ShortWrite { expected, written } => {
                format!(
                    "Short write to SPI device: {} of {} bytes",
                    written, expected
                )
            }
            StripError::Closed => "LED strip bus already closed".to_string(),
        }
    }
}

impl fmt::Display for StripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StripError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StripError {}

impl From<std::io::Error> for StripError {
    fn from(err: std::io::Error) -> Self {
        StripError::WriteFailed {
            reason: err.to_string(),
        }
    }
}
