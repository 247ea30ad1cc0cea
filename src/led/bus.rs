//! Serial bus collaborators for the LED strip
//!
//! [`LedBus`] is the seam between the strip and the hardware: the Linux build
//! talks to a spidev character device, everything else (tests, dry runs,
//! machines without SPI) records frames in a [`MemoryBus`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::StripConfig;
use crate::error::StripError;

/// Byte-oriented serial bus carrying encoded LED frames
pub trait LedBus {
    /// Write one encoded frame, returning how many bytes the bus accepted
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StripError>;
}

impl<B: LedBus + ?Sized> LedBus for Box<B> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StripError> {
        (**self).write(bytes)
    }
}

#[cfg(target_os = "linux")]
pub use linux::SpidevBus;

#[cfg(target_os = "linux")]
mod linux {
    use std::io::Write;

    use spidev::{SpiModeFlags, Spidev, SpidevOptions};

    use super::LedBus;
    use crate::error::StripError;

    /// SPI bus opened through the Linux spidev interface
    pub struct SpidevBus {
        spi: Spidev,
        device: String,
    }

    impl SpidevBus {
        /// Open `device` and configure mode 0, 8-bit words, `clock_hz`
        pub fn open(device: &str, clock_hz: u32) -> Result<Self, StripError> {
            let mut spi = Spidev::open(device).map_err(|e| StripError::BusOpenFailed {
                device: device.to_string(),
                reason: e.to_string(),
            })?;

            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(clock_hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options)
                .map_err(|e| StripError::BusConfigureFailed {
                    reason: format!("{}: {}", device, e),
                })?;

            tracing::info!("[Bus] Opened {} at {} Hz", device, clock_hz);
            Ok(Self {
                spi,
                device: device.to_string(),
            })
        }

        pub fn device(&self) -> &str {
            &self.device
        }
    }

    impl LedBus for SpidevBus {
        fn write(&mut self, bytes: &[u8]) -> Result<usize, StripError> {
            Ok(self.spi.write(bytes)?)
        }
    }

    impl Drop for SpidevBus {
        fn drop(&mut self) {
            tracing::debug!("[Bus] Closing {}", self.device);
        }
    }
}

/// Open the hardware bus described by `config`
#[cfg(target_os = "linux")]
pub fn open_spi_bus(config: &StripConfig) -> Result<Box<dyn LedBus>, StripError> {
    Ok(Box::new(SpidevBus::open(
        &config.spi_device,
        config.spi_clock_hz,
    )?))
}

/// Open the hardware bus described by `config`
#[cfg(not(target_os = "linux"))]
pub fn open_spi_bus(config: &StripConfig) -> Result<Box<dyn LedBus>, StripError> {
    Err(StripError::BusOpenFailed {
        device: config.spi_device.clone(),
        reason: "spidev is only available on Linux".to_string(),
    })
}

#[derive(Debug, Default)]
struct MemoryBusState {
    writes: Vec<Vec<u8>>,
    /// Accept at most this many bytes per write
    max_write: Option<usize>,
    fail_writes: bool,
}

/// In-memory bus that records every frame written to it
///
/// Clones share the same recording, so a test can keep one handle while the
/// strip owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryBusState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryBusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept at most `limit` bytes per write from now on
    pub fn limit_writes(&self, limit: usize) {
        self.lock().max_write = Some(limit);
    }

    /// Make every following write fail with an I/O error
    pub fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }

    /// Frames written so far, oldest first
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    pub fn last_write(&self) -> Option<Vec<u8>> {
        self.lock().writes.last().cloned()
    }
}

impl LedBus for MemoryBus {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StripError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "bus failure").into());
        }
        let accepted = state.max_write.map_or(bytes.len(), |max| max.min(bytes.len()));
        state.writes.push(bytes[..accepted].to_vec());
        Ok(accepted)
    }
}
