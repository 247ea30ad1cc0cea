// LED module - WS2812 strip driven over a byte-oriented SPI bus
//
// Pixel writes land in PixelStrip's buffer; show() runs the encoder over the
// whole buffer and hands the result to the bus in one write.

pub mod bus;
pub mod encoder;
pub mod strip;

pub use bus::{open_spi_bus, LedBus, MemoryBus};
pub use encoder::{encode, encode_into, BYTES_PER_PIXEL};
pub use strip::{Pixel, PixelStrip};

#[cfg(target_os = "linux")]
pub use bus::SpidevBus;
