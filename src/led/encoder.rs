// Encoder - WS2812 single-wire protocol emulated on an SPI bus
//
// With the bus clocked at 3× the LED bit rate (2.4 MHz for 800 kHz LEDs) every
// logical bit becomes three bus bits:
//
//   logical 1 → 1 1 0
//   logical 0 → 1 0 0
//
// Channels go out in G, R, B order, most significant bit first. One color byte
// expands to exactly 24 bus bits (3 bytes), so per-byte expansion through a
// lookup table yields the same stream as continuous MSB-first packing of the
// whole frame: 72 bus bits = 9 bytes per LED, no padding anywhere.

use super::strip::Pixel;

/// Encoded bytes per LED (24 logical bits × 3)
pub const BYTES_PER_PIXEL: usize = 9;

const ONE_PATTERN: u32 = 0b110;
const ZERO_PATTERN: u32 = 0b100;

const fn expand_byte(byte: u8) -> [u8; 3] {
    let mut bits: u32 = 0;
    let mut i = 0;
    while i < 8 {
        bits <<= 3;
        bits |= if byte & (0x80 >> i) != 0 {
            ONE_PATTERN
        } else {
            ZERO_PATTERN
        };
        i += 1;
    }
    [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
}

const fn build_table() -> [[u8; 3]; 256] {
    let mut table = [[0u8; 3]; 256];
    let mut byte = 0;
    while byte < 256 {
        table[byte] = expand_byte(byte as u8);
        byte += 1;
    }
    table
}

/// Bus bytes for every color byte value
static EXPANSION: [[u8; 3]; 256] = build_table();

/// Number of bus bytes for `num_leds` LEDs
pub fn encoded_len(num_leds: usize) -> usize {
    num_leds * BYTES_PER_PIXEL
}

/// Encode `pixels` into `out`, replacing its contents
///
/// `out` keeps its capacity across calls, so a strip that reuses one buffer
/// does not allocate after the first frame.
pub fn encode_into(pixels: &[Pixel], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(encoded_len(pixels.len()));
    for pixel in pixels {
        for channel in [pixel.g, pixel.r, pixel.b] {
            out.extend_from_slice(&EXPANSION[channel as usize]);
        }
    }
}

/// Encode `pixels` into a fresh buffer
pub fn encode(pixels: &[Pixel]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(pixels.len()));
    encode_into(pixels, &mut out);
    out
}

#[cfg(test)]
pub(crate) mod decode {
    /// Recover the logical G, R, B byte sequence from a bus stream
    ///
    /// Fails on any 3-bit group that is neither `110` nor `100`.
    pub fn decode(stream: &[u8]) -> Result<Vec<u8>, String> {
        let bits: Vec<bool> = stream
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
            .collect();
        if bits.len() % 24 != 0 {
            return Err(format!("{} bits is not a whole number of bytes", bits.len()));
        }

        bits.chunks(24)
            .map(|group| {
                group.chunks(3).try_fold(0u8, |acc, symbol| match symbol {
                    [true, true, false] => Ok((acc << 1) | 1),
                    [true, false, false] => Ok(acc << 1),
                    other => Err(format!("invalid symbol {:?}", other)),
                })
            })
            .collect()
    }
}
