//! JFIF APP0 density handling for encoded JPEG bytes.
//!
//! The JPEG encoder carries no resolution information of its own, so the
//! pixel density is read and written directly on the encoded byte stream:
//! the JFIF APP0 segment stores a unit byte (0 = none, 1 = dots/inch,
//! 2 = dots/cm) followed by big-endian X and Y densities.

use crate::error::{Error, Result};

/// Pixel density as stored in a JFIF APP0 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JfifDensity {
    /// Density unit: 0 = aspect ratio only, 1 = dots/inch, 2 = dots/cm
    pub units: u8,
    /// Horizontal density
    pub x_density: u16,
    /// Vertical density
    pub y_density: u16,
}

impl JfifDensity {
    /// Density in dots per inch.
    pub fn dots_per_inch(x: u16, y: u16) -> Self {
        Self {
            units: 1,
            x_density: x,
            y_density: y,
        }
    }
}

/// Read the JFIF density of an encoded JPEG, if an APP0 segment is present.
pub fn read_density(data: &[u8]) -> Result<Option<JfifDensity>> {
    Ok(find_app0(data)?.map(|pos| {
        // pos points at the APP0 marker; identifier starts at pos + 4,
        // version at pos + 9, units at pos + 11.
        JfifDensity {
            units: data[pos + 11],
            x_density: u16::from_be_bytes([data[pos + 12], data[pos + 13]]),
            y_density: u16::from_be_bytes([data[pos + 14], data[pos + 15]]),
        }
    }))
}

/// Set the JFIF density of an encoded JPEG in place.
///
/// When the encoder emitted no JFIF APP0 segment, a minimal one is inserted
/// directly after SOI.
pub fn write_density(data: &mut Vec<u8>, density: JfifDensity) -> Result<()> {
    match find_app0(data)? {
        Some(pos) => {
            data[pos + 11] = density.units;
            data[pos + 12..pos + 14].copy_from_slice(&density.x_density.to_be_bytes());
            data[pos + 14..pos + 16].copy_from_slice(&density.y_density.to_be_bytes());
        }
        None => {
            // Minimal APP0: length 16, "JFIF\0", version 1.1, density, no thumbnail.
            let mut segment = Vec::with_capacity(18);
            segment.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
            segment.extend_from_slice(b"JFIF\0");
            segment.extend_from_slice(&[0x01, 0x01]);
            segment.push(density.units);
            segment.extend_from_slice(&density.x_density.to_be_bytes());
            segment.extend_from_slice(&density.y_density.to_be_bytes());
            segment.extend_from_slice(&[0x00, 0x00]);
            data.splice(2..2, segment);
        }
    }
    Ok(())
}

/// Locate the JFIF APP0 marker, returning the offset of its 0xFF byte.
fn find_app0(data: &[u8]) -> Result<Option<usize>> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::Image("not a valid JPEG stream".to_string()));
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return Err(Error::Image(format!(
                "malformed JPEG marker at offset {}",
                pos
            )));
        }
        let marker = data[pos + 1];
        // Entropy-coded data starts at SOS; no APP0 beyond this point.
        if marker == 0xDA {
            break;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if marker == 0xE0
            && pos + 9 <= data.len()
            && length >= 14
            && &data[pos + 4..pos + 9] == b"JFIF\0"
        {
            if pos + 16 > data.len() {
                return Err(Error::Image("truncated JFIF APP0 segment".to_string()));
            }
            return Ok(Some(pos));
        }
        pos += 2 + length;
    }
    Ok(None)
}
