//! Image XObjects for page backgrounds.
//!
//! Derivative pages are JPEGs on disk; their bytes are embedded unchanged
//! behind a `DCTDecode` filter. Dimensions and colour space come from the
//! JPEG frame header.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

use super::object::Object;

/// Colour space of an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB colour (3 components per pixel)
    DeviceRGB,
    /// CMYK colour (4 components per pixel)
    DeviceCMYK,
}

impl ColorSpace {
    /// Get the PDF name for this colour space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// A JPEG ready for embedding as an image XObject.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Colour space from the frame header
    pub color_space: ColorSpace,
    /// Raw JPEG bytes (DCTDecode pass-through)
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Load a JPEG file for embedding.
    pub fn from_jpeg_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_jpeg_bytes(data)
            .map_err(|e| Error::Pdf(format!("{}: {}", path.display(), e)))
    }

    /// Wrap raw JPEG bytes for embedding.
    pub fn from_jpeg_bytes(data: Vec<u8>) -> Result<Self> {
        let (width, height, color_space) = parse_jpeg_header(&data)?;
        Ok(Self {
            width,
            height,
            color_space,
            data,
        })
    }

    /// Build the XObject stream.
    pub fn into_stream(self) -> Object {
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
        dict.insert("Width".to_string(), Object::Integer(self.width as i64));
        dict.insert("Height".to_string(), Object::Integer(self.height as i64));
        dict.insert(
            "ColorSpace".to_string(),
            Object::Name(self.color_space.pdf_name().to_string()),
        );
        dict.insert("BitsPerComponent".to_string(), Object::Integer(8));
        dict.insert("Filter".to_string(), Object::Name("DCTDecode".to_string()));
        Object::Stream {
            dict,
            data: self.data,
        }
    }
}

/// Parse a JPEG header to extract dimensions and colour space.
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace)> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::Pdf("not a valid JPEG".to_string()));
    }

    let mut pos = 2;
    while pos < data.len() - 1 {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        // Skip padding
        if marker == 0xFF || marker == 0x00 {
            continue;
        }

        // SOF markers (Start of Frame)
        if matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE
                | 0xCF
        ) {
            if pos + 7 > data.len() {
                return Err(Error::Pdf("truncated JPEG header".to_string()));
            }

            let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
            let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
            let components = data[pos + 7];

            let color_space = match components {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceRGB,
            };

            return Ok((width, height, color_space));
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += length;
    }

    Err(Error::Pdf("could not find JPEG dimensions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::io::Cursor;

    fn encoded_jpeg(w: u32, h: u32, gray: bool) -> Vec<u8> {
        let img = if gray {
            DynamicImage::ImageLuma8(image::GrayImage::from_pixel(w, h, image::Luma([128])))
        } else {
            DynamicImage::ImageRgb8(image::RgbImage::from_pixel(w, h, image::Rgb([10, 20, 30])))
        };
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .expect("encode");
        bytes
    }

    #[test]
    fn test_dimensions_from_frame_header() {
        let xobj = ImageXObject::from_jpeg_bytes(encoded_jpeg(320, 200, false)).expect("parses");
        assert_eq!(xobj.width, 320);
        assert_eq!(xobj.height, 200);
        assert_eq!(xobj.color_space, ColorSpace::DeviceRGB);
    }

    #[test]
    fn test_grayscale_detection() {
        let xobj = ImageXObject::from_jpeg_bytes(encoded_jpeg(64, 64, true)).expect("parses");
        assert_eq!(xobj.color_space, ColorSpace::DeviceGray);
    }

    #[test]
    fn test_stream_dictionary() {
        let xobj = ImageXObject::from_jpeg_bytes(encoded_jpeg(64, 32, false)).expect("parses");
        let stream = xobj.into_stream();
        let dict = stream.as_dict().expect("stream has dict");
        assert_eq!(dict.get("Filter"), Some(&Object::Name("DCTDecode".to_string())));
        assert_eq!(dict.get("Width"), Some(&Object::Integer(64)));
    }

    #[test]
    fn test_rejects_non_jpeg() {
        assert!(ImageXObject::from_jpeg_bytes(b"\x89PNG".to_vec()).is_err());
    }
}
