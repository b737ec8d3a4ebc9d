//! Single-image primitives: decode, scale, append, JPEG re-encode.
//!
//! All pipeline image steps are composed from the functions in this module.
//! Pixel density survives format translation: TIFF resolution tags are
//! carried over into the JFIF APP0 segment of the produced JPEG, existing
//! JPEG density is forwarded unchanged.

pub mod footer;
pub mod jfif;

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, RgbImage};

use crate::error::{Error, Result};
use jfif::JfifDensity;

/// Density and provenance carried alongside a decoded image.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageMetadata {
    /// Pixel density to stamp into produced JPEGs
    pub density: Option<JfifDensity>,
}

/// Decode an image file together with its density metadata.
///
/// TIFF sources get their `XResolution` translated to a dots/inch JFIF
/// density (X copied to both axes); JPEG sources forward their JFIF segment
/// unchanged; anything else carries no density.
pub fn read_with_metadata(path: &Path) -> Result<(DynamicImage, ImageMetadata)> {
    let img = image::open(path)
        .map_err(|e| Error::Image(format!("decode {}: {}", path.display(), e)))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let density = match ext.as_str() {
        "tif" | "tiff" => tiff_dpi(path)?.map(|dpi| JfifDensity::dots_per_inch(dpi, dpi)),
        "jpg" | "jpeg" => {
            let bytes = std::fs::read(path)?;
            jfif::read_density(&bytes)?
        }
        _ => None,
    };

    Ok((img, ImageMetadata { density }))
}

/// Read the horizontal resolution of a TIFF file in dots per inch.
///
/// Centimetre-based resolutions are converted; a missing tag yields `None`.
fn tiff_dpi(path: &Path) -> Result<Option<u16>> {
    use tiff::decoder::ifd::Value;
    use tiff::tags::Tag;

    let reader = BufReader::new(File::open(path)?);
    let mut decoder = tiff::decoder::Decoder::new(reader)
        .map_err(|e| Error::Image(format!("read TIFF tags of {}: {}", path.display(), e)))?;

    let resolution = match decoder.find_tag(Tag::XResolution) {
        Ok(Some(Value::Rational(num, den))) if den != 0 => num as f32 / den as f32,
        Ok(Some(Value::Unsigned(v))) => v as f32,
        _ => return Ok(None),
    };

    // TIFF ResolutionUnit: 2 = inch (default), 3 = centimetre.
    let unit = match decoder.find_tag(Tag::ResolutionUnit) {
        Ok(Some(Value::Short(v))) => v,
        Ok(Some(Value::Unsigned(v))) => v as u16,
        _ => 2,
    };
    let dpi = if unit == 3 {
        resolution * 2.54
    } else {
        resolution
    };
    Ok(Some(dpi.round() as u16))
}

/// Uniformly scale an image by the given ratio.
pub fn scale(img: &DynamicImage, ratio: f32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let nw = ((w as f32 * ratio).round() as u32).max(1);
    let nh = ((h as f32 * ratio).round() as u32).max(1);
    img.resize_exact(nw, nh, FilterType::Lanczos3)
}

/// Scale down so that `max(width, height) <= max_dim`, preserving aspect.
///
/// `max_dim == 0` disables the limit; images already within it pass through
/// untouched. Returns the applied ratio alongside the image.
pub fn handle_maximal(img: DynamicImage, max_dim: u32) -> (DynamicImage, f32) {
    if max_dim == 0 {
        return (img, 1.0);
    }
    let (w, h) = img.dimensions();
    let larger = w.max(h);
    if larger <= max_dim {
        return (img, 1.0);
    }
    let ratio = max_dim as f32 / larger as f32;
    (scale(&img, ratio), ratio)
}

/// Stack `bottom` below `top`; the result takes the width of `top`.
pub fn append(top: &DynamicImage, bottom: &DynamicImage) -> DynamicImage {
    let (w, top_h) = top.dimensions();
    let bottom_h = bottom.height();
    let mut canvas = RgbImage::from_pixel(w, top_h + bottom_h, image::Rgb([255, 255, 255]));
    image::imageops::replace(&mut canvas, &top.to_rgb8(), 0, 0);
    image::imageops::replace(&mut canvas, &bottom.to_rgb8(), 0, top_h as i64);
    DynamicImage::ImageRgb8(canvas)
}

/// Encode an image as JPEG at the given quality and stamp its density.
///
/// Grayscale images stay single-component; everything else is encoded RGB.
pub fn write_jpeg(
    img: &DynamicImage,
    path: &Path,
    quality: u8,
    metadata: &ImageMetadata,
) -> Result<()> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
    let (w, h) = img.dimensions();
    match img {
        DynamicImage::ImageLuma8(gray) => encoder
            .encode(gray.as_raw(), w, h, ExtendedColorType::L8)
            .map_err(|e| Error::Image(format!("encode {}: {}", path.display(), e)))?,
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) => {
            let gray = img.to_luma8();
            encoder
                .encode(gray.as_raw(), w, h, ExtendedColorType::L8)
                .map_err(|e| Error::Image(format!("encode {}: {}", path.display(), e)))?
        }
        other => {
            let rgb = other.to_rgb8();
            encoder
                .encode(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(|e| Error::Image(format!("encode {}: {}", path.display(), e)))?
        }
    }

    if let Some(density) = metadata.density {
        jfif::write_density(&mut bytes, density)?;
    }

    std::fs::write(path, &bytes)?;
    Ok(())
}
