//! # Processor Module
//!
//! Turns untrusted image bytes into a small, normalized RGBA pixel buffer.
//!
//! ## Processors
//! - **image** - `image` crate decode, premultiplied Triangle resize
//! - **fast** - zune-jpeg decode for JPEG, SIMD bilinear resize via
//!   `fast_image_resize`
//!
//! Both follow the same steps:
//! 1. Read the declared dimensions from the header and reject oversized input
//! 2. Decode under a per-call [`ResourceGovernor`] budget
//! 3. Shrink to fit 100x100 (aspect preserved) if either side exceeds 100px,
//!    with alpha premultiplied during the resize
//! 4. Read back row-major RGBA, alpha 0 = transparent, 255 = opaque
//!
//! The processor is chosen once per configuration (see [`ProcessorFactory`])
//! because switching it changes hash output for already-hashed content.

mod factory;
#[cfg(feature = "fast-processor")]
mod fast;
#[cfg(feature = "fast-processor")]
pub mod fast_decode;
#[cfg(feature = "fast-processor")]
pub mod fast_resize;
pub mod governor;
#[cfg(feature = "image-processor")]
mod standard;

pub use factory::{ProcessorFactory, ProcessorKind};
#[cfg(feature = "fast-processor")]
pub use fast::FastProcessor;
pub use governor::{GovernorGuard, ResourceGovernor, ResourceLimits};
#[cfg(feature = "image-processor")]
pub use standard::StandardProcessor;

use crate::error::DecodeError;
use image::{ImageError, ImageReader, RgbaImage};
use std::io::Cursor;

/// Longest side of the buffer handed to the encoder
pub const TARGET_SIZE: u32 = 100;

/// Maximum width or height accepted from an image header
pub const MAX_DIMENSION: u32 = 5000;

/// Maximum total pixel count accepted from an image header
pub const MAX_PIXELS: u64 = 25_000_000;

/// Decoded, downscaled pixels.
///
/// `pixels.len() == width * height * 4`, RGBA order, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking the length invariant
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DecodeError::Backend(format!(
                "pixel buffer holds {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    /// RGBA value at (x, y)
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }
}

/// An interchangeable decoding backend
pub trait ImageProcessor: Send + Sync {
    /// Decode `content` and return at most 100x100 normalized RGBA pixels
    fn extract_pixels(&self, content: &[u8]) -> Result<PixelBuffer, DecodeError>;

    /// Which processor this is
    fn kind(&self) -> ProcessorKind;
}

/// Output size for a source image.
///
/// Images that already fit in 100x100 are left alone; larger ones are
/// scaled by `min(100/w, 100/h)` with each side rounded and kept >= 1.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= TARGET_SIZE && height <= TARGET_SIZE {
        return (width, height);
    }

    let scale = f64::min(
        TARGET_SIZE as f64 / width as f64,
        TARGET_SIZE as f64 / height as f64,
    );
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);

    (new_width, new_height)
}

/// Bytes per pixel of the premultiplied copy a processor resizes
pub(crate) const WORKING_PIXEL_BYTES: u64 = 8;

/// Premultiplied 16-bit RGBA for every pixel of `image`.
///
/// Both processors resample in this space. At 8 bits the rounding of a
/// faint premultiplied channel is magnified by `255 / alpha` when it is
/// divided back out, and two resamplers drift apart by many levels.
pub(crate) fn premultiplied(image: &RgbaImage) -> impl Iterator<Item = [u16; 4]> + '_ {
    image.pixels().map(|pixel| {
        let alpha = pixel[3] as u32 * 257;
        let scale = |channel: u8| ((channel as u32 * 257 * alpha + 32_767) / 65_535) as u16;
        [scale(pixel[0]), scale(pixel[1]), scale(pixel[2]), alpha as u16]
    })
}

/// Straight 8-bit RGBA from resampled [`premultiplied`] pixels.
///
/// Pixels whose alpha rounds to 0 come out as (0, 0, 0, 0).
pub(crate) fn unpremultiplied(pixels: impl Iterator<Item = [u16; 4]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.size_hint().0 * 4);
    for [r, g, b, a] in pixels {
        let alpha = (a as u32 + 128) / 257;
        if alpha == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        let a = a as u32;
        let straight = |channel: u16| ((channel as u32 * 255 + a / 2) / a).min(255) as u8;
        out.extend_from_slice(&[straight(r), straight(g), straight(b), alpha as u8]);
    }
    out
}

/// Reject dimensions outside `limits` before any pixel storage is allocated
pub fn check_dimensions(
    width: u32,
    height: u32,
    limits: &ResourceLimits,
) -> Result<(), DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }

    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(DecodeError::DimensionsTooLarge {
            width,
            height,
            max_dimension: limits.max_dimension,
        });
    }

    let pixels = width as u64 * height as u64;
    if pixels > limits.max_pixels {
        return Err(DecodeError::TooManyPixels {
            pixels,
            max_pixels: limits.max_pixels,
        });
    }

    Ok(())
}

/// Open an `image` reader over in-memory bytes with the format sniffed
/// from the magic bytes.
pub(crate) fn open_reader(content: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    let reader = ImageReader::new(Cursor::new(content))
        .with_guessed_format()
        .map_err(|e| DecodeError::Backend(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::UnsupportedFormat);
    }

    Ok(reader)
}

/// Read only the header to get the declared dimensions
pub(crate) fn probe_dimensions(content: &[u8]) -> Result<(u32, u32), DecodeError> {
    open_reader(content)?
        .into_dimensions()
        .map_err(map_image_error)
}

/// Full decode through the `image` crate under the active governor limits
pub(crate) fn decode_with_limits(content: &[u8]) -> Result<RgbaImage, DecodeError> {
    let limits = governor::active_limits();

    let (width, height) = probe_dimensions(content)?;
    check_dimensions(width, height, &limits)?;

    let mut reader = open_reader(content)?;
    reader.limits(limits.decoder_limits());
    let image = reader.decode().map_err(map_image_error)?;

    // Decoders may report different dimensions than the header
    check_dimensions(image.width(), image.height(), &limits)?;
    limits.charge(image.width() as u64 * image.height() as u64 * 4)?;

    Ok(image.into_rgba8())
}

pub(crate) fn map_image_error(error: ImageError) -> DecodeError {
    match error {
        ImageError::Unsupported(_) => DecodeError::UnsupportedFormat,
        other => DecodeError::Backend(other.to_string()),
    }
}
