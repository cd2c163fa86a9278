//! Processor built only on the `image` crate.
//!
//! Resizes with `imageops::resize` (Triangle filter) on 16-bit premultiplied
//! pixels so transparent regions don't bleed color into their neighbours.

use super::governor::{self, ResourceGovernor, ResourceLimits};
use super::{
    decode_with_limits, premultiplied, target_dimensions, unpremultiplied, ImageProcessor,
    PixelBuffer, ProcessorKind, WORKING_PIXEL_BYTES,
};
use crate::error::DecodeError;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

/// `image` crate processor
#[derive(Debug, Clone, Default)]
pub struct StandardProcessor {
    limits: ResourceLimits,
}

impl StandardProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    fn resize_on_demand(&self, image: RgbaImage) -> Result<RgbaImage, DecodeError> {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = target_dimensions(width, height);
        if (new_width, new_height) == (width, height) {
            return Ok(image);
        }

        let limits = governor::active_limits();
        limits.charge(width as u64 * height as u64 * WORKING_PIXEL_BYTES)?;
        let working: Vec<u16> = premultiplied(&image).flatten().collect();
        drop(image);
        let working = ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, working)
            .ok_or_else(|| DecodeError::Resize("Failed to create working buffer".to_string()))?;

        // The resampler keeps one float buffer of new_height x width
        limits.charge(width as u64 * new_height as u64 * 16)?;
        let resized = imageops::resize(&working, new_width, new_height, FilterType::Triangle);

        RgbaImage::from_raw(new_width, new_height, unpremultiplied(resized.pixels().map(|p| p.0)))
            .ok_or_else(|| DecodeError::Resize("Failed to create result buffer".to_string()))
    }
}

impl ImageProcessor for StandardProcessor {
    fn extract_pixels(&self, content: &[u8]) -> Result<PixelBuffer, DecodeError> {
        let _guard = ResourceGovernor::acquire(self.limits);

        let image = decode_with_limits(content)?;
        let image = self.resize_on_demand(image)?;

        Ok(PixelBuffer::from_rgba_image(image))
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Image
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_images;
    use super::*;

    #[test]
    fn extracts_pixels_from_jpeg() {
        let content = test_images::solid_jpeg(300, 200, [40, 120, 200]);

        let buffer = StandardProcessor::new().extract_pixels(&content).unwrap();

        assert_eq!((buffer.width, buffer.height), (100, 67));
        assert_eq!(buffer.pixels.len(), 100 * 67 * 4);
        assert!(buffer.pixels.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn resizes_opaque_red_to_100_by_75() {
        let content = test_images::solid_png(200, 150, [255, 0, 0, 255]);

        let buffer = StandardProcessor::new().extract_pixels(&content).unwrap();

        assert_eq!((buffer.width, buffer.height), (100, 75));
        assert_eq!(buffer.pixels.len(), 100 * 75 * 4);
        assert!(buffer
            .pixels
            .chunks_exact(4)
            .all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn keeps_alpha_values_of_small_images() {
        let buffer = StandardProcessor::new()
            .extract_pixels(&test_images::alpha_quad_png())
            .unwrap();

        assert_eq!((buffer.width, buffer.height), (2, 2));
        assert_eq!(buffer.pixel(0, 0)[3], 255, "first pixel should be opaque");
        assert_eq!(buffer.pixel(1, 0)[3], 0, "second pixel should be transparent");
        assert_eq!(buffer.pixel(0, 1)[3], 126);
        assert_eq!(buffer.pixel(1, 1)[3], 190);
    }

    #[test]
    fn preserves_alpha_during_resize() {
        let buffer = StandardProcessor::new()
            .extract_pixels(&test_images::translucent_square_png())
            .unwrap();

        assert_eq!((buffer.width, buffer.height), (100, 100));
        assert_eq!(buffer.pixel(0, 0)[3], 0, "top-left should be transparent");
        assert_eq!(buffer.pixel(99, 0)[3], 0, "top-right should be transparent");

        let center = buffer.pixel(50, 50);
        assert_eq!(&center[..3], &[255, 0, 0], "center should be pure red");
        assert!(center[3] > 100 && center[3] < 150);
    }

    #[test]
    fn rejects_invalid_data() {
        let result = StandardProcessor::new().extract_pixels(b"not an image");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat)));
    }

    #[test]
    fn rejects_oversized_header_before_decoding() {
        let content = test_images::png_header_only(6000, 10);

        let result = StandardProcessor::new().extract_pixels(&content);

        assert!(matches!(
            result,
            Err(DecodeError::DimensionsTooLarge { width: 6000, .. })
        ));
    }

    #[test]
    fn rejects_pixel_count_over_ceiling() {
        let content = test_images::png_header_only(5000, 5001);
        assert!(matches!(
            StandardProcessor::new().extract_pixels(&content),
            Err(DecodeError::DimensionsTooLarge { .. })
        ));

        let content = test_images::png_header_only(40, 40);
        let processor = StandardProcessor::with_limits(ResourceLimits {
            max_pixels: 1000,
            ..ResourceLimits::default()
        });
        assert!(matches!(
            processor.extract_pixels(&content),
            Err(DecodeError::TooManyPixels { pixels: 1600, .. })
        ));
    }

    #[test]
    fn restores_limits_after_failure() {
        let _ = StandardProcessor::new().extract_pixels(b"garbage");
        assert!(!governor::is_governed());
    }

    #[test]
    fn decoding_is_deterministic() {
        let content = test_images::translucent_square_png();
        let processor = StandardProcessor::new();

        let first = processor.extract_pixels(&content).unwrap();
        let second = processor.extract_pixels(&content).unwrap();

        assert_eq!(first, second);
    }
}
