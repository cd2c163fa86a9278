//! zune-jpeg + fast_image_resize processor.

use super::fast_decode::FastDecoder;
use super::fast_resize::FastResizer;
use super::governor::{ResourceGovernor, ResourceLimits};
use super::{target_dimensions, ImageProcessor, PixelBuffer, ProcessorKind};
use crate::error::DecodeError;

/// SIMD-accelerated processor
#[derive(Debug, Clone, Default)]
pub struct FastProcessor {
    limits: ResourceLimits,
}

impl FastProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self { limits }
    }
}

impl ImageProcessor for FastProcessor {
    fn extract_pixels(&self, content: &[u8]) -> Result<PixelBuffer, DecodeError> {
        let _guard = ResourceGovernor::acquire(self.limits);

        let image = FastDecoder::decode(content)?;
        let (width, height) = image.dimensions();
        let (new_width, new_height) = target_dimensions(width, height);

        let image = if (new_width, new_height) == (width, height) {
            image
        } else {
            // Resizer state is cheap; one per call keeps the processor Sync
            FastResizer::new().resize_rgba(image, new_width, new_height)?
        };

        Ok(PixelBuffer::from_rgba_image(image))
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Fast
    }
}
