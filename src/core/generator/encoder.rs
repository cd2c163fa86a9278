//! ThumbHash encoding of a pixel buffer.

use crate::core::processor::TARGET_SIZE;
use crate::error::EncodeError;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

/// Turns normalized RGBA pixels into a printable placeholder
pub trait HashEncoder: Send + Sync {
    fn encode(&self, width: u32, height: u32, pixels: &[u8]) -> Result<String, EncodeError>;
}

/// ThumbHash bytes in standard base64 without padding
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbHashEncoder;

impl HashEncoder for ThumbHashEncoder {
    fn encode(&self, width: u32, height: u32, pixels: &[u8]) -> Result<String, EncodeError> {
        if width == 0 || height == 0 || width > TARGET_SIZE || height > TARGET_SIZE {
            return Err(EncodeError::TooLarge { width, height });
        }

        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(EncodeError::BufferMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let hash = thumbhash::rgba_to_thumb_hash(width as usize, height as usize, pixels);
        Ok(STANDARD_NO_PAD.encode(hash))
    }
}
