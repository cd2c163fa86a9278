//! # Generator Module
//!
//! Single entry point from a file to a placeholder string.
//!
//! Size check, content read, pixel extraction and encoding each return a
//! typed [`GenerateError`]; [`ThumbHashGenerator::generate_from_file`]
//! logs that error and reports `None`. Placeholder generation is best
//! effort and never blocks the caller.

mod encoder;

pub use encoder::{HashEncoder, ThumbHashEncoder};

use crate::config::Configuration;
use crate::core::entity::FileResource;
use crate::core::processor::{ImageProcessor, ProcessorFactory, ProcessorKind};
use crate::error::{ConfigError, GenerateError};

/// Largest file accepted for generation (50MB)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Produces placeholders with one processor for its whole lifetime
pub struct ThumbHashGenerator {
    processor: Box<dyn ImageProcessor>,
    encoder: Box<dyn HashEncoder>,
    max_file_size: u64,
}

impl ThumbHashGenerator {
    pub fn new(processor: Box<dyn ImageProcessor>) -> Self {
        Self {
            processor,
            encoder: Box::new(ThumbHashEncoder),
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Generator using the processor named by `config`
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self::new(ProcessorFactory::create(config)?))
    }

    pub fn with_encoder(mut self, encoder: Box<dyn HashEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn processor_kind(&self) -> ProcessorKind {
        self.processor.kind()
    }

    /// Placeholder for `file`, or `None` when none can be produced
    pub fn generate_from_file<F: FileResource + ?Sized>(&self, file: &F) -> Option<String> {
        match self.try_generate(file) {
            Ok(hash) => Some(hash),
            Err(GenerateError::EmptyContent) => {
                tracing::debug!(identifier = file.identifier(), "file is empty, nothing to hash");
                None
            }
            Err(error) => {
                tracing::debug!(
                    identifier = file.identifier(),
                    uid = file.uid(),
                    %error,
                    "placeholder generation failed"
                );
                None
            }
        }
    }

    /// Placeholder for raw image bytes
    pub fn generate_from_content(&self, content: &[u8]) -> Result<String, GenerateError> {
        if content.is_empty() {
            return Err(GenerateError::EmptyContent);
        }

        let buffer = self.processor.extract_pixels(content)?;
        let hash = self
            .encoder
            .encode(buffer.width, buffer.height, &buffer.pixels)?;

        Ok(hash)
    }

    fn try_generate<F: FileResource + ?Sized>(&self, file: &F) -> Result<String, GenerateError> {
        self.validate_size(file)?;
        let content = file.contents()?;
        self.generate_from_content(&content)
    }

    fn validate_size<F: FileResource + ?Sized>(&self, file: &F) -> Result<(), GenerateError> {
        if let Some(size) = file.size()? {
            if size > 0 && size > self.max_file_size {
                return Err(GenerateError::FileTooLarge {
                    size,
                    max_size: self.max_file_size,
                });
            }
        }
        Ok(())
    }
}
