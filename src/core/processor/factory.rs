//! Processor selection.

use super::ImageProcessor;
use crate::config::{Configuration, ProcessorChoice};
use crate::error::ConfigError;
use std::fmt;

/// Concrete decoding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorKind {
    /// Plain `image` crate
    Image,
    /// zune-jpeg + fast_image_resize
    Fast,
}

impl ProcessorKind {
    /// Whether this backend was compiled in
    pub fn is_available(self) -> bool {
        match self {
            ProcessorKind::Image => cfg!(feature = "image-processor"),
            ProcessorKind::Fast => cfg!(feature = "fast-processor"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessorKind::Image => "image",
            ProcessorKind::Fast => "fast",
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the configured [`ImageProcessor`]
pub struct ProcessorFactory;

impl ProcessorFactory {
    /// Backends available in this build, preferred first
    pub fn available() -> Vec<ProcessorKind> {
        [ProcessorKind::Fast, ProcessorKind::Image]
            .into_iter()
            .filter(|kind| kind.is_available())
            .collect()
    }

    /// Resolve a choice to a concrete backend.
    ///
    /// `auto` takes the fast backend when present. A pinned backend that
    /// is not compiled in is a configuration error, never a silent switch.
    pub fn resolve(choice: ProcessorChoice) -> Result<ProcessorKind, ConfigError> {
        let kind = match choice {
            ProcessorChoice::Auto => {
                return Self::available()
                    .into_iter()
                    .next()
                    .ok_or_else(|| ConfigError::ProcessorUnavailable(choice.to_string()));
            }
            ProcessorChoice::Image => ProcessorKind::Image,
            ProcessorChoice::Fast => ProcessorKind::Fast,
        };

        if !kind.is_available() {
            return Err(ConfigError::ProcessorUnavailable(kind.to_string()));
        }
        Ok(kind)
    }

    /// Create the processor named by the configuration
    pub fn create(config: &Configuration) -> Result<Box<dyn ImageProcessor>, ConfigError> {
        let kind = Self::resolve(config.image_processor)?;
        tracing::info!(processor = %kind, "image processor selected");
        Self::create_kind(kind)
    }

    /// Create a specific backend
    pub fn create_kind(kind: ProcessorKind) -> Result<Box<dyn ImageProcessor>, ConfigError> {
        match kind {
            #[cfg(feature = "image-processor")]
            ProcessorKind::Image => Ok(Box::new(super::StandardProcessor::new())),
            #[cfg(feature = "fast-processor")]
            ProcessorKind::Fast => Ok(Box::new(super::FastProcessor::new())),
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::ProcessorUnavailable(other.to_string())),
        }
    }
}
