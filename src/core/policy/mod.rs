//! # Policy Module
//!
//! Decides whether a lifecycle signal should produce a placeholder.
//!
//! ## Originals (added, replaced, contents set)
//! Auto generation enabled, MIME type allowed and identifier outside every
//! excluded folder. A passing file is always regenerated, since its
//! contents changed and any stored hash is stale.
//!
//! ## Derivatives
//! Skipped when they reuse the original or are not raster images. No
//! configuration gate applies.

mod handler;

pub use handler::{FileProcessingHandler, HandleOutcome};

use crate::config::Configuration;
use crate::core::entity::{FileResource, ProcessedResource};
use crate::core::matcher::ExcludedFolders;
use std::fmt;

/// Something happened to a file
#[derive(Clone, Copy)]
pub enum LifecycleSignal<'a> {
    FileAdded(&'a dyn FileResource),
    FileReplaced(&'a dyn FileResource),
    FileContentsSet(&'a dyn FileResource),
    ProcessedFileCreated(&'a dyn ProcessedResource),
}

impl<'a> LifecycleSignal<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleSignal::FileAdded(_) => "file_added",
            LifecycleSignal::FileReplaced(_) => "file_replaced",
            LifecycleSignal::FileContentsSet(_) => "file_contents_set",
            LifecycleSignal::ProcessedFileCreated(_) => "processed_file_created",
        }
    }

    pub fn uid(&self) -> u64 {
        match self {
            LifecycleSignal::FileAdded(file)
            | LifecycleSignal::FileReplaced(file)
            | LifecycleSignal::FileContentsSet(file) => file.uid(),
            LifecycleSignal::ProcessedFileCreated(file) => file.uid(),
        }
    }
}

impl fmt::Debug for LifecycleSignal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSignal")
            .field("kind", &self.name())
            .field("uid", &self.uid())
            .finish()
    }
}

/// Why a signal produced no work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AutoGenerateDisabled,
    MimeTypeNotAllowed(String),
    MimeTypeUnavailable,
    ExcludedFolder,
    UsesOriginalFile,
    NotAnImage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AutoGenerateDisabled => f.write_str("auto generation disabled"),
            SkipReason::MimeTypeNotAllowed(mime) => write!(f, "MIME type {} not allowed", mime),
            SkipReason::MimeTypeUnavailable => f.write_str("MIME type unavailable"),
            SkipReason::ExcludedFolder => f.write_str("in excluded folder"),
            SkipReason::UsesOriginalFile => f.write_str("uses original file"),
            SkipReason::NotAnImage => f.write_str("not an image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Generate,
    Skip(SkipReason),
}

impl Decision {
    pub fn should_generate(&self) -> bool {
        matches!(self, Decision::Generate)
    }
}

/// Pure decisions over a fixed configuration
#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    auto_generate: bool,
    allowed_mime_types: Vec<String>,
    excluded: ExcludedFolders,
}

impl TriggerPolicy {
    pub fn new(config: &Configuration) -> Self {
        Self {
            auto_generate: config.is_auto_generate_enabled(),
            allowed_mime_types: config.allowed_mime_types(),
            excluded: ExcludedFolders::new(config.excluded_folders()),
        }
    }

    pub fn decide(&self, signal: &LifecycleSignal<'_>) -> Decision {
        match signal {
            LifecycleSignal::FileAdded(file)
            | LifecycleSignal::FileReplaced(file)
            | LifecycleSignal::FileContentsSet(file) => self.decide_file(*file),
            LifecycleSignal::ProcessedFileCreated(file) => self.decide_processed(*file),
        }
    }

    /// Gate for originals
    pub fn decide_file(&self, file: &dyn FileResource) -> Decision {
        if !self.auto_generate {
            return Decision::Skip(SkipReason::AutoGenerateDisabled);
        }

        let mime_type = match file.mime_type() {
            Ok(mime_type) => mime_type,
            Err(error) => {
                tracing::debug!(identifier = file.identifier(), %error, "MIME type lookup failed");
                return Decision::Skip(SkipReason::MimeTypeUnavailable);
            }
        };
        if !self.is_mime_type_allowed(&mime_type) {
            return Decision::Skip(SkipReason::MimeTypeNotAllowed(mime_type));
        }

        if self.excluded.is_excluded(file.identifier()) {
            return Decision::Skip(SkipReason::ExcludedFolder);
        }

        Decision::Generate
    }

    /// Gate for derivatives.
    ///
    /// A failing image check counts as "not an image".
    pub fn decide_processed(&self, file: &dyn ProcessedResource) -> Decision {
        if file.uses_original_file() {
            return Decision::Skip(SkipReason::UsesOriginalFile);
        }

        match file.is_image() {
            Ok(true) => Decision::Generate,
            Ok(false) => Decision::Skip(SkipReason::NotAnImage),
            Err(error) => {
                tracing::debug!(identifier = file.identifier(), %error, "image check failed");
                Decision::Skip(SkipReason::NotAnImage)
            }
        }
    }

    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|allowed| allowed == mime_type)
    }

    pub fn allowed_mime_types(&self) -> &[String] {
        &self.allowed_mime_types
    }

    pub fn is_excluded(&self, identifier: &str) -> bool {
        self.excluded.is_excluded(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::testing::{MemoryFile, MemoryProcessedFile};

    fn policy(config: Configuration) -> TriggerPolicy {
        TriggerPolicy::new(&config)
    }

    fn jpeg(identifier: &str) -> MemoryFile {
        MemoryFile::new(1, identifier, vec![1]).with_mime_type(Some("image/jpeg"))
    }

    #[test]
    fn allowed_file_is_generated_for_every_original_signal() {
        let policy = policy(Configuration::default());
        let file = jpeg("photos/a.jpg");

        for signal in [
            LifecycleSignal::FileAdded(&file),
            LifecycleSignal::FileReplaced(&file),
            LifecycleSignal::FileContentsSet(&file),
        ] {
            assert_eq!(policy.decide(&signal), Decision::Generate, "{:?}", signal);
        }
    }

    #[test]
    fn disabled_auto_generation_skips_everything_original() {
        let policy = policy(Configuration {
            auto_generate: false,
            ..Configuration::default()
        });

        assert_eq!(
            policy.decide_file(&jpeg("photos/a.jpg")),
            Decision::Skip(SkipReason::AutoGenerateDisabled)
        );
    }

    #[test]
    fn disallowed_mime_type_is_skipped() {
        let policy = policy(Configuration::default());
        let pdf = MemoryFile::new(1, "docs/a.pdf", vec![1]).with_mime_type(Some("application/pdf"));

        assert_eq!(
            policy.decide_file(&pdf),
            Decision::Skip(SkipReason::MimeTypeNotAllowed("application/pdf".to_string()))
        );
    }

    #[test]
    fn mime_lookup_failure_is_skipped() {
        let policy = policy(Configuration::default());
        let file = MemoryFile::new(1, "photos/a.jpg", vec![1]).with_mime_type(None);

        assert_eq!(
            policy.decide_file(&file),
            Decision::Skip(SkipReason::MimeTypeUnavailable)
        );
    }

    #[test]
    fn excluded_folder_is_skipped() {
        let policy = policy(Configuration {
            excluded_folders: "fileadmin/temp, _processed_/".to_string(),
            ..Configuration::default()
        });

        assert_eq!(
            policy.decide_file(&jpeg("fileadmin/temp/a.jpg")),
            Decision::Skip(SkipReason::ExcludedFolder)
        );
        assert_eq!(policy.decide_file(&jpeg("fileadmin/temp_files/a.jpg")), Decision::Generate);
    }

    #[test]
    fn derivative_using_original_is_skipped() {
        let policy = policy(Configuration::default());
        let processed = MemoryProcessedFile::new(jpeg("_processed_/a.jpg")).using_original();

        assert_eq!(
            policy.decide(&LifecycleSignal::ProcessedFileCreated(&processed)),
            Decision::Skip(SkipReason::UsesOriginalFile)
        );
    }

    #[test]
    fn derivative_image_check() {
        let policy = policy(Configuration::default());

        let image = MemoryProcessedFile::new(jpeg("_processed_/a.jpg"));
        let not_image = MemoryProcessedFile::new(jpeg("_processed_/a.txt")).with_is_image(Some(false));
        let failing = MemoryProcessedFile::new(jpeg("_processed_/a.bin")).with_is_image(None);

        assert_eq!(policy.decide_processed(&image), Decision::Generate);
        assert_eq!(
            policy.decide_processed(&not_image),
            Decision::Skip(SkipReason::NotAnImage)
        );
        assert_eq!(
            policy.decide_processed(&failing),
            Decision::Skip(SkipReason::NotAnImage)
        );
    }

    #[test]
    fn derivatives_ignore_configuration_gates() {
        let policy = policy(Configuration {
            auto_generate: false,
            allowed_mime_types: String::new(),
            ..Configuration::default()
        });
        // Lives in an excluded folder with a disallowed type
        let processed = MemoryProcessedFile::new(
            MemoryFile::new(2, "_processed_/a.webp", vec![1]).with_mime_type(Some("image/webp")),
        );

        assert_eq!(policy.decide_processed(&processed), Decision::Generate);
    }
}
