//! Filesystem-backed entities rooted at a storage folder.

use super::bytes::{read_file_bytes, read_head};
use super::{FileBytes, FileResource, ProcessedResource};
use crate::error::ContentError;
use std::path::{Path, PathBuf};

/// Bytes needed to recognise every supported image signature
const SIGNATURE_LENGTH: usize = 32;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An original file stored under `root`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    uid: u64,
    root: PathBuf,
    identifier: String,
    mime_type: Option<String>,
}

impl LocalFile {
    pub fn new(uid: u64, root: impl Into<PathBuf>, identifier: impl Into<String>) -> Self {
        Self {
            uid,
            root: root.into(),
            identifier: normalize_identifier(&identifier.into()),
            mime_type: None,
        }
    }

    /// Use a known MIME type instead of deriving one from the extension
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Absolute location on disk
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.identifier)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileResource for LocalFile {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mime_type(&self) -> Result<String, ContentError> {
        if let Some(mime_type) = &self.mime_type {
            return Ok(mime_type.clone());
        }
        Ok(mime_type_for(&self.path()))
    }

    fn size(&self) -> Result<Option<u64>, ContentError> {
        file_size(&self.path())
    }

    fn contents(&self) -> Result<FileBytes, ContentError> {
        read_file_bytes(&self.path())
    }
}

/// A derivative of a [`LocalFile`].
///
/// When it reuses the original, all content reads go to the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalProcessedFile {
    uid: u64,
    original: LocalFile,
    identifier: String,
    uses_original: bool,
}

impl LocalProcessedFile {
    pub fn new(uid: u64, original: LocalFile, identifier: impl Into<String>) -> Self {
        Self {
            uid,
            original,
            identifier: normalize_identifier(&identifier.into()),
            uses_original: false,
        }
    }

    /// A derivative without pixels of its own
    pub fn using_original(uid: u64, original: LocalFile) -> Self {
        let identifier = original.identifier.clone();
        Self {
            uid,
            original,
            identifier,
            uses_original: true,
        }
    }

    pub fn original(&self) -> &LocalFile {
        &self.original
    }

    pub fn path(&self) -> PathBuf {
        if self.uses_original {
            self.original.path()
        } else {
            self.original.root.join(&self.identifier)
        }
    }
}

impl FileResource for LocalProcessedFile {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mime_type(&self) -> Result<String, ContentError> {
        if self.uses_original {
            return self.original.mime_type();
        }
        Ok(mime_type_for(&self.path()))
    }

    fn size(&self) -> Result<Option<u64>, ContentError> {
        file_size(&self.path())
    }

    fn contents(&self) -> Result<FileBytes, ContentError> {
        read_file_bytes(&self.path())
    }
}

impl ProcessedResource for LocalProcessedFile {
    fn original_uid(&self) -> u64 {
        self.original.uid
    }

    fn uses_original_file(&self) -> bool {
        self.uses_original
    }

    fn is_image(&self) -> Result<bool, ContentError> {
        let head = read_head(&self.path(), SIGNATURE_LENGTH)?;
        Ok(image::guess_format(&head).is_ok())
    }
}

fn file_size(path: &Path) -> Result<Option<u64>, ContentError> {
    std::fs::metadata(path)
        .map(|metadata| Some(metadata.len()))
        .map_err(|e| ContentError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// MIME type guessed from the file extension
pub fn mime_type_for(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME_TYPE.to_string())
}

/// Relative, `/` separated, no leading or trailing slash
fn normalize_identifier(identifier: &str) -> String {
    identifier
        .trim()
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}
