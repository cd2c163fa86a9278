//! # Resolver Module
//!
//! On-demand lookup for rendering: stored placeholder first, otherwise
//! generate, store and return it. No configuration gate applies since
//! the caller asked explicitly.

use crate::core::entity::{FileResource, ProcessedResource};
use crate::core::generator::ThumbHashGenerator;
use crate::core::store::HashStore;
use crate::error::StoreError;
use std::sync::Arc;

/// Anything a template may ask a placeholder for
#[derive(Clone, Copy)]
pub enum FileReference<'a> {
    File(&'a dyn FileResource),
    /// A usage of an original; resolves through the original
    Usage { original: &'a dyn FileResource },
    Processed(&'a dyn ProcessedResource),
}

/// Read-through placeholder lookup
pub struct ThumbHashResolver {
    generator: Arc<ThumbHashGenerator>,
    files: Arc<dyn HashStore>,
    processed_files: Arc<dyn HashStore>,
}

impl ThumbHashResolver {
    pub fn new(
        generator: Arc<ThumbHashGenerator>,
        files: Arc<dyn HashStore>,
        processed_files: Arc<dyn HashStore>,
    ) -> Self {
        Self {
            generator,
            files,
            processed_files,
        }
    }

    /// Placeholder for any reference, `""` when none can be produced
    pub fn resolve(&self, reference: FileReference<'_>) -> Result<String, StoreError> {
        match reference {
            FileReference::File(file) | FileReference::Usage { original: file } => {
                self.resolve_file(file)
            }
            FileReference::Processed(file) => self.resolve_processed_file(file),
        }
    }

    pub fn resolve_file(&self, file: &dyn FileResource) -> Result<String, StoreError> {
        resolve_with(&self.generator, &*self.files, file)
    }

    pub fn resolve_processed_file(&self, file: &dyn ProcessedResource) -> Result<String, StoreError> {
        resolve_with(&self.generator, &*self.processed_files, file)
    }
}

fn resolve_with<F: FileResource + ?Sized>(
    generator: &ThumbHashGenerator,
    store: &dyn HashStore,
    file: &F,
) -> Result<String, StoreError> {
    if let Some(hash) = store.get_hash(file.uid())? {
        return Ok(hash);
    }

    match generator.generate_from_file(file) {
        Some(hash) => {
            store.store_hash(file.uid(), &hash)?;
            Ok(hash)
        }
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::testing::{MemoryFile, MemoryProcessedFile};
    use crate::core::processor::{ImageProcessor, PixelBuffer, ProcessorKind};
    use crate::core::store::{HashTable, InMemoryHashStore};
    use crate::error::DecodeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProcessor(Arc<AtomicUsize>);

    impl ImageProcessor for CountingProcessor {
        fn extract_pixels(&self, _content: &[u8]) -> Result<PixelBuffer, DecodeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            PixelBuffer::new(1, 1, vec![200, 100, 0, 255])
        }

        fn kind(&self) -> ProcessorKind {
            ProcessorKind::Fast
        }
    }

    fn resolver() -> (ThumbHashResolver, Arc<AtomicUsize>, Arc<InMemoryHashStore>, Arc<InMemoryHashStore>) {
        let decodes = Arc::new(AtomicUsize::new(0));
        let generator = ThumbHashGenerator::new(Box::new(CountingProcessor(Arc::clone(&decodes))));
        let files = Arc::new(InMemoryHashStore::new(HashTable::FileMetadata));
        let processed = Arc::new(InMemoryHashStore::new(HashTable::ProcessedFile));
        let resolver = ThumbHashResolver::new(Arc::new(generator), files.clone(), processed.clone());
        (resolver, decodes, files, processed)
    }

    #[test]
    fn stored_hash_is_returned_without_decoding() {
        let (resolver, decodes, files, _) = resolver();
        files.insert(1, "stored").unwrap();
        let file = MemoryFile::new(1, "a.png", vec![1]);

        assert_eq!(resolver.resolve(FileReference::File(&file)).unwrap(), "stored");
        assert_eq!(decodes.load(Ordering::SeqCst), 0);
        assert_eq!(file.reads(), 0);
    }

    #[test]
    fn missing_hash_is_generated_and_stored_once() {
        let (resolver, decodes, files, _) = resolver();
        let file = MemoryFile::new(1, "a.png", vec![1]);

        let first = resolver.resolve_file(&file).unwrap();
        let second = resolver.resolve_file(&file).unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert_eq!(files.writes(), 1);
    }

    #[test]
    fn usage_resolves_through_original() {
        let (resolver, _, files, _) = resolver();
        files.insert(7, "original-hash").unwrap();
        let original = MemoryFile::new(7, "a.png", vec![1]);

        let hash = resolver
            .resolve(FileReference::Usage { original: &original })
            .unwrap();

        assert_eq!(hash, "original-hash");
    }

    #[test]
    fn processed_files_use_their_own_store() {
        let (resolver, _, files, processed) = resolver();
        let derivative = MemoryProcessedFile::new(MemoryFile::new(20, "_processed_/a.png", vec![1]));

        let hash = resolver.resolve(FileReference::Processed(&derivative)).unwrap();

        assert!(!hash.is_empty());
        assert_eq!(processed.get_hash(20).unwrap(), Some(hash));
        assert_eq!(files.writes(), 0);
    }

    #[test]
    fn ungated_by_configuration() {
        // Excluded folder, odd MIME type: still resolved
        let (resolver, _, _, _) = resolver();
        let file = MemoryFile::new(3, "_temp_/a.bin", vec![1]).with_mime_type(Some("application/x-foo"));

        assert!(!resolver.resolve_file(&file).unwrap().is_empty());
    }

    #[test]
    fn failure_resolves_to_empty_string() {
        let (resolver, _, files, _) = resolver();
        let file = MemoryFile::new(1, "a.png", vec![1]).unreadable();

        assert_eq!(resolver.resolve_file(&file).unwrap(), "");
        assert_eq!(files.writes(), 0);
    }
}
