//! Applies policy decisions: generate, then store.

use super::{Decision, LifecycleSignal, SkipReason, TriggerPolicy};
use crate::core::entity::FileResource;
use crate::core::generator::ThumbHashGenerator;
use crate::core::store::HashStore;
use crate::error::StoreError;
use std::sync::Arc;

/// What handling a signal did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A new placeholder was written
    Stored(String),
    /// The generated placeholder was already stored
    Unchanged(String),
    /// Generation ran but produced nothing
    NoHash,
    Skipped(SkipReason),
}

/// Reacts to lifecycle signals
pub struct FileProcessingHandler {
    policy: TriggerPolicy,
    generator: Arc<ThumbHashGenerator>,
    files: Arc<dyn HashStore>,
    processed_files: Arc<dyn HashStore>,
}

impl FileProcessingHandler {
    pub fn new(
        policy: TriggerPolicy,
        generator: Arc<ThumbHashGenerator>,
        files: Arc<dyn HashStore>,
        processed_files: Arc<dyn HashStore>,
    ) -> Self {
        Self {
            policy,
            generator,
            files,
            processed_files,
        }
    }

    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }

    /// Handle one signal.
    ///
    /// Generation failures are an outcome; only store failures are errors.
    pub fn handle(&self, signal: LifecycleSignal<'_>) -> Result<HandleOutcome, StoreError> {
        if let Decision::Skip(reason) = self.policy.decide(&signal) {
            tracing::debug!(signal = signal.name(), uid = signal.uid(), %reason, "signal skipped");
            return Ok(HandleOutcome::Skipped(reason));
        }

        match signal {
            LifecycleSignal::FileAdded(file)
            | LifecycleSignal::FileReplaced(file)
            | LifecycleSignal::FileContentsSet(file) => self.generate_and_store(file, &*self.files),
            LifecycleSignal::ProcessedFileCreated(file) => {
                self.generate_and_store(file, &*self.processed_files)
            }
        }
    }

    fn generate_and_store<F: FileResource + ?Sized>(
        &self,
        file: &F,
        store: &dyn HashStore,
    ) -> Result<HandleOutcome, StoreError> {
        let Some(hash) = self.generator.generate_from_file(file) else {
            return Ok(HandleOutcome::NoHash);
        };

        if store.store_hash(file.uid(), &hash)? {
            Ok(HandleOutcome::Stored(hash))
        } else {
            Ok(HandleOutcome::Unchanged(hash))
        }
    }
}
