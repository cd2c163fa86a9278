//! # Batch Module
//!
//! Fills in missing placeholders across the catalog.
//!
//! ## Order
//! 1. Originals without a placeholder whose MIME type is allowed, skipping
//!    excluded folders
//! 2. Derivatives of image originals, with whatever budget the originals
//!    left, skipping derivatives that reuse the original
//!
//! Items run on a small rayon pool. A failing item becomes a warning and
//! the batch carries on.

use crate::core::entity::{FileResource, ProcessedResource};
use crate::core::generator::ThumbHashGenerator;
use crate::core::policy::TriggerPolicy;
use crate::core::repository::FileRepository;
use crate::core::store::HashStore;
use crate::error::StoreError;
use crate::events::{BatchEvent, BatchPhase, BatchProgress, BatchSummary, Event, EventSender};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Concurrent decodes during a batch
pub const DEFAULT_WORKERS: usize = 2;

/// Default number of placeholders per run
pub const DEFAULT_LIMIT: usize = 100;

/// Per-item result
enum ItemOutcome {
    Generated,
    Skipped,
    NoHash,
    Failed(String),
}

/// Running totals of one phase
#[derive(Default)]
struct PhaseTally {
    generated: usize,
    skipped: usize,
    failed: usize,
    warnings: Vec<String>,
}

/// Batch generation over the catalog
pub struct BatchGenerator {
    repository: Arc<FileRepository>,
    generator: Arc<ThumbHashGenerator>,
    files: Arc<dyn HashStore>,
    processed_files: Arc<dyn HashStore>,
    policy: TriggerPolicy,
    workers: usize,
}

impl BatchGenerator {
    pub fn new(
        repository: Arc<FileRepository>,
        generator: Arc<ThumbHashGenerator>,
        files: Arc<dyn HashStore>,
        processed_files: Arc<dyn HashStore>,
        policy: TriggerPolicy,
    ) -> Self {
        Self {
            repository,
            generator,
            files,
            processed_files,
            policy,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Number of concurrent decodes (at least 1)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Generate at most `limit` placeholders.
    ///
    /// Only catalog queries fail the run; everything per item is reported
    /// in the summary.
    pub fn run(&self, limit: usize, events: &EventSender) -> Result<BatchSummary, StoreError> {
        let start = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("thumbhash-batch-{}", i))
            .build();

        let (originals, processed) = match pool {
            Ok(pool) => pool.install(|| self.run_phases(limit, events))?,
            Err(error) => {
                tracing::warn!(%error, "batch pool unavailable, running on global pool");
                self.run_phases(limit, events)?
            }
        };

        let mut warnings = originals.warnings;
        warnings.extend(processed.warnings);

        let summary = BatchSummary {
            originals_generated: originals.generated,
            processed_generated: processed.generated,
            skipped: originals.skipped + processed.skipped,
            failed: originals.failed + processed.failed,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            generated = summary.total_generated(),
            skipped = summary.skipped,
            failed = summary.failed,
            "batch finished"
        );
        events.send(Event::Batch(BatchEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(summary)
    }

    fn run_phases(&self, limit: usize, events: &EventSender) -> Result<(PhaseTally, PhaseTally), StoreError> {
        let originals = self.process_originals(limit, events)?;
        let remaining = limit.saturating_sub(originals.generated);
        let processed = self.process_derivatives(remaining, events)?;
        Ok((originals, processed))
    }

    fn process_originals(&self, limit: usize, events: &EventSender) -> Result<PhaseTally, StoreError> {
        let candidates = self
            .repository
            .pending_files(self.policy.allowed_mime_types(), limit)?;

        Ok(self.process_phase(BatchPhase::Originals, &candidates, events, |file| {
            if self.policy.is_excluded(file.identifier()) {
                return ItemOutcome::Skipped;
            }
            store_generated(&self.generator, &*self.files, file)
        }))
    }

    fn process_derivatives(&self, limit: usize, events: &EventSender) -> Result<PhaseTally, StoreError> {
        if limit == 0 {
            return Ok(PhaseTally::default());
        }

        let candidates = self.repository.pending_processed_files(limit)?;

        Ok(self.process_phase(BatchPhase::Processed, &candidates, events, |file| {
            if file.uses_original_file() {
                return ItemOutcome::Skipped;
            }
            store_generated(&self.generator, &*self.processed_files, file)
        }))
    }

    fn process_phase<F, P>(
        &self,
        phase: BatchPhase,
        candidates: &[F],
        events: &EventSender,
        process: P,
    ) -> PhaseTally
    where
        F: FileResource,
        P: Fn(&F) -> ItemOutcome + Sync,
    {
        let total = candidates.len();
        events.send(Event::Batch(BatchEvent::Started { phase, total }));

        let completed = AtomicUsize::new(0);
        let tally = Mutex::new(PhaseTally::default());

        candidates.par_iter().for_each(|file| {
            let outcome = process(file);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

            events.send(Event::Batch(BatchEvent::Progress(BatchProgress {
                phase,
                completed: done,
                total,
                current: file.identifier().to_string(),
            })));

            let Ok(mut tally) = tally.lock() else {
                return;
            };
            match outcome {
                ItemOutcome::Generated => {
                    tally.generated += 1;
                    events.send(Event::Batch(BatchEvent::Generated {
                        phase,
                        identifier: file.identifier().to_string(),
                    }));
                }
                ItemOutcome::Skipped => tally.skipped += 1,
                ItemOutcome::NoHash => tally.failed += 1,
                ItemOutcome::Failed(message) => {
                    tracing::warn!(uid = file.uid(), %message, "batch item failed");
                    events.send(Event::Batch(BatchEvent::Warning {
                        phase,
                        uid: file.uid(),
                        message: message.clone(),
                    }));
                    tally.failed += 1;
                    tally.warnings.push(format!("Failed to process {} {}: {}", phase, file.uid(), message));
                }
            }
        });

        tally.into_inner().unwrap_or_default()
    }
}

fn store_generated<F: FileResource + ?Sized>(
    generator: &ThumbHashGenerator,
    store: &dyn HashStore,
    file: &F,
) -> ItemOutcome {
    let Some(hash) = generator.generate_from_file(file) else {
        return ItemOutcome::NoHash;
    };

    match store.store_hash(file.uid(), &hash) {
        Ok(_) => ItemOutcome::Generated,
        Err(error) => ItemOutcome::Failed(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::core::processor::{ImageProcessor, PixelBuffer, ProcessorKind};
    use crate::core::store::{Database, SqliteHashStore};
    use crate::error::DecodeError;
    use crate::events::{null_sender, EventChannel};
    use std::fs;
    use tempfile::TempDir;

    /// Decodes anything except content starting with `!`
    struct StubProcessor;

    impl ImageProcessor for StubProcessor {
        fn extract_pixels(&self, content: &[u8]) -> Result<PixelBuffer, DecodeError> {
            if content.starts_with(b"!") {
                return Err(DecodeError::UnsupportedFormat);
            }
            PixelBuffer::new(1, 1, vec![content[0], 0, 0, 255])
        }

        fn kind(&self) -> ProcessorKind {
            ProcessorKind::Image
        }
    }

    struct Fixture {
        _dir: TempDir,
        repository: Arc<FileRepository>,
        files: Arc<SqliteHashStore>,
        processed: Arc<SqliteHashStore>,
        batch: BatchGenerator,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let repository = Arc::new(FileRepository::new(Arc::clone(&db), dir.path()));
        let files = Arc::new(SqliteHashStore::file_metadata(Arc::clone(&db)));
        let processed = Arc::new(SqliteHashStore::processed_files(db));
        let batch = BatchGenerator::new(
            Arc::clone(&repository),
            Arc::new(ThumbHashGenerator::new(Box::new(StubProcessor))),
            files.clone(),
            processed.clone(),
            TriggerPolicy::new(&Configuration::default()),
        );
        Fixture {
            _dir: dir,
            repository,
            files,
            processed,
            batch,
        }
    }

    impl Fixture {
        fn add(&self, identifier: &str, mime_type: &str, contents: &[u8]) -> u64 {
            let path = self.repository.root().join(identifier);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            self.repository
                .add_file(identifier, mime_type, Some(contents.len() as u64))
                .unwrap()
        }

        fn add_processed(&self, original: u64, identifier: &str, contents: &[u8]) -> u64 {
            let path = self.repository.root().join(identifier);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            self.repository
                .add_processed_file(original, identifier, false)
                .unwrap()
        }
    }

    #[test]
    fn generates_for_pending_originals_and_derivatives() {
        let f = fixture();
        let a = f.add("photos/a.png", "image/png", b"a");
        let b = f.add("photos/b.jpg", "image/jpeg", b"b");
        let p = f.add_processed(a, "_processed_/a_50.png", b"p");

        let summary = f.batch.run(DEFAULT_LIMIT, &null_sender()).unwrap();

        assert_eq!(summary.originals_generated, 2);
        assert_eq!(summary.processed_generated, 1);
        assert!(f.files.get_hash(a).unwrap().is_some());
        assert!(f.files.get_hash(b).unwrap().is_some());
        assert!(f.processed.get_hash(p).unwrap().is_some());
    }

    #[test]
    fn skips_disallowed_mime_and_excluded_folders() {
        let f = fixture();
        let pdf = f.add("docs/a.pdf", "application/pdf", b"a");
        let temp = f.add("_temp_/b.png", "image/png", b"b");

        let summary = f.batch.run(DEFAULT_LIMIT, &null_sender()).unwrap();

        assert_eq!(summary.total_generated(), 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(f.files.get_hash(pdf).unwrap(), None);
        assert_eq!(f.files.get_hash(temp).unwrap(), None);
    }

    #[test]
    fn derivatives_get_the_remaining_budget() {
        let f = fixture();
        let a = f.add("a.png", "image/png", b"a");
        f.add("b.png", "image/png", b"b");
        f.add_processed(a, "_processed_/a1.png", b"1");
        f.add_processed(a, "_processed_/a2.png", b"2");

        let summary = f.batch.run(3, &null_sender()).unwrap();

        assert_eq!(summary.originals_generated, 2);
        assert_eq!(summary.processed_generated, 1);
    }

    #[test]
    fn derivatives_using_original_are_skipped() {
        let f = fixture();
        let a = f.add("a.png", "image/png", b"a");
        let verbatim = f.repository.add_processed_file(a, "", true).unwrap();

        let summary = f.batch.run(DEFAULT_LIMIT, &null_sender()).unwrap();

        assert_eq!(summary.processed_generated, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(f.processed.get_hash(verbatim).unwrap(), None);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let f = fixture();
        let broken = f.add("a.png", "image/png", b"!broken");
        let good = f.add("b.png", "image/png", b"b");
        let missing = f.repository.add_file("gone.png", "image/png", None).unwrap();

        let summary = f.batch.with_workers(1).run(DEFAULT_LIMIT, &null_sender()).unwrap();

        assert_eq!(summary.originals_generated, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(f.files.get_hash(broken).unwrap(), None);
        assert_eq!(f.files.get_hash(missing).unwrap(), None);
        assert!(f.files.get_hash(good).unwrap().is_some());
    }

    #[test]
    fn second_run_finds_nothing() {
        let f = fixture();
        f.add("a.png", "image/png", b"a");

        f.batch.run(DEFAULT_LIMIT, &null_sender()).unwrap();
        let summary = f.batch.run(DEFAULT_LIMIT, &null_sender()).unwrap();

        assert_eq!(summary.total_generated(), 0);
    }

    #[test]
    fn reports_progress_events() {
        let f = fixture();
        f.add("a.png", "image/png", b"a");
        let (sender, receiver) = EventChannel::new();

        f.batch.run(DEFAULT_LIMIT, &sender).unwrap();
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Batch(BatchEvent::Generated { phase: BatchPhase::Originals, .. }))));
        assert!(matches!(
            events.last(),
            Some(Event::Batch(BatchEvent::Completed { summary })) if summary.originals_generated == 1
        ));
    }
}
