//! # CLI Module
//!
//! Command-line interface for the placeholder pipeline.
//!
//! ## Usage
//! ```bash
//! # Placeholder for a single file, nothing stored
//! thumbhash hash photo.jpg --processor image
//!
//! # Register a storage folder, then backfill missing placeholders
//! thumbhash index ~/storage
//! thumbhash --root ~/storage generate --limit 500
//!
//! # Placeholder of one catalog entry (generated on demand)
//! thumbhash --root ~/storage show 2024/trip/beach.jpg
//!
//! # Keep placeholders current while files change
//! thumbhash --root ~/storage watch
//! ```

use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use thumbhash_pipeline::config::{Configuration, ProcessorChoice};
use thumbhash_pipeline::core::batch::{BatchGenerator, DEFAULT_LIMIT, DEFAULT_WORKERS};
use thumbhash_pipeline::core::entity::{read_file_bytes, FileResource, ProcessedResource};
use thumbhash_pipeline::core::generator::ThumbHashGenerator;
use thumbhash_pipeline::core::matcher::ExcludedFolders;
use thumbhash_pipeline::core::policy::{
    FileProcessingHandler, HandleOutcome, LifecycleSignal, TriggerPolicy,
};
use thumbhash_pipeline::core::repository::{FileRepository, Indexer};
use thumbhash_pipeline::core::resolver::ThumbHashResolver;
use thumbhash_pipeline::core::store::{Database, SqliteHashStore};
use thumbhash_pipeline::core::watcher::{ChangeDispatcher, FileChange, FolderWatcher, WatcherConfig};
use thumbhash_pipeline::error::{Result, StoreError};
use thumbhash_pipeline::events::{
    BatchEvent, BatchSummary, Event, EventChannel, IndexEvent, WatcherEvent,
};

/// ThumbHash placeholders for a storage folder
#[derive(Parser, Debug)]
#[command(name = "thumbhash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database [default: <root>/.thumbhash/catalog.db]
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Storage root [default: current directory]
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the placeholder of a file without touching the catalog
    Hash {
        file: PathBuf,

        /// Decoding backend: auto, image or fast
        #[arg(short, long)]
        processor: Option<ProcessorChoice>,
    },

    /// Register every file under ROOT in the catalog
    Index {
        #[arg(value_name = "ROOT")]
        folder: PathBuf,
    },

    /// Generate missing placeholders for catalog entries
    Generate {
        /// Maximum number of placeholders to generate
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Worker threads
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },

    /// Show the placeholder of a catalog file and its derivatives
    Show { identifier: String },

    /// Register a derivative of a catalog file
    Derive {
        /// Identifier of the original
        original: String,

        /// Identifier of the derivative
        #[arg(required_unless_present = "uses_original")]
        identifier: Option<String>,

        /// The derivative reuses the original file
        #[arg(long)]
        uses_original: bool,
    },

    /// Keep placeholders current while files are added or changed
    Watch,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    thumbhash_pipeline::init_tracing(if cli.verbose { "debug" } else { "warn" });

    let config = match &cli.config {
        Some(path) => Configuration::load_from(path)?,
        None => Configuration::load(Some(&Configuration::default_path()))?,
    };
    let term = Term::stderr();

    match &cli.command {
        Commands::Hash { file, processor } => run_hash(&term, config, file, *processor, cli.verbose),
        Commands::Index { folder } => {
            let catalog = Catalog::open(config, folder, cli.database.as_deref())?;
            run_index(&term, &catalog)
        }
        Commands::Generate { limit, workers } => {
            let catalog = Catalog::open(config, &storage_root(&cli), cli.database.as_deref())?;
            run_generate(&term, &catalog, *limit, *workers, cli.verbose)
        }
        Commands::Show { identifier } => {
            let catalog = Catalog::open(config, &storage_root(&cli), cli.database.as_deref())?;
            run_show(&catalog, identifier)
        }
        Commands::Derive {
            original,
            identifier,
            uses_original,
        } => {
            let catalog = Catalog::open(config, &storage_root(&cli), cli.database.as_deref())?;
            run_derive(&term, &catalog, original, identifier.as_deref(), *uses_original)
        }
        Commands::Watch => {
            let catalog = Catalog::open(config, &storage_root(&cli), cli.database.as_deref())?;
            run_watch(&term, catalog)
        }
    }
}

fn storage_root(cli: &Cli) -> PathBuf {
    cli.root.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Everything a catalog command needs, wired from one configuration
struct Catalog {
    config: Configuration,
    repository: Arc<FileRepository>,
    generator: Arc<ThumbHashGenerator>,
    files: Arc<SqliteHashStore>,
    processed_files: Arc<SqliteHashStore>,
}

impl Catalog {
    fn open(config: Configuration, root: &Path, database: Option<&Path>) -> Result<Self> {
        let db_path = database
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(".thumbhash").join("catalog.db"));
        let db = Database::open(&db_path)?;
        tracing::debug!(path = %db.path().display(), "catalog opened");

        let generator = Arc::new(ThumbHashGenerator::from_config(&config)?);

        Ok(Self {
            repository: Arc::new(FileRepository::new(Arc::clone(&db), root)),
            files: Arc::new(SqliteHashStore::file_metadata(Arc::clone(&db))),
            processed_files: Arc::new(SqliteHashStore::processed_files(db)),
            generator,
            config,
        })
    }

    fn handler(&self) -> FileProcessingHandler {
        FileProcessingHandler::new(
            TriggerPolicy::new(&self.config),
            Arc::clone(&self.generator),
            self.files.clone(),
            self.processed_files.clone(),
        )
    }

    fn resolver(&self) -> ThumbHashResolver {
        ThumbHashResolver::new(
            Arc::clone(&self.generator),
            self.files.clone(),
            self.processed_files.clone(),
        )
    }
}

fn run_hash(
    term: &Term,
    mut config: Configuration,
    file: &Path,
    processor: Option<ProcessorChoice>,
    verbose: bool,
) -> Result<()> {
    if let Some(processor) = processor {
        config.image_processor = processor;
    }
    let generator = ThumbHashGenerator::from_config(&config)?;
    let content = read_file_bytes(file)?;
    let hash = generator.generate_from_content(&content)?;

    if verbose {
        term.write_line(&format!(
            "{} {} ({} processor)",
            style("✓").green().bold(),
            file.display(),
            generator.processor_kind()
        ))
        .ok();
    }
    println!("{}", hash);
    Ok(())
}

fn run_index(term: &Term, catalog: &Catalog) -> Result<()> {
    let indexer = Indexer::new(Arc::clone(&catalog.repository))
        .with_excluded(ExcludedFolders::new(catalog.config.excluded_folders()));

    let (sender, receiver) = EventChannel::new();
    let spinner = ProgressBar::new_spinner();
    let spinner_clone = spinner.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Index(IndexEvent::FileIndexed { identifier }) => {
                    spinner_clone.inc(1);
                    spinner_clone.set_message(identifier);
                }
                Event::Index(IndexEvent::Completed { .. }) => spinner_clone.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = indexer.index(&sender);
    drop(sender);
    event_thread.join().ok();
    spinner.finish_and_clear();
    let result = result?;

    term.write_line(&format!(
        "{} {} files registered under {}",
        style("✓").green().bold(),
        style(result.files.len()).cyan(),
        catalog.repository.root().display()
    ))
    .ok();
    for error in &result.errors {
        term.write_line(&format!("  {} {}", style("!").yellow(), error)).ok();
    }
    Ok(())
}

fn run_generate(
    term: &Term,
    catalog: &Catalog,
    limit: usize,
    workers: usize,
    verbose: bool,
) -> Result<()> {
    let batch = BatchGenerator::new(
        Arc::clone(&catalog.repository),
        Arc::clone(&catalog.generator),
        catalog.files.clone(),
        catalog.processed_files.clone(),
        TriggerPolicy::new(&catalog.config),
    )
    .with_workers(workers);

    let (sender, receiver) = EventChannel::new();
    let progress = ProgressBar::new(0);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(bar_style.progress_chars("█▓░"));
    }
    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Batch(BatchEvent::Started { phase, total }) => {
                    progress_clone.set_prefix(phase.to_string());
                    progress_clone.set_length(total as u64);
                    progress_clone.set_position(0);
                }
                Event::Batch(BatchEvent::Progress(p)) => {
                    progress_clone.set_position(p.completed as u64);
                    if verbose {
                        progress_clone.set_message(p.current);
                    }
                }
                Event::Batch(BatchEvent::Completed { .. }) => progress_clone.finish_and_clear(),
                _ => {}
            }
        }
    });

    let summary = batch.run(limit, &sender);
    drop(sender);
    event_thread.join().ok();
    progress.finish_and_clear();

    print_summary(term, &summary?, verbose);
    Ok(())
}

fn print_summary(term: &Term, summary: &BatchSummary, verbose: bool) {
    term.write_line(&format!(
        "{} Generated {} placeholders in {:.1}s",
        style("✓").green().bold(),
        style(summary.total_generated()).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} originals, {} derivatives",
        style(summary.originals_generated).cyan(),
        style(summary.processed_generated).cyan()
    ))
    .ok();

    if summary.skipped > 0 {
        term.write_line(&format!("  {} skipped", style(summary.skipped).dim()))
            .ok();
    }
    if summary.failed > 0 {
        term.write_line(&format!("  {} failed", style(summary.failed).yellow()))
            .ok();
    }
    if verbose {
        for warning in &summary.warnings {
            term.write_line(&format!("  {} {}", style("!").yellow(), warning))
                .ok();
        }
    }
}

fn run_show(catalog: &Catalog, identifier: &str) -> Result<()> {
    let Some(file) = catalog.repository.find_file_by_identifier(identifier)? else {
        return Err(StoreError::QueryFailed(format!("{} is not in the catalog", identifier)).into());
    };

    let resolver = catalog.resolver();
    let mut derivatives = Vec::new();
    for processed in catalog.repository.processed_files_of(file.uid())? {
        let thumb_hash = resolver.resolve_processed_file(&processed)?;
        derivatives.push(serde_json::json!({
            "uid": processed.uid(),
            "identifier": processed.identifier(),
            "uses_original": processed.uses_original_file(),
            "thumb_hash": thumb_hash,
        }));
    }

    let output = serde_json::json!({
        "uid": file.uid(),
        "identifier": file.identifier(),
        "thumb_hash": resolver.resolve_file(&file)?,
        "processed_files": derivatives,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::warn!(error = %e, "could not render output"),
    }
    Ok(())
}

fn run_derive(
    term: &Term,
    catalog: &Catalog,
    original: &str,
    identifier: Option<&str>,
    uses_original: bool,
) -> Result<()> {
    let Some(file) = catalog.repository.find_file_by_identifier(original)? else {
        return Err(StoreError::QueryFailed(format!("{} is not in the catalog", original)).into());
    };

    let identifier = identifier.unwrap_or(file.identifier());
    let uid = catalog
        .repository
        .add_processed_file(file.uid(), identifier, uses_original)?;
    let processed = catalog
        .repository
        .find_processed_file(uid)?
        .ok_or(StoreError::NotFound {
            table: "processed_files",
            uid,
        })?;

    let outcome = catalog
        .handler()
        .handle(LifecycleSignal::ProcessedFileCreated(&processed))?;
    term.write_line(&format!(
        "{} derivative {} registered: {}",
        style("✓").green().bold(),
        style(uid).cyan(),
        describe(&outcome)
    ))
    .ok();
    Ok(())
}

fn run_watch(term: &Term, catalog: Catalog) -> Result<()> {
    let root = catalog.repository.root().to_path_buf();
    let dispatcher = ChangeDispatcher::new(Arc::clone(&catalog.repository), Arc::new(catalog.handler()));

    let (sender, receiver) = EventChannel::new();
    let change_sender = sender.clone();
    let mut watcher = FolderWatcher::new(
        WatcherConfig::default(),
        move |change| {
            let event = match change {
                FileChange::Added(path) => WatcherEvent::FileAdded { path },
                FileChange::Modified(path) => WatcherEvent::FileModified { path },
            };
            change_sender.send(Event::Watcher(event));
        },
        move |message| sender.send(Event::Watcher(WatcherEvent::Error { message })),
    )?;
    watcher.watch(&root)?;

    term.write_line(&format!(
        "{} Watching {} (Ctrl-C to stop)",
        style("●").green(),
        root.display()
    ))
    .ok();

    for event in receiver.iter() {
        let change = match event {
            Event::Watcher(WatcherEvent::FileAdded { path }) => FileChange::Added(path),
            Event::Watcher(WatcherEvent::FileModified { path }) => FileChange::Modified(path),
            Event::Watcher(WatcherEvent::Error { message }) => {
                term.write_line(&format!("  {} {}", style("!").yellow(), message))
                    .ok();
                continue;
            }
            _ => continue,
        };

        match dispatcher.dispatch(&change) {
            Ok(Some(outcome)) => {
                term.write_line(&format!(
                    "  {} {}",
                    change.path().strip_prefix(&root).unwrap_or(change.path()).display(),
                    describe(&outcome)
                ))
                .ok();
            }
            Ok(None) => {}
            Err(e) => {
                term.write_line(&format!("  {} {}", style("✗").red(), e)).ok();
            }
        }
    }

    Ok(())
}

fn describe(outcome: &HandleOutcome) -> String {
    match outcome {
        HandleOutcome::Stored(hash) => format!("{} {}", style("stored").green(), hash),
        HandleOutcome::Unchanged(hash) => format!("{} {}", style("unchanged").dim(), hash),
        HandleOutcome::NoHash => style("no placeholder").yellow().to_string(),
        HandleOutcome::Skipped(reason) => format!("{} ({})", style("skipped").dim(), reason),
    }
}
