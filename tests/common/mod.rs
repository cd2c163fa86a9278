//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use thumbhash_pipeline::config::Configuration;
use thumbhash_pipeline::core::generator::ThumbHashGenerator;
use thumbhash_pipeline::core::policy::{FileProcessingHandler, TriggerPolicy};
use thumbhash_pipeline::core::repository::FileRepository;
use thumbhash_pipeline::core::resolver::ThumbHashResolver;
use thumbhash_pipeline::core::store::{Database, SqliteHashStore};

/// A storage folder with its catalog on disk
pub struct Storage {
    pub dir: TempDir,
    pub config: Configuration,
    pub db: Arc<Database>,
    pub repository: Arc<FileRepository>,
    pub generator: Arc<ThumbHashGenerator>,
    pub files: Arc<SqliteHashStore>,
    pub processed_files: Arc<SqliteHashStore>,
}

impl Storage {
    pub fn new() -> Self {
        Self::with_config(Configuration::default())
    }

    pub fn with_config(config: Configuration) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join(".catalog").join("catalog.db")).unwrap();
        Self::assemble(dir, db, config)
    }

    /// Reopen the same catalog file, as a new process would
    pub fn reopen(self) -> Self {
        let Storage { dir, db, config, .. } = self;
        let path = db.path().to_path_buf();
        drop(db);
        let db = Database::open(&path).unwrap();
        Self::assemble(dir, db, config)
    }

    fn assemble(dir: TempDir, db: Arc<Database>, config: Configuration) -> Self {
        Self {
            repository: Arc::new(FileRepository::new(Arc::clone(&db), dir.path())),
            generator: Arc::new(ThumbHashGenerator::from_config(&config).unwrap()),
            files: Arc::new(SqliteHashStore::file_metadata(Arc::clone(&db))),
            processed_files: Arc::new(SqliteHashStore::processed_files(Arc::clone(&db))),
            dir,
            config,
            db,
        }
    }

    pub fn handler(&self) -> FileProcessingHandler {
        FileProcessingHandler::new(
            TriggerPolicy::new(&self.config),
            Arc::clone(&self.generator),
            self.files.clone(),
            self.processed_files.clone(),
        )
    }

    pub fn resolver(&self) -> ThumbHashResolver {
        ThumbHashResolver::new(
            Arc::clone(&self.generator),
            self.files.clone(),
            self.processed_files.clone(),
        )
    }

    /// Write `bytes` at `identifier` and register it as an original
    pub fn add(&self, identifier: &str, bytes: &[u8]) -> u64 {
        self.write(identifier, bytes);
        let mime_type = thumbhash_pipeline::core::entity::mime_type_for(Path::new(identifier));
        self.repository
            .add_file(identifier, &mime_type, Some(bytes.len() as u64))
            .unwrap()
    }

    pub fn write(&self, identifier: &str, bytes: &[u8]) {
        let path = self.dir.path().join(identifier);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }
}

pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, image::Rgba(color));
    encode(DynamicImage::ImageRgba8(image), ImageFormat::Png)
}

/// 32x24 reference image whose placeholder is [`REFERENCE_HASH`].
///
/// Red rises left to right, green top to bottom, blue follows `x * y` and
/// alpha fades toward the bottom-right corner. It is small enough to skip
/// resizing, so every processor sees the same pixels.
pub fn reference_png() -> Vec<u8> {
    let image = RgbaImage::from_fn(32, 24, |x, y| {
        let b = (x * y * 7) % 256;
        let a = 255 - x - y - 3 * ((x * y) % 7);
        image::Rgba([(x * 8) as u8, (y * 10) as u8, b as u8, a as u8])
    });
    encode(DynamicImage::ImageRgba8(image), ImageFormat::Png)
}

pub const REFERENCE_HASH: &str = "3QeKJJYNYHZwd3ZnBxqocI/4iNiHh4h4CA";

pub fn jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb(color));
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Jpeg)
}

pub fn gif(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, image::Rgba(color));
    encode(DynamicImage::ImageRgba8(image), ImageFormat::Gif)
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}
