//! # Configuration
//!
//! Loaded once per operation and treated as immutable while a pipeline runs.
//!
//! ```toml
//! auto_generate = true
//! allowed_mime_types = "image/jpeg,image/png,image/gif"
//! excluded_folders = "_processed_/,_temp_/"
//! image_processor = "auto"
//! ```
//!
//! List values are comma-separated strings, matching what a host
//! configuration form hands over; accessors split and trim them.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which image processor to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorChoice {
    /// Use whichever processor this build provides, preferring `fast`
    #[default]
    Auto,
    /// Pure `image` crate processor
    Image,
    /// zune-jpeg + fast_image_resize processor
    Fast,
}

impl FromStr for ProcessorChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(ProcessorChoice::Auto),
            "image" => Ok(ProcessorChoice::Image),
            "fast" => Ok(ProcessorChoice::Fast),
            other => Err(ConfigError::UnknownProcessor(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProcessorChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorChoice::Auto => write!(f, "auto"),
            ProcessorChoice::Image => write!(f, "image"),
            ProcessorChoice::Fast => write!(f, "fast"),
        }
    }
}

/// Placeholder generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Generate hashes automatically on file lifecycle signals
    pub auto_generate: bool,
    /// Comma-separated MIME types eligible for automatic generation
    pub allowed_mime_types: String,
    /// Comma-separated storage folders excluded from automatic generation
    pub excluded_folders: String,
    /// Processor selection
    pub image_processor: ProcessorChoice,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            auto_generate: true,
            allowed_mime_types: "image/jpeg,image/png,image/gif".to_string(),
            excluded_folders: "_processed_/,_temp_/".to_string(),
            image_processor: ProcessorChoice::Auto,
        }
    }
}

impl Configuration {
    /// Load from `path` if given and present, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load_from(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location (`<config dir>/thumbhash/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thumbhash")
            .join("config.toml")
    }

    pub fn is_auto_generate_enabled(&self) -> bool {
        self.auto_generate
    }

    /// Allowed MIME types, trimmed, empty entries dropped.
    pub fn allowed_mime_types(&self) -> Vec<String> {
        split_list(&self.allowed_mime_types)
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    /// Excluded folder patterns, trimmed.
    ///
    /// Empty entries are kept; the path matcher ignores them.
    pub fn excluded_folders(&self) -> Vec<String> {
        split_list(&self.excluded_folders).collect()
    }

    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types().iter().any(|allowed| allowed == mime_type)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',').map(|entry| entry.trim().to_string())
}
