//! Folder exclusion matching for storage identifiers.
//!
//! Paths and patterns are trimmed of whitespace and surrounding `/`, then
//! compared on folder boundaries: `fileadmin/temp` covers
//! `fileadmin/temp/a.jpg` but not `fileadmin/temp_files/a.jpg`.

/// Returns true when `path` lies in (or is) one of the `patterns` folders.
///
/// Empty patterns are skipped. Matching is case-sensitive.
pub fn matches<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    let path = normalize(path);

    patterns
        .iter()
        .map(|pattern| normalize(pattern.as_ref()))
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| path == pattern || is_within(path, pattern))
}

fn normalize(value: &str) -> &str {
    value.trim().trim_matches('/')
}

/// `path/` starts with `pattern/`
fn is_within(path: &str, pattern: &str) -> bool {
    path.len() > pattern.len()
        && path.starts_with(pattern)
        && path.as_bytes()[pattern.len()] == b'/'
}

/// Excluded folder list taken from configuration
#[derive(Debug, Clone, Default)]
pub struct ExcludedFolders {
    patterns: Vec<String>,
}

impl ExcludedFolders {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Check if an identifier falls under an excluded folder
    pub fn is_excluded(&self, identifier: &str) -> bool {
        matches(identifier, &self.patterns)
    }
}
