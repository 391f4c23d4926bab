use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::copy::DEFAULT_COPY_BUFFER_BYTES;
use crate::core::skip::{SkipFilter, DEFAULT_SKIP_KEYWORDS, DEFAULT_SKIP_PREFIXES};
use crate::error::MigrationError;
use crate::models::size::{GIB, MIB};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub safety_margin_bytes: u64,
    pub hard_cap_bytes: u64,
    pub min_free_bytes: u64,
    /// FAT32 cannot hold files of 4 GiB or more.
    pub per_file_ceiling_bytes: u64,
    pub max_files_per_source: usize,
    pub per_dir_file_cap: usize,
    /// Empty means every extension is allowed.
    pub allowed_extensions: Vec<String>,
    pub skip_prefixes: Vec<String>,
    pub skip_keywords: Vec<String>,
    /// Covers both symlinked directories and symlinked files; when off,
    /// neither is collected.
    pub follow_symlinks: bool,
    pub copy_buffer_bytes: usize,
    pub progress_every: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            safety_margin_bytes: 2 * GIB,
            hard_cap_bytes: 110 * GIB,
            min_free_bytes: 10 * GIB,
            per_file_ceiling_bytes: 4 * GIB - 1,
            max_files_per_source: 5000,
            per_dir_file_cap: 500,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|p| p.to_string()).collect(),
            skip_keywords: DEFAULT_SKIP_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            follow_symlinks: false,
            copy_buffer_bytes: DEFAULT_COPY_BUFFER_BYTES,
            progress_every: 50,
        }
    }
}

impl Settings {
    /// Load from a JSON file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| MigrationError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn skip_filter(&self) -> SkipFilter {
        SkipFilter::new(&self.skip_prefixes, &self.skip_keywords)
    }

    pub fn mib(value: u64) -> u64 {
        value * MIB
    }
}

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    // Documents
    ".txt", ".doc", ".docx", ".pdf", ".rtf", ".odt", ".xls", ".xlsx", ".csv", ".ppt", ".pptx",
    ".md", ".tex", ".epub", ".mobi",
    // Images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".svg", ".webp", ".psd", ".ai", ".eps",
    ".raw",
    // Video
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv",
    // Audio
    ".mp3", ".wav", ".flac", ".aac", ".m4a",
    // Archives
    ".zip", ".rar", ".7z", ".tar", ".gz",
    // Data
    ".json", ".xml", ".sql", ".db", ".sqlite",
    // Code
    ".py", ".java", ".cpp", ".c", ".html", ".css", ".js", ".php",
];
