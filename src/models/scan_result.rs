use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Candidate files collected from one source root, in visitation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub source_label: CompactString,
    pub files: Vec<PathBuf>,
    /// Sum of sizes observed at scan time. Advisory only.
    pub total_bytes_estimate: u64,
    pub dirs_visited: usize,
    pub dirs_pruned: usize,
    /// Files dropped because they exceeded the per-file ceiling.
    pub oversized: usize,
    /// True when `max_files` stopped the walk early.
    pub truncated: bool,
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    pub fn empty(source_label: impl Into<CompactString>) -> Self {
        Self {
            source_label: source_label.into(),
            files: Vec::new(),
            total_bytes_estimate: 0,
            dirs_visited: 0,
            dirs_pruned: 0,
            oversized: 0,
            truncated: false,
            errors: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub error_type: ScanErrorType,
    pub message: String,
}

impl ScanError {
    pub fn from_io(path: PathBuf, err: &std::io::Error) -> Self {
        let error_type = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanErrorType::PermissionDenied,
            std::io::ErrorKind::NotFound => ScanErrorType::NotFound,
            _ => ScanErrorType::IoError,
        };
        Self {
            path,
            error_type,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanErrorType {
    PermissionDenied,
    NotFound,
    SymlinkCycle,
    IoError,
}
