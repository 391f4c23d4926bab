use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::outcome::{CopyOutcome, CopyReason};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStatus {
    /// Every candidate was attempted.
    Completed,
    /// Scan succeeded but yielded no candidates.
    NoFiles,
    /// The quota was reached while copying this source.
    QuotaReached,
    /// The scan root could not be read.
    ScanFailed(String),
    /// The run halted on quota before this source was started.
    NotAttempted,
    /// The label cannot name a directory under the destination.
    InvalidLabel,
}

impl SourceStatus {
    pub fn describe(&self) -> String {
        match self {
            Self::Completed => "completed".to_string(),
            Self::NoFiles => "no files".to_string(),
            Self::QuotaReached => "quota reached".to_string(),
            Self::ScanFailed(msg) => format!("scan failed: {msg}"),
            Self::NotAttempted => "not attempted".to_string(),
            Self::InvalidLabel => "invalid label".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    pub label: CompactString,
    pub root: PathBuf,
    pub candidates: usize,
    pub estimate_bytes: u64,
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub rejected_too_large: usize,
    pub rejected_no_space: usize,
    pub missing: usize,
    pub io_errors: usize,
    pub scan_errors: usize,
    pub status: SourceStatus,
}

impl SourceResult {
    pub fn new(label: CompactString, root: PathBuf, status: SourceStatus) -> Self {
        Self {
            label,
            root,
            candidates: 0,
            estimate_bytes: 0,
            files_copied: 0,
            bytes_copied: 0,
            rejected_too_large: 0,
            rejected_no_space: 0,
            missing: 0,
            io_errors: 0,
            scan_errors: 0,
            status,
        }
    }

    pub fn record(&mut self, outcome: &CopyOutcome) {
        match outcome.reason {
            CopyReason::Ok => {
                self.files_copied += 1;
                self.bytes_copied += outcome.size_bytes;
            }
            CopyReason::NoSpace => self.rejected_no_space += 1,
            CopyReason::TooLarge => self.rejected_too_large += 1,
            CopyReason::SourceMissing => self.missing += 1,
            CopyReason::IoError => self.io_errors += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.missing + self.io_errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Completed,
    HaltedQuota,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub destination: PathBuf,
    pub started_at: DateTime<Local>,
    pub per_source: Vec<SourceResult>,
    pub total_files: usize,
    pub total_bytes: u64,
    pub budget_bytes: u64,
    pub used_bytes: u64,
    pub elapsed: Duration,
    pub state: RunState,
}

impl RunSummary {
    pub fn total_failures(&self) -> usize {
        self.per_source.iter().map(SourceResult::failures).sum()
    }

    pub fn total_rejections(&self) -> usize {
        self.per_source
            .iter()
            .map(|r| r.rejected_no_space + r.rejected_too_large)
            .sum()
    }

    pub fn source(&self, label: &str) -> Option<&SourceResult> {
        self.per_source.iter().find(|r| r.label == label)
    }
}
