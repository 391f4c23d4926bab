use std::path::PathBuf;

use compact_str::CompactString;
use tokio::sync::mpsc;

use crate::models::summary::{RunState, SourceStatus};

#[derive(Debug, Clone)]
pub enum Event {
    // Run state
    RunStarted { destination: PathBuf, budget_bytes: u64, sources: usize },
    QuotaHalted { used_bytes: u64, budget_bytes: u64, not_attempted: usize },
    RunCompleted {
        state: RunState,
        total_files: usize,
        total_bytes: u64,
        duration_ms: u64,
    },

    // Per source
    SourceStarted { label: CompactString, root: PathBuf },
    SourceScanned { label: CompactString, candidates: usize, estimate_bytes: u64 },
    CopyProgress {
        label: CompactString,
        files_copied: usize,
        candidates: usize,
        quota_fraction: f64,
    },
    SourceCompleted {
        label: CompactString,
        files_copied: usize,
        bytes_copied: u64,
        status: SourceStatus,
    },
    SourceFailed { label: CompactString, error: String },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
