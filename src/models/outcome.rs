use serde::{Deserialize, Serialize};

/// Why a single copy attempt ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CopyReason {
    Ok,
    NoSpace,
    TooLarge,
    SourceMissing,
    IoError,
}

/// Result of one `copy_one` call. Folded into counters right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub success: bool,
    pub size_bytes: u64,
    pub reason: CopyReason,
}

impl CopyOutcome {
    pub fn ok(size_bytes: u64) -> Self {
        Self {
            success: true,
            size_bytes,
            reason: CopyReason::Ok,
        }
    }

    pub fn rejected(reason: CopyReason, size_bytes: u64) -> Self {
        debug_assert!(reason != CopyReason::Ok);
        Self {
            success: false,
            size_bytes,
            reason,
        }
    }
}
