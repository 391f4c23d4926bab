use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One migration source. The label namespaces the destination subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceEntry {
    pub label: CompactString,
    pub root: PathBuf,
}

impl SourceEntry {
    pub fn new(label: impl Into<CompactString>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: root.into(),
        }
    }

    /// Parse the `LABEL=PATH` form accepted on the command line.
    pub fn parse_pair(raw: &str) -> Option<Self> {
        let (label, path) = raw.split_once('=')?;
        let label = label.trim();
        let path = path.trim();
        if path.is_empty() || !is_path_safe_label(label) {
            return None;
        }
        Some(Self::new(label, path))
    }

    /// Whether the label can be used as a single directory name under the
    /// destination.
    pub fn has_path_safe_label(&self) -> bool {
        is_path_safe_label(&self.label)
    }
}

/// One plain path component: no separators, no drive prefix, not `.` or `..`.
fn is_path_safe_label(label: &str) -> bool {
    !label.trim().is_empty()
        && label != "."
        && label != ".."
        && !label
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}
