use std::path::{Path, PathBuf};

use compact_str::{format_compact, CompactString};
use serde::{Deserialize, Serialize};

use crate::core::skip::SkipFilter;
use crate::error::MigrationError;
use crate::models::source::SourceEntry;

/// Priority-ordered source configuration. Tiers are flattened in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceList {
    #[serde(default)]
    pub tiers: Vec<SourceTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTier {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Entry { label: CompactString, path: PathBuf },
    /// One entry per immediate subdirectory of `expand`, labeled `<prefix>_<name>`.
    Expand { expand: PathBuf, prefix: CompactString },
}

impl SourceList {
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| MigrationError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Candidate entries in priority order, expansions resolved against the
    /// filesystem now. Existence and dedupe are left to the catalog.
    pub fn candidates(&self, filter: &SkipFilter) -> Vec<SourceEntry> {
        let mut out = Vec::new();
        for tier in &self.tiers {
            for spec in &tier.sources {
                match spec {
                    SourceSpec::Entry { label, path } => {
                        out.push(SourceEntry::new(label.clone(), path.clone()))
                    }
                    SourceSpec::Expand { expand, prefix } => {
                        out.extend(expand_children(prefix, expand, filter))
                    }
                }
            }
        }
        out
    }
}

/// Immediate subdirectories of `root`, sorted by name, excluded regions removed.
pub fn expand_children(prefix: &str, root: &Path, filter: &SkipFilter) -> Vec<SourceEntry> {
    let read = match std::fs::read_dir(root) {
        Ok(read) => read,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "expansion root unreadable");
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = read
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && !filter.should_skip(path))
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some(SourceEntry::new(format_compact!("{}_{}", prefix, name), path))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_expansions_in_order() {
        let json = r#"{
            "tiers": [
                { "name": "essential", "sources": [
                    { "label": "Docs", "path": "/home/ana/Documents" },
                    { "expand": "/nonexistent/quotacopy/drive", "prefix": "D" }
                ]},
                { "name": "extra", "sources": [
                    { "label": "Music", "path": "/home/ana/Music" }
                ]}
            ]
        }"#;
        let list: SourceList = serde_json::from_str(json).unwrap();
        assert_eq!(list.tiers.len(), 2);
        assert!(matches!(list.tiers[0].sources[1], SourceSpec::Expand { .. }));

        let labels: Vec<String> = list
            .candidates(&SkipFilter::default())
            .into_iter()
            .map(|e| e.label.to_string())
            .collect();
        assert_eq!(labels, vec!["Docs", "Music"]);
    }

    #[test]
    fn expansion_lists_sorted_subdirectories() {
        let root = std::env::temp_dir().join("quotacopy_sources_expand");
        let _ = std::fs::remove_dir_all(&root);
        for name in ["zeta", "alpha", "Program Files"] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }
        std::fs::write(root.join("loose.txt"), "x").unwrap();

        let entries = expand_children("E", &root, &SkipFilter::default());
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["E_alpha", "E_zeta"]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
