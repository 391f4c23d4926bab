use std::collections::HashSet;

use compact_str::CompactString;

use crate::models::source::SourceEntry;

use super::skip::SkipFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Label is not a single plain directory name (separators, `..`, drive
    /// prefix), so its subtree would land outside the destination.
    UnsafeLabel,
    /// Root path did not exist when the catalog was built.
    Missing,
    /// Root path lies in an excluded region.
    Skipped,
    /// Exact `(label, root)` pair already present.
    Duplicate,
    /// Label already taken by an earlier entry with a different root.
    LabelCollision,
}

#[derive(Debug, Clone)]
pub struct DroppedSource {
    pub entry: SourceEntry,
    pub reason: DropReason,
}

/// Ordered, filtered, deduplicated sources for one run.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: Vec<SourceEntry>,
    pub dropped: Vec<DroppedSource>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filter `candidates` in priority order. First occurrence wins; the only side
/// effect is a read-only existence check per root.
pub fn build_catalog<I>(candidates: I, filter: &SkipFilter) -> Catalog
where
    I: IntoIterator<Item = SourceEntry>,
{
    let mut catalog = Catalog::default();
    let mut seen_pairs: HashSet<SourceEntry> = HashSet::new();
    let mut seen_labels: HashSet<CompactString> = HashSet::new();

    for entry in candidates {
        let reason = if !entry.has_path_safe_label() {
            Some(DropReason::UnsafeLabel)
        } else if !entry.root.exists() {
            Some(DropReason::Missing)
        } else if filter.should_skip(&entry.root) {
            Some(DropReason::Skipped)
        } else if seen_pairs.contains(&entry) {
            Some(DropReason::Duplicate)
        } else if seen_labels.contains(&entry.label) {
            Some(DropReason::LabelCollision)
        } else {
            None
        };

        match reason {
            None => {
                tracing::debug!(label = %entry.label, root = %entry.root.display(), "source added");
                seen_labels.insert(entry.label.clone());
                seen_pairs.insert(entry.clone());
                catalog.entries.push(entry);
            }
            Some(reason) => {
                if reason == DropReason::LabelCollision {
                    tracing::warn!(
                        label = %entry.label,
                        root = %entry.root.display(),
                        "label already used by an earlier source, dropping"
                    );
                } else if reason == DropReason::UnsafeLabel {
                    tracing::warn!(
                        label = %entry.label,
                        root = %entry.root.display(),
                        "label is not a plain directory name, dropping"
                    );
                } else {
                    tracing::debug!(label = %entry.label, ?reason, "source dropped");
                }
                catalog.dropped.push(DroppedSource { entry, reason });
            }
        }
    }

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn make_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quotacopy_catalog_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn exact_duplicates_and_label_collisions_collapse_to_first() {
        let base = make_dir("dupes");
        let a = base.join("a");
        let b = base.join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let catalog = build_catalog(
            vec![
                SourceEntry::new("Docs", &a),
                SourceEntry::new("Docs", &a),
                SourceEntry::new("Docs", &b),
            ],
            &SkipFilter::default(),
        );

        assert_eq!(catalog.entries, vec![SourceEntry::new("Docs", &a)]);
        let reasons: Vec<DropReason> = catalog.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(reasons, vec![DropReason::Duplicate, DropReason::LabelCollision]);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn order_is_preserved_and_missing_or_skipped_roots_dropped() {
        let base = make_dir("order");
        for name in ["one", "two", "three", "cache"] {
            std::fs::create_dir_all(base.join(name)).unwrap();
        }
        let filter = SkipFilter::new([base.join("cache").to_string_lossy()], ["program files"]);

        let catalog = build_catalog(
            vec![
                SourceEntry::new("Three", base.join("three")),
                SourceEntry::new("Gone", base.join("gone")),
                SourceEntry::new("One", base.join("one")),
                SourceEntry::new("Cache", base.join("cache")),
                SourceEntry::new("Two", base.join("two")),
            ],
            &filter,
        );

        let labels: Vec<&str> = catalog.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Three", "One", "Two"]);
        assert_eq!(catalog.dropped.len(), 2);
        assert_eq!(catalog.dropped[0].reason, DropReason::Missing);
        assert_eq!(catalog.dropped[1].reason, DropReason::Skipped);

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn labels_that_would_escape_the_destination_are_dropped() {
        let base = make_dir("unsafe_labels");
        let src = base.join("src");
        std::fs::create_dir_all(&src).unwrap();

        let catalog = build_catalog(
            vec![
                SourceEntry::new("../escaped", &src),
                SourceEntry::new(base.join("outside").to_string_lossy().into_owned(), &src),
                SourceEntry::new("..", &src),
                SourceEntry::new("Safe", &src),
            ],
            &SkipFilter::default(),
        );

        assert_eq!(catalog.entries, vec![SourceEntry::new("Safe", &src)]);
        assert_eq!(catalog.dropped.len(), 3);
        assert!(catalog
            .dropped
            .iter()
            .all(|d| d.reason == DropReason::UnsafeLabel));

        let _ = std::fs::remove_dir_all(&base);
    }
}
