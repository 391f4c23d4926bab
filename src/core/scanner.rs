use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use crate::config::settings::Settings;
use crate::error::MigrationError;
use crate::models::scan_result::{ScanError, ScanErrorType, ScanResult};

use super::skip::SkipFilter;

/// Bounded walk of one source root.
///
/// Visits directories depth-first, a directory's files before its
/// subdirectories, entries sorted by name. At most `per_dir_file_cap` files are
/// considered per directory and the walk stops as soon as `max_files_per_source`
/// candidates have been collected.
pub struct Scanner<'a> {
    settings: &'a Settings,
    filter: &'a SkipFilter,
    extensions: HashSet<String>,
}

impl<'a> Scanner<'a> {
    pub fn new(settings: &'a Settings, filter: &'a SkipFilter) -> Self {
        let extensions = settings
            .allowed_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            settings,
            filter,
            extensions,
        }
    }

    /// Scan `root`. Fails only when the root itself cannot be listed; every
    /// deeper failure is recorded in `ScanResult::errors` and skipped.
    pub fn scan(&self, label: &str, root: &Path) -> Result<ScanResult, MigrationError> {
        let mut result = ScanResult::empty(label);

        let root_entries = read_dir_batch(root).map_err(|source| MigrationError::SourceUnavailable {
            path: root.to_path_buf(),
            source,
        })?;

        let max_files = self.settings.max_files_per_source;
        if max_files == 0 {
            result.truncated = true;
            return Ok(result);
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        if self.settings.follow_symlinks {
            if let Ok(real) = std::fs::canonicalize(root) {
                visited.insert(real);
            }
        }

        let mut pending: Vec<(PathBuf, Option<DirBatch>)> =
            vec![(root.to_path_buf(), Some(root_entries))];

        while let Some((dir, preread)) = pending.pop() {
            let batch = match preread {
                Some(batch) => batch,
                None => match read_dir_batch(&dir) {
                    Ok(batch) => batch,
                    Err(e) => {
                        tracing::debug!(
                            dir = %dir.display(),
                            error = %e,
                            "directory unreadable, skipping"
                        );
                        result.errors.push(ScanError::from_io(dir, &e));
                        continue;
                    }
                },
            };
            result.dirs_visited += 1;

            for (err_path, err) in &batch.errors {
                result.errors.push(ScanError::from_io(err_path.clone(), err));
            }

            let mut subdirs = Vec::new();
            let mut files_considered = 0usize;

            for entry in batch.entries {
                let file_type = entry.metadata.file_type();

                let metadata = if file_type.is_symlink() {
                    match std::fs::metadata(&entry.path) {
                        Ok(meta) => meta,
                        Err(e) => {
                            result.errors.push(ScanError::from_io(entry.path, &e));
                            continue;
                        }
                    }
                } else {
                    entry.metadata
                };

                if metadata.is_dir() {
                    if self.filter.should_skip(&entry.path) {
                        tracing::debug!(dir = %entry.path.display(), "pruned excluded directory");
                        result.dirs_pruned += 1;
                        continue;
                    }
                    if file_type.is_symlink() && !self.settings.follow_symlinks {
                        continue;
                    }
                    if self.settings.follow_symlinks {
                        match std::fs::canonicalize(&entry.path) {
                            Ok(real) => {
                                if !visited.insert(real) {
                                    result.errors.push(ScanError {
                                        message: format!(
                                            "Symlink cycle detected: {:?}",
                                            entry.path
                                        ),
                                        path: entry.path,
                                        error_type: ScanErrorType::SymlinkCycle,
                                    });
                                    continue;
                                }
                            }
                            Err(e) => {
                                result.errors.push(ScanError::from_io(entry.path, &e));
                                continue;
                            }
                        }
                    }
                    subdirs.push(entry.path);
                } else if metadata.is_file() {
                    if file_type.is_symlink() && !self.settings.follow_symlinks {
                        continue;
                    }
                    if files_considered >= self.settings.per_dir_file_cap {
                        continue;
                    }
                    files_considered += 1;

                    self.consider_file(entry.path, &metadata, &mut result);
                    if result.files.len() >= max_files {
                        result.truncated = true;
                        return Ok(result);
                    }
                }
            }

            // Reverse so the first subdirectory is popped first.
            pending.extend(subdirs.into_iter().rev().map(|d| (d, None)));
        }

        Ok(result)
    }

    fn consider_file(&self, path: PathBuf, metadata: &Metadata, result: &mut ScanResult) {
        if !self.extension_allowed(&path) || self.filter.should_skip(&path) {
            return;
        }
        let size = metadata.len();
        if size > self.settings.per_file_ceiling_bytes {
            tracing::debug!(file = %path.display(), size, "over per-file ceiling, excluded");
            result.oversized += 1;
            return;
        }
        result.total_bytes_estimate += size;
        result.files.push(path);
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

struct DirEntryData {
    path: PathBuf,
    metadata: Metadata,
}

struct DirBatch {
    entries: Vec<DirEntryData>,
    errors: Vec<(PathBuf, std::io::Error)>,
}

/// Read all entries of a directory with their (non-followed) metadata, sorted
/// by file name.
fn read_dir_batch(dir_path: &Path) -> std::io::Result<DirBatch> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for entry_result in std::fs::read_dir(dir_path)? {
        match entry_result {
            Ok(entry) => {
                let entry_path = entry.path();
                match std::fs::symlink_metadata(&entry_path) {
                    Ok(metadata) => entries.push(DirEntryData {
                        path: entry_path,
                        metadata,
                    }),
                    Err(e) => errors.push((entry_path, e)),
                }
            }
            Err(e) => errors.push((dir_path.to_path_buf(), e)),
        }
    }

    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(DirBatch { entries, errors })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!("quotacopy_scanner_{}", name));
            let _ = std::fs::remove_dir_all(&path);
            std::fs::create_dir_all(&path).expect("create test dir");
            Self { path }
        }

        fn write(&self, rel: &str, len: usize) {
            let path = self.path.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent");
            }
            std::fs::write(path, vec![b'x'; len]).expect("write file");
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn settings_for_test() -> Settings {
        Settings {
            allowed_extensions: vec![],
            ..Settings::default()
        }
    }

    fn relative(result: &ScanResult, root: &Path) -> Vec<String> {
        result
            .files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn visits_files_before_subdirectories_in_name_order() {
        let tmp = TestDir::new("order");
        tmp.write("b.txt", 1);
        tmp.write("a.txt", 2);
        tmp.write("sub/c.txt", 3);
        tmp.write("sub/deeper/d.txt", 4);
        tmp.write("another/e.txt", 5);

        let settings = settings_for_test();
        let filter = SkipFilter::default();
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();

        assert_eq!(
            relative(&result, &tmp.path),
            vec!["a.txt", "b.txt", "another/e.txt", "sub/c.txt", "sub/deeper/d.txt"]
        );
        assert_eq!(result.total_bytes_estimate, 15);
        assert_eq!(result.dirs_visited, 4);
        assert!(!result.truncated);
    }

    #[test]
    fn repeated_scans_are_identical() {
        let tmp = TestDir::new("idempotent");
        for i in 0..20 {
            tmp.write(&format!("d{}/f{}.txt", i % 4, i), i);
        }

        let settings = Settings {
            max_files_per_source: 7,
            ..settings_for_test()
        };
        let filter = SkipFilter::default();
        let scanner = Scanner::new(&settings, &filter);
        let first = scanner.scan("T", &tmp.path).unwrap();
        let second = scanner.scan("T", &tmp.path).unwrap();

        assert_eq!(first.files, second.files);
        assert_eq!(first.files.len(), 7);
        assert!(first.truncated);
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let tmp = TestDir::new("ext");
        tmp.write("photo.JPG", 1);
        tmp.write("notes.txt", 1);
        tmp.write("binary.exe", 1);
        tmp.write("README", 1);

        let settings = Settings {
            allowed_extensions: vec![".jpg".into(), "TXT".into()],
            ..Settings::default()
        };
        let filter = SkipFilter::default();
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();

        assert_eq!(relative(&result, &tmp.path), vec!["notes.txt", "photo.JPG"]);
    }

    #[test]
    fn per_directory_cap_bounds_each_directory() {
        let tmp = TestDir::new("dircap");
        for i in 0..10 {
            tmp.write(&format!("f{:02}.txt", i), 1);
            tmp.write(&format!("sub/g{:02}.txt", i), 1);
        }

        let settings = Settings {
            per_dir_file_cap: 3,
            ..settings_for_test()
        };
        let filter = SkipFilter::default();
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();

        assert_eq!(
            relative(&result, &tmp.path),
            vec!["f00.txt", "f01.txt", "f02.txt", "sub/g00.txt", "sub/g01.txt", "sub/g02.txt"]
        );
    }

    #[test]
    fn excluded_directories_are_pruned_and_oversized_files_dropped() {
        let tmp = TestDir::new("prune");
        tmp.write("keep/a.txt", 10);
        tmp.write("cache/b.txt", 10);
        tmp.write("big.bin", 101);
        tmp.write("exact.bin", 100);

        let settings = Settings {
            per_file_ceiling_bytes: 100,
            ..settings_for_test()
        };
        let filter = SkipFilter::new(
            [tmp.path.join("cache").to_string_lossy()],
            Vec::<String>::new(),
        );
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();

        assert_eq!(relative(&result, &tmp.path), vec!["exact.bin", "keep/a.txt"]);
        assert_eq!(result.dirs_pruned, 1);
        assert_eq!(result.oversized, 1);
    }

    #[test]
    fn unreadable_root_is_source_unavailable() {
        let settings = settings_for_test();
        let filter = SkipFilter::default();
        let missing = std::env::temp_dir().join("quotacopy_scanner_missing_root");
        let err = Scanner::new(&settings, &filter).scan("T", &missing).unwrap_err();
        assert!(matches!(err, MigrationError::SourceUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_are_detected_when_following() {
        let tmp = TestDir::new("cycle");
        tmp.write("sub/a.txt", 1);
        std::os::unix::fs::symlink(&tmp.path, tmp.path.join("sub/loop")).unwrap();

        let settings = Settings {
            follow_symlinks: true,
            ..settings_for_test()
        };
        let filter = SkipFilter::default();
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();

        assert_eq!(relative(&result, &tmp.path), vec!["sub/a.txt"]);
        assert!(result
            .errors
            .iter()
            .any(|e| e.error_type == ScanErrorType::SymlinkCycle));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entry_is_recorded_and_walk_continues() {
        let tmp = TestDir::new("dangling");
        tmp.write("a.txt", 1);
        tmp.write("sub/c.txt", 1);
        std::os::unix::fs::symlink(tmp.path.join("nowhere.txt"), tmp.path.join("b.txt")).unwrap();

        let settings = settings_for_test();
        let filter = SkipFilter::default();
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();

        assert_eq!(relative(&result, &tmp.path), vec!["a.txt", "sub/c.txt"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, tmp.path.join("b.txt"));
        assert_eq!(result.errors[0].error_type, ScanErrorType::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_only_collected_when_following() {
        let tmp = TestDir::new("file_links");
        let outside = TestDir::new("file_links_target");
        outside.write("secret.txt", 5);
        tmp.write("a.txt", 1);
        std::os::unix::fs::symlink(outside.path.join("secret.txt"), tmp.path.join("link.txt"))
            .unwrap();

        let filter = SkipFilter::default();
        let settings = settings_for_test();
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();
        assert_eq!(relative(&result, &tmp.path), vec!["a.txt"]);

        let settings = Settings {
            follow_symlinks: true,
            ..settings_for_test()
        };
        let result = Scanner::new(&settings, &filter).scan("T", &tmp.path).unwrap();
        assert_eq!(relative(&result, &tmp.path), vec!["a.txt", "link.txt"]);
        assert_eq!(result.total_bytes_estimate, 6);
    }
}
