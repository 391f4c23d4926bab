use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;

use crate::config::settings::Settings;
use crate::error::MigrationError;
use crate::models::outcome::CopyReason;
use crate::models::source::SourceEntry;
use crate::models::summary::{RunState, RunSummary, SourceResult, SourceStatus};

use super::copy::CopyEngine;
use super::events::{Event, EventSender};
use super::ledger::QuotaLedger;
use super::scanner::Scanner;
use super::skip::SkipFilter;
use super::space::free_space_of;

/// Destination checked and ready: run folder created, budget fixed.
#[derive(Debug)]
pub struct PreparedDestination {
    pub run_dir: PathBuf,
    pub free_bytes: u64,
    pub ledger: QuotaLedger,
}

/// Run every precondition before any copy. `run_folder` is created under
/// `destination` when given.
pub fn prepare_destination(
    destination: &Path,
    run_folder: Option<&str>,
    settings: &Settings,
) -> Result<PreparedDestination, MigrationError> {
    let unreachable_err = |source| MigrationError::DestinationUnreachable {
        path: destination.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(destination).map_err(unreachable_err)?;
    let free_bytes = free_space_of(destination).map_err(unreachable_err)?;

    if free_bytes < settings.min_free_bytes {
        return Err(MigrationError::BelowMinimumFree {
            free: free_bytes,
            minimum: settings.min_free_bytes,
        });
    }

    let ledger = QuotaLedger::from_free_space(
        free_bytes,
        settings.safety_margin_bytes,
        settings.hard_cap_bytes,
    )?;

    let run_dir = match run_folder {
        Some(name) => destination.join(name),
        None => destination.to_path_buf(),
    };
    std::fs::create_dir_all(&run_dir).map_err(|source| MigrationError::DestinationUnreachable {
        path: run_dir.clone(),
        source,
    })?;

    Ok(PreparedDestination {
        run_dir,
        free_bytes,
        ledger,
    })
}

/// Drives catalog -> scan -> copy across all sources, strictly sequentially.
pub struct Migrator {
    settings: Settings,
    filter: SkipFilter,
    event_tx: EventSender,
}

impl Migrator {
    pub fn new(settings: Settings, event_tx: EventSender) -> Self {
        let filter = settings.skip_filter();
        Self {
            settings,
            filter,
            event_tx,
        }
    }

    /// Migrate `sources` in order into `destination`. Takes ownership of the
    /// ledger for the run; always produces a summary.
    pub fn run(
        &self,
        sources: &[SourceEntry],
        destination: &Path,
        mut ledger: QuotaLedger,
    ) -> RunSummary {
        let started_at = Local::now();
        let clock = Instant::now();

        tracing::info!(
            destination = %destination.display(),
            budget = ledger.budget(),
            sources = sources.len(),
            "migration started"
        );
        let _ = self.event_tx.send(Event::RunStarted {
            destination: destination.to_path_buf(),
            budget_bytes: ledger.budget(),
            sources: sources.len(),
        });

        let scanner = Scanner::new(&self.settings, &self.filter);
        let mut engine = CopyEngine::new(
            self.settings.per_file_ceiling_bytes,
            self.settings.copy_buffer_bytes,
        );
        let mut per_source = Vec::with_capacity(sources.len());
        let mut quota_reached = false;
        let mut state = RunState::Completed;

        for (idx, entry) in sources.iter().enumerate() {
            if quota_reached || ledger.is_exhausted() {
                state = RunState::HaltedQuota;
                let remaining = &sources[idx..];
                tracing::info!(
                    used = ledger.used(),
                    budget = ledger.budget(),
                    not_attempted = remaining.len(),
                    "quota reached, stopping"
                );
                let _ = self.event_tx.send(Event::QuotaHalted {
                    used_bytes: ledger.used(),
                    budget_bytes: ledger.budget(),
                    not_attempted: remaining.len(),
                });
                per_source.extend(remaining.iter().map(|e| {
                    SourceResult::new(e.label.clone(), e.root.clone(), SourceStatus::NotAttempted)
                }));
                break;
            }

            let result =
                self.migrate_source(entry, destination, &scanner, &mut engine, &mut ledger);
            quota_reached = result.status == SourceStatus::QuotaReached;
            per_source.push(result);
        }

        let total_files = per_source.iter().map(|r| r.files_copied).sum();
        let total_bytes = per_source.iter().map(|r| r.bytes_copied).sum();
        let elapsed = clock.elapsed();

        let _ = self.event_tx.send(Event::RunCompleted {
            state,
            total_files,
            total_bytes,
            duration_ms: elapsed.as_millis() as u64,
        });

        RunSummary {
            destination: destination.to_path_buf(),
            started_at,
            per_source,
            total_files,
            total_bytes,
            budget_bytes: ledger.budget(),
            used_bytes: ledger.used(),
            elapsed,
            state,
        }
    }

    fn migrate_source(
        &self,
        entry: &SourceEntry,
        destination: &Path,
        scanner: &Scanner<'_>,
        engine: &mut CopyEngine,
        ledger: &mut QuotaLedger,
    ) -> SourceResult {
        let label = entry.label.clone();
        if !entry.has_path_safe_label() {
            tracing::warn!(label = %label, "label is not a plain directory name, skipping source");
            let _ = self.event_tx.send(Event::SourceFailed {
                label: label.clone(),
                error: "label is not a plain directory name".to_string(),
            });
            return SourceResult::new(label, entry.root.clone(), SourceStatus::InvalidLabel);
        }

        tracing::info!(
            label = %label,
            root = %entry.root.display(),
            used = ledger.used(),
            "processing source"
        );
        let _ = self.event_tx.send(Event::SourceStarted {
            label: label.clone(),
            root: entry.root.clone(),
        });

        let scan = match scanner.scan(&label, &entry.root) {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!(label = %label, error = %e, "scan failed");
                let _ = self.event_tx.send(Event::SourceFailed {
                    label: label.clone(),
                    error: e.to_string(),
                });
                let status = SourceStatus::ScanFailed(e.to_string());
                return SourceResult::new(label, entry.root.clone(), status);
            }
        };

        let mut result =
            SourceResult::new(label.clone(), entry.root.clone(), SourceStatus::Completed);
        result.candidates = scan.len();
        result.estimate_bytes = scan.total_bytes_estimate;
        result.scan_errors = scan.errors.len();

        tracing::info!(
            label = %label,
            files = scan.len(),
            estimate = scan.total_bytes_estimate,
            "scan finished"
        );
        let _ = self.event_tx.send(Event::SourceScanned {
            label: label.clone(),
            candidates: scan.len(),
            estimate_bytes: scan.total_bytes_estimate,
        });

        if scan.is_empty() {
            result.status = SourceStatus::NoFiles;
        }

        let dest_root = destination.join(label.as_str());
        let progress_every = self.settings.progress_every.max(1);

        for file in &scan.files {
            let target = destination_for(&dest_root, &entry.root, file);
            let outcome = engine.copy_one(file, &target, ledger);
            result.record(&outcome);

            if outcome.reason == CopyReason::NoSpace || ledger.is_exhausted() {
                tracing::info!(label = %label, "quota reached for this source");
                result.status = SourceStatus::QuotaReached;
                break;
            }

            if outcome.success && result.files_copied % progress_every == 0 {
                let _ = self.event_tx.send(Event::CopyProgress {
                    label: label.clone(),
                    files_copied: result.files_copied,
                    candidates: result.candidates,
                    quota_fraction: ledger.progress_fraction(),
                });
            }
        }

        tracing::info!(
            label = %label,
            copied = result.files_copied,
            bytes = result.bytes_copied,
            failures = result.failures(),
            "source done"
        );
        let _ = self.event_tx.send(Event::SourceCompleted {
            label,
            files_copied: result.files_copied,
            bytes_copied: result.bytes_copied,
            status: result.status.clone(),
        });

        result
    }
}

/// `<dest_root>/<path relative to source root>`; falls back to the file name.
fn destination_for(dest_root: &Path, source_root: &Path, file: &Path) -> PathBuf {
    match file.strip_prefix(source_root) {
        Ok(rel) => dest_root.join(rel),
        Err(_) => dest_root.join(file.file_name().unwrap_or(file.as_os_str())),
    }
}
