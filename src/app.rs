use std::path::{Path, PathBuf};

use crate::config::settings::Settings;
use crate::core::catalog::build_catalog;
use crate::core::events::{self, Event};
use crate::core::orchestrator::{prepare_destination, Migrator};
use crate::models::size::human_readable_size;
use crate::models::source::SourceEntry;
use crate::models::summary::RunSummary;

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub destination: PathBuf,
    /// Folder created under `destination` for this run; `None` copies into it directly.
    pub run_folder: Option<String>,
    pub write_report: bool,
    pub export_json: Option<PathBuf>,
    pub export_markdown: Option<PathBuf>,
}

pub struct App {
    settings: Settings,
    options: AppOptions,
    candidates: Vec<SourceEntry>,
}

impl App {
    pub fn new(settings: Settings, options: AppOptions, candidates: Vec<SourceEntry>) -> Self {
        Self {
            settings,
            options,
            candidates,
        }
    }

    /// Check preconditions, run the migration on a blocking thread while
    /// rendering its status events, then write the requested reports. Only a
    /// failed precondition is an error; a run with no usable source still
    /// yields an empty summary and report.
    pub async fn run(self) -> anyhow::Result<RunSummary> {
        let App {
            settings,
            options,
            candidates,
        } = self;

        let prepared = prepare_destination(
            &options.destination,
            options.run_folder.as_deref(),
            &settings,
        )?;
        tracing::info!(
            free = %human_readable_size(prepared.free_bytes),
            budget = %human_readable_size(prepared.ledger.budget()),
            margin = %human_readable_size(settings.safety_margin_bytes),
            run_dir = %prepared.run_dir.display(),
            "destination ready"
        );

        let catalog = build_catalog(candidates, &settings.skip_filter());
        if catalog.is_empty() {
            tracing::warn!(
                dropped = catalog.dropped.len(),
                "no usable sources: every candidate was missing, excluded or duplicated"
            );
        }
        tracing::info!(sources = catalog.len(), dropped = catalog.dropped.len(), "catalog built");

        let (event_tx, mut event_rx) = events::create_event_channel();
        let migrator = Migrator::new(settings.clone(), event_tx);
        let run_dir = prepared.run_dir.clone();
        let ledger = prepared.ledger;
        let entries = catalog.entries;

        let handle = tokio::task::spawn_blocking(move || migrator.run(&entries, &run_dir, ledger));

        // The channel closes when the migrator is dropped at the end of the run.
        while let Some(event) = event_rx.recv().await {
            render_event(&event);
        }
        let summary = handle.await?;

        write_reports(&settings, &options, &summary, &prepared.run_dir);
        Ok(summary)
    }
}

fn write_reports(settings: &Settings, options: &AppOptions, summary: &RunSummary, run_dir: &Path) {
    let skip_regions = &settings.skip_prefixes;

    if options.write_report {
        let path = run_dir.join(format!(
            "MIGRATION-SUMMARY-{}.md",
            summary.started_at.format("%Y%m%d-%H%M%S")
        ));
        match crate::export::markdown::export_markdown(summary, skip_regions, &path) {
            Ok(()) => tracing::info!("Report saved: {}", path.display()),
            Err(e) => tracing::error!("Report failed: {}", e),
        }
    }
    if let Some(ref path) = options.export_markdown {
        if let Err(e) = crate::export::markdown::export_markdown(summary, skip_regions, path) {
            tracing::error!("Export failed: {}", e);
        } else {
            tracing::info!("Exported to: {}", path.display());
        }
    }
    if let Some(ref path) = options.export_json {
        if let Err(e) = crate::export::json::export_json(summary, path) {
            tracing::error!("Export failed: {}", e);
        } else {
            tracing::info!("Exported to: {}", path.display());
        }
    }
}

pub fn render_event(event: &Event) {
    match event {
        Event::RunStarted { destination, budget_bytes, sources } => {
            tracing::info!(
                "Migrating {} sources into {} (budget {})",
                sources,
                destination.display(),
                human_readable_size(*budget_bytes)
            );
        }
        Event::SourceStarted { label, root } => {
            tracing::info!("Processing {} ({})", label, root.display());
        }
        Event::SourceScanned { label, candidates, estimate_bytes } => {
            tracing::info!(
                "{}: {} files, ~{}",
                label,
                candidates,
                human_readable_size(*estimate_bytes)
            );
        }
        Event::CopyProgress { label, files_copied, candidates, quota_fraction } => {
            tracing::info!(
                "{}: {}/{} files, {:.1}% of quota used",
                label,
                files_copied,
                candidates,
                quota_fraction * 100.0
            );
        }
        Event::SourceCompleted { label, files_copied, bytes_copied, status } => {
            tracing::info!(
                "{}: {} files copied ({}), {}",
                label,
                files_copied,
                human_readable_size(*bytes_copied),
                status.describe()
            );
        }
        Event::SourceFailed { label, error } => {
            tracing::warn!("{}: {}", label, error);
        }
        Event::QuotaHalted { used_bytes, budget_bytes, not_attempted } => {
            tracing::warn!(
                "Quota reached ({} of {}), {} sources not attempted",
                human_readable_size(*used_bytes),
                human_readable_size(*budget_bytes),
                not_attempted
            );
        }
        Event::RunCompleted { state, total_files, total_bytes, duration_ms } => {
            tracing::info!(
                "Run finished ({:?}): {} files, {} in {:.1}s",
                state,
                total_files,
                human_readable_size(*total_bytes),
                *duration_ms as f64 / 1000.0
            );
        }
    }
}
