use std::path::PathBuf;

use clap::Parser;

use quotacopy::app::{App, AppOptions};
use quotacopy::config::settings::Settings;
use quotacopy::config::sources::SourceList;
use quotacopy::models::size::human_readable_size;
use quotacopy::models::source::SourceEntry;
use quotacopy::models::summary::RunState;

#[derive(Parser, Debug)]
#[command(
    name = "quotacopy",
    version,
    about = "Copy prioritized sources into one destination without exceeding its free space"
)]
struct Cli {
    /// Destination root (e.g. the mount point of a removable volume)
    #[arg(short = 'd', long)]
    dest: PathBuf,

    /// JSON source list with priority tiers
    #[arg(short = 's', long)]
    sources: Option<PathBuf>,

    /// Extra source as LABEL=PATH, appended after the source list (repeatable)
    #[arg(long = "source", value_parser = parse_source)]
    extra_sources: Vec<SourceEntry>,

    /// JSON settings file; flags below override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Allowed file extension (repeatable); replaces the configured list
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Copy files of every extension
    #[arg(long, conflicts_with = "extensions")]
    all_extensions: bool,

    /// Space withheld from the destination's free space, in MiB
    #[arg(long)]
    safety_margin_mb: Option<u64>,

    /// Absolute ceiling on bytes copied in this run, in MiB
    #[arg(long)]
    hard_cap_mb: Option<u64>,

    /// Refuse to start when the destination has less free space, in MiB
    #[arg(long)]
    min_free_mb: Option<u64>,

    /// Largest single file to copy, in MiB
    #[arg(long)]
    max_file_mb: Option<u64>,

    /// Maximum candidate files collected per source
    #[arg(long)]
    max_files: Option<usize>,

    /// Descend into symlinked directories
    #[arg(long)]
    follow_symlinks: bool,

    /// Copy straight into the destination instead of a timestamped run folder
    #[arg(long)]
    flat: bool,

    /// Do not write the summary report into the run folder
    #[arg(long)]
    no_report: bool,

    /// Export the run summary as JSON
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Export the run summary as Markdown
    #[arg(long)]
    export_markdown: Option<PathBuf>,
}

fn parse_source(raw: &str) -> Result<SourceEntry, String> {
    SourceEntry::parse_pair(raw).ok_or_else(|| format!("expected LABEL=PATH, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logs to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Build settings
    let mut settings = match cli.config {
        Some(ref path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if cli.all_extensions {
        settings.allowed_extensions.clear();
    } else if !cli.extensions.is_empty() {
        settings.allowed_extensions = cli.extensions.clone();
    }
    if let Some(mb) = cli.safety_margin_mb {
        settings.safety_margin_bytes = Settings::mib(mb);
    }
    if let Some(mb) = cli.hard_cap_mb {
        settings.hard_cap_bytes = Settings::mib(mb);
    }
    if let Some(mb) = cli.min_free_mb {
        settings.min_free_bytes = Settings::mib(mb);
    }
    if let Some(mb) = cli.max_file_mb {
        settings.per_file_ceiling_bytes = Settings::mib(mb);
    }
    if let Some(n) = cli.max_files {
        settings.max_files_per_source = n;
    }
    settings.follow_symlinks |= cli.follow_symlinks;

    // Candidate sources, priority order
    let mut candidates = match cli.sources {
        Some(ref path) => SourceList::load(path)?.candidates(&settings.skip_filter()),
        None => Vec::new(),
    };
    candidates.extend(cli.extra_sources.iter().cloned());
    if candidates.is_empty() {
        anyhow::bail!("no sources given; use --sources FILE or --source LABEL=PATH");
    }

    let run_folder = (!cli.flat)
        .then(|| format!("Migration-{}", chrono::Local::now().format("%Y%m%d-%H%M%S")));
    let options = AppOptions {
        destination: cli.dest.clone(),
        run_folder,
        write_report: !cli.no_report,
        export_json: cli.export_json.clone(),
        export_markdown: cli.export_markdown.clone(),
    };

    let summary = App::new(settings, options, candidates).run().await?;

    println!();
    for r in &summary.per_source {
        println!(
            "{:<24} {:>7} files {:>12}  {}",
            r.label,
            r.files_copied,
            human_readable_size(r.bytes_copied),
            r.status.describe()
        );
    }
    println!();
    println!("Total files copied: {}", summary.total_files);
    println!("Total size: {}", human_readable_size(summary.total_bytes));
    println!(
        "Quota used: {} of {}",
        human_readable_size(summary.used_bytes),
        human_readable_size(summary.budget_bytes)
    );
    println!("Time taken: {:.1}s", summary.elapsed.as_secs_f64());
    if summary.state == RunState::HaltedQuota {
        println!("Stopped early: the destination budget was reached.");
    }
    println!("Data saved to: {}", summary.destination.display());

    Ok(())
}
