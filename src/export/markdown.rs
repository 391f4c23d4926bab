use std::fmt::Write;
use std::path::Path;

use crate::models::size::human_readable_size;
use crate::models::summary::{RunState, RunSummary};

pub fn export_markdown(
    summary: &RunSummary,
    skip_regions: &[String],
    output_path: &Path,
) -> anyhow::Result<()> {
    let md = render_markdown(summary, skip_regions)?;
    std::fs::write(output_path, md)?;
    Ok(())
}

pub fn render_markdown(
    summary: &RunSummary,
    skip_regions: &[String],
) -> Result<String, std::fmt::Error> {
    let mut md = String::new();

    writeln!(md, "# Migration Summary")?;
    writeln!(md)?;
    writeln!(md, "- **Destination:** {}", summary.destination.display())?;
    writeln!(md, "- **Started:** {}", summary.started_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(md, "- **Duration:** {:.2}s", summary.elapsed.as_secs_f64())?;
    writeln!(
        md,
        "- **Result:** {}",
        match summary.state {
            RunState::Completed => "completed",
            RunState::HaltedQuota => "halted, quota reached",
        }
    )?;
    writeln!(md, "- **Files Copied:** {}", summary.total_files)?;
    writeln!(md, "- **Size Copied:** {}", human_readable_size(summary.total_bytes))?;
    writeln!(
        md,
        "- **Quota Used:** {} of {}",
        human_readable_size(summary.used_bytes),
        human_readable_size(summary.budget_bytes)
    )?;
    writeln!(md, "- **Rejected:** {}", summary.total_rejections())?;
    writeln!(md, "- **Failed:** {}", summary.total_failures())?;
    writeln!(md)?;

    writeln!(md, "## Sources")?;
    writeln!(md)?;
    writeln!(
        md,
        "| Source | Root | Candidates | Copied | Size | Too large | No space | Failed | Status |"
    )?;
    writeln!(
        md,
        "|--------|------|-----------:|-------:|-----:|----------:|---------:|-------:|--------|"
    )?;
    for r in &summary.per_source {
        writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            escape_cell(&r.label),
            escape_cell(&r.root.display().to_string()),
            r.candidates,
            r.files_copied,
            human_readable_size(r.bytes_copied),
            r.rejected_too_large,
            r.rejected_no_space,
            r.failures(),
            escape_cell(&r.status.describe()),
        )?;
    }

    if !skip_regions.is_empty() {
        writeln!(md)?;
        writeln!(md, "## Skipped Regions")?;
        writeln!(md)?;
        for region in skip_regions {
            writeln!(md, "- `{}`", region)?;
        }
    }

    Ok(md)
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
