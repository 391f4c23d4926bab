use std::path::Path;

use crate::models::summary::RunSummary;

pub fn export_json(summary: &RunSummary, output_path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
