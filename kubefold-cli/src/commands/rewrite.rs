//! Rewrite pass over an existing manifest directory

use super::{print_directory_status, ManifestRow};
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use kubefold_engine::{EngineConfig, ManifestProcessor};
use std::path::Path;

/// Returns the number of manifests that failed
pub fn handle_rewrite_command(
    dir: &Path,
    dry_run: bool,
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<usize> {
    let processor = ManifestProcessor::new(config.classification.clone(), config.output.clone())
        .with_dry_run(dry_run);

    let report = processor
        .process_directory(dir)
        .with_context(|| format!("Failed to rewrite manifests in {}", dir.display()))?;

    if !format.is_table() {
        output::print_single(&report, format)?;
        return Ok(report.failures());
    }

    print_directory_status(&report, dry_run);
    let rows: Vec<ManifestRow> = report.manifests.iter().map(ManifestRow::from).collect();
    output::print_output(rows, format)?;

    let failures = report.failures();
    if failures > 0 {
        output::print_warning(&format!(
            "{} of {} manifest(s) failed",
            failures,
            report.manifests.len()
        ));
    } else {
        output::print_success(&format!("{} manifest(s) patched", report.patched()));
    }

    Ok(failures)
}
