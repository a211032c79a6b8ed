//! Full conversion of compose folders

use super::print_directory_status;
use crate::output::{self, file_label, OutputFormat};
use anyhow::Result;
use kubefold_engine::pipeline::{FolderOutcome, RunReport};
use kubefold_engine::{EngineConfig, Pipeline};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct FolderRow {
    folder: String,
    status: String,
    generated: usize,
    patched: usize,
    failed: usize,
}

impl From<&FolderOutcome> for FolderRow {
    fn from(outcome: &FolderOutcome) -> Self {
        match outcome {
            FolderOutcome::Completed(report) => Self {
                folder: report.folder.dir.display().to_string(),
                status: if report.rewrite.failures() > 0 {
                    "partial"
                } else {
                    "done"
                }
                .to_string(),
                generated: report.generated.len(),
                patched: report.rewrite.patched(),
                failed: report.rewrite.failures(),
            },
            FolderOutcome::Failed { folder, .. } => Self {
                folder: folder.display().to_string(),
                status: "failed".to_string(),
                generated: 0,
                patched: 0,
                failed: 1,
            },
        }
    }
}

fn print_run_status(report: &RunReport, dry_run: bool) {
    for outcome in &report.folders {
        match outcome {
            FolderOutcome::Completed(folder) => {
                for path in &folder.generated {
                    let kind = if file_label(path).ends_with("-secret.yaml") {
                        "Secret manifest"
                    } else {
                        "ConfigMap manifest"
                    };
                    if dry_run {
                        output::print_planned("create", kind, path);
                    } else {
                        output::print_created(kind, path);
                    }
                }
                print_directory_status(&folder.rewrite, dry_run);
            }
            FolderOutcome::Failed { folder, kind, message } => {
                output::print_error(&format!("{} ({}): {}", folder.display(), kind, message));
            }
        }
    }
}

/// Returns the number of failed folders and manifests
pub async fn handle_convert_command(
    root: &Path,
    dry_run: bool,
    config: EngineConfig,
    format: OutputFormat,
) -> Result<usize> {
    let report = Pipeline::new(config).with_dry_run(dry_run).run(root).await?;

    if !format.is_table() {
        output::print_single(&report, format)?;
        return Ok(report.failures());
    }

    if report.folders.is_empty() {
        output::print_info(&format!("No compose files found under {}", root.display()));
        return Ok(0);
    }

    print_run_status(&report, dry_run);
    let rows: Vec<FolderRow> = report.folders.iter().map(FolderRow::from).collect();
    output::print_output(rows, format)?;

    let failures = report.failures();
    if failures > 0 {
        output::print_warning(&format!("Finished with {} failure(s)", failures));
    } else {
        output::print_success(&format!("Converted {} folder(s)", report.folders.len()));
    }

    Ok(failures)
}
