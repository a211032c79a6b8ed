//! Subcommand handlers

pub mod classify;
pub mod convert;
pub mod rewrite;

use crate::output::{self, file_label};
use kubefold_engine::rewrite::{DirectoryReport, ManifestOutcome};
use serde::Serialize;
use tabled::Tabled;

/// One line of the per-manifest summary table
#[derive(Tabled, Serialize)]
pub struct ManifestRow {
    manifest: String,
    status: String,
    added: usize,
    removed: usize,
    claims_deleted: usize,
}

impl From<&ManifestOutcome> for ManifestRow {
    fn from(outcome: &ManifestOutcome) -> Self {
        match outcome {
            ManifestOutcome::Processed(report) => Self {
                manifest: file_label(&report.path),
                status: if report.written {
                    "patched"
                } else if report.changed() {
                    "changed"
                } else {
                    "unchanged"
                }
                .to_string(),
                added: report.rewrite.added_volumes.len(),
                removed: report.removed_volumes().count(),
                claims_deleted: report.deleted_artifacts.len(),
            },
            ManifestOutcome::Failed { path, .. } => Self {
                manifest: file_label(path),
                status: "failed".to_string(),
                added: 0,
                removed: 0,
                claims_deleted: 0,
            },
        }
    }
}

/// Status lines for every manifest of a rewritten directory
pub fn print_directory_status(report: &DirectoryReport, dry_run: bool) {
    for outcome in &report.manifests {
        match outcome {
            ManifestOutcome::Processed(manifest) => {
                if manifest.written {
                    output::print_patched("Pod manifest", &manifest.path);
                } else if manifest.changed() {
                    output::print_planned("patch", "pod manifest", &manifest.path);
                }

                for path in &manifest.deleted_artifacts {
                    if dry_run {
                        output::print_planned("delete", "claim manifest", path);
                    } else {
                        output::print_deleted("Claim manifest", path);
                    }
                }

                for renamed in &manifest.rewrite.renamed_volumes {
                    output::print_warning(&format!(
                        "{}: claim volume '{}' renamed to '{}' for its remaining mounts",
                        file_label(&manifest.path),
                        renamed.from,
                        renamed.to
                    ));
                }

                for skipped in &manifest.rewrite.skipped_mounts {
                    output::print_warning(&format!(
                        "{}: left {} in container '{}' on volume '{}': {}",
                        file_label(&manifest.path),
                        skipped.mount_path,
                        skipped.container,
                        skipped.volume,
                        skipped.reason
                    ));
                }
            }
            ManifestOutcome::Failed { path, kind, message } => {
                output::print_error(&format!("{} ({}): {}", path.display(), kind, message));
            }
        }
    }
}
