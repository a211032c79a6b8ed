//! Manifest volume rewrite pass
//!
//! For every pod manifest of an output directory:
//! - load the document
//! - refuse it if a mount already references an unknown volume
//! - run the volume rewriter, then the defensive orphan sweep
//! - write the document back and delete claim manifests of dropped volumes
//!
//! Manifests are independent; one failing does not stop the others.

pub mod cleaner;
pub mod rewriter;

pub use cleaner::{ClaimArtifacts, CleanupReport, DroppedMount, OrphanCleaner};
pub use rewriter::{
    RemovedVolume, RenamedVolume, RewiredMount, RewriteReport, SkippedMount, VolumeRewriter,
};

use crate::config::OutputConfig;
use crate::manifest::{PodManifest, VolumeSource};
use kubefold_common::{ClassificationRules, Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Result of processing one manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestReport {
    pub path: PathBuf,
    pub rewrite: RewriteReport,
    pub cleanup: CleanupReport,
    /// Claim manifests deleted (or that would be, in a dry run)
    pub deleted_artifacts: Vec<PathBuf>,
    /// Whether the manifest was written back
    pub written: bool,
}

impl ManifestReport {
    pub fn changed(&self) -> bool {
        self.rewrite.changed() || self.cleanup.changed()
    }

    /// All volumes dropped by either pass, in order
    pub fn removed_volumes(&self) -> impl Iterator<Item = &RemovedVolume> {
        self.rewrite
            .removed_volumes
            .iter()
            .chain(&self.cleanup.removed_volumes)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ManifestOutcome {
    Processed(ManifestReport),
    Failed {
        path: PathBuf,
        kind: String,
        message: String,
    },
}

impl ManifestOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Processed(report) => &report.path,
            Self::Failed { path, .. } => path,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of processing every pod manifest in a directory
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub manifests: Vec<ManifestOutcome>,
}

impl DirectoryReport {
    pub fn failures(&self) -> usize {
        self.manifests.iter().filter(|m| m.is_failed()).count()
    }

    pub fn patched(&self) -> usize {
        self.manifests
            .iter()
            .filter(|m| matches!(m, ManifestOutcome::Processed(r) if r.changed()))
            .count()
    }
}

/// Runs the rewrite pass over manifest files
pub struct ManifestProcessor {
    rules: ClassificationRules,
    output: OutputConfig,
    dry_run: bool,
}

impl ManifestProcessor {
    pub fn new(rules: ClassificationRules, output: OutputConfig) -> Self {
        Self {
            rules,
            output,
            dry_run: false,
        }
    }

    /// Report what would change without writing or deleting anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Rewrite a manifest held in memory. Both passes run; nothing touches
    /// the filesystem.
    pub fn rewrite_in_memory(&self, manifest: &mut PodManifest) -> Result<(RewriteReport, CleanupReport)> {
        if let Some(mount) = manifest.unresolved_mounts().into_iter().next() {
            return Err(Error::UnresolvedMountReference {
                path: manifest.source().to_path_buf(),
                container: mount.container_name,
                volume: mount.volume_name,
            });
        }

        let rewrite = VolumeRewriter::new(&self.rules).rewrite(manifest);
        let cleanup = OrphanCleaner::new(&self.rules).sweep(manifest);
        Ok((rewrite, cleanup))
    }

    /// Process one manifest file in place. Claim manifests are deleted
    /// only when no sibling pod manifest still declares the claim.
    pub fn process_file(&self, path: &Path) -> Result<ManifestReport> {
        let dir = parent_dir(path);
        let (mut report, mut claimed) = self.rewrite_file(path)?;

        for sibling in self.pod_manifests(dir)? {
            if sibling.file_name() == path.file_name() {
                continue;
            }
            if let Ok(manifest) = PodManifest::load(&sibling) {
                claimed.extend(claimed_names(&manifest));
            }
        }

        self.delete_orphans(dir, &mut report, &claimed, &mut HashSet::new())?;
        Ok(report)
    }

    /// Rewrite and save one manifest. Returns the report together with the
    /// claims the manifest still declares afterwards.
    fn rewrite_file(&self, path: &Path) -> Result<(ManifestReport, HashSet<String>)> {
        let mut manifest = PodManifest::load(path)?;
        debug!(
            "Loaded {} '{}' from {}",
            manifest.kind(),
            manifest.name().unwrap_or("<unnamed>"),
            path.display()
        );
        let (rewrite, cleanup) = self.rewrite_in_memory(&mut manifest)?;

        let mut report = ManifestReport {
            path: path.to_path_buf(),
            rewrite,
            cleanup,
            deleted_artifacts: Vec::new(),
            written: false,
        };

        if report.changed() && !self.dry_run {
            manifest.save()?;
            report.written = true;
            info!("Patched {}", path.display());
        }

        Ok((report, claimed_names(&manifest)))
    }

    /// Delete the claim manifests of volumes this manifest dropped, skipping
    /// claims still declared in `claimed` and names already in `handled`.
    fn delete_orphans(
        &self,
        dir: &Path,
        report: &mut ManifestReport,
        claimed: &HashSet<String>,
        handled: &mut HashSet<String>,
    ) -> Result<()> {
        let artifacts = ClaimArtifacts::new(
            dir,
            self.output.claim_suffix.clone(),
            self.output.claim_extensions.clone(),
        );
        let removed: Vec<String> = report.removed_volumes().map(|v| v.name.clone()).collect();
        for name in removed {
            if claimed.contains(&name) {
                debug!("Keeping claim '{}': still mounted by another manifest", name);
                continue;
            }
            if !handled.insert(name.clone()) {
                continue;
            }
            let deleted = if self.dry_run {
                artifacts.existing(&name)
            } else {
                artifacts.delete(&name)?
            };
            report.deleted_artifacts.extend(deleted);
        }
        Ok(())
    }

    /// Pod manifests directly inside `dir`, sorted by file name
    pub fn pod_manifests(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut manifests = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if self.output.is_pod_manifest(&name) {
                manifests.push(entry.into_path());
            }
        }
        Ok(manifests)
    }

    /// Process every pod manifest in a directory. Only failing to list the
    /// directory is an error; per-manifest failures are recorded.
    ///
    /// Every manifest is rewritten before any claim manifest is deleted, so
    /// a claim shared between pods survives while one of them keeps it.
    pub fn process_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        let paths = self.pod_manifests(dir)?;
        if paths.is_empty() {
            warn!("No pod manifests found in {}", dir.display());
        }

        let mut claimed = HashSet::new();
        let mut manifests = Vec::with_capacity(paths.len());
        for path in paths {
            let outcome = match self.rewrite_file(&path) {
                Ok((report, claims)) => {
                    claimed.extend(claims);
                    ManifestOutcome::Processed(report)
                }
                Err(e) => {
                    error!("Skipping {}: {}", path.display(), e);
                    // A manifest left untouched still holds its claims
                    if let Ok(manifest) = PodManifest::load(&path) {
                        claimed.extend(claimed_names(&manifest));
                    }
                    failed(path, &e)
                }
            };
            manifests.push(outcome);
        }

        let mut handled = HashSet::new();
        for outcome in &mut manifests {
            let ManifestOutcome::Processed(report) = outcome else {
                continue;
            };
            if let Err(e) = self.delete_orphans(dir, report, &claimed, &mut handled) {
                let path = report.path.clone();
                error!("Failed to delete claim manifests for {}: {}", path.display(), e);
                *outcome = failed(path, &e);
            }
        }

        Ok(DirectoryReport {
            directory: dir.to_path_buf(),
            manifests,
        })
    }
}

fn failed(path: PathBuf, e: &Error) -> ManifestOutcome {
    ManifestOutcome::Failed {
        path,
        kind: e.kind().to_string(),
        message: e.to_string(),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Volume and claim names of every PVC volume a manifest declares
fn claimed_names(manifest: &PodManifest) -> HashSet<String> {
    manifest
        .volumes()
        .into_iter()
        .filter_map(|volume| match volume.source {
            VolumeSource::PersistentVolumeClaim { claim_name } => Some([volume.name, claim_name]),
            _ => None,
        })
        .flatten()
        .collect()
}
