//! Per-folder conversion pipeline
//!
//! For each compose folder, strictly in sequence:
//! 1. convert the compose file into manifests (kompose)
//! 2. render a ConfigMap/Secret manifest for each managed file (kubectl)
//! 3. run the volume rewrite pass over the generated pod manifests
//!
//! A failing step aborts its folder only; other folders still run.

use crate::config::EngineConfig;
use crate::discovery::{self, ComposeFolder, ManagedFile};
use crate::rewrite::{DirectoryReport, ManifestProcessor};
use crate::tools::{self, kompose, kubectl};
use kubefold_common::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};

/// Everything done for one folder
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub folder: ComposeFolder,
    pub output_dir: PathBuf,
    /// ConfigMap/Secret manifests written (planned, in a dry run)
    pub generated: Vec<PathBuf>,
    pub rewrite: DirectoryReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FolderOutcome {
    Completed(FolderReport),
    Failed {
        folder: PathBuf,
        kind: String,
        message: String,
    },
}

/// Result of a whole run over a root directory
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub folders: Vec<FolderOutcome>,
}

impl RunReport {
    /// Failed folders plus failed manifests inside completed folders
    pub fn failures(&self) -> usize {
        self.folders
            .iter()
            .map(|f| match f {
                FolderOutcome::Completed(report) => report.rewrite.failures(),
                FolderOutcome::Failed { .. } => 1,
            })
            .sum()
    }
}

pub struct Pipeline {
    config: EngineConfig,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    /// Skip the external tools and report what the rewrite pass would do
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check that both external tools can be found
    pub fn preflight(&self) -> Result<()> {
        tools::locate(&self.config.tools.kompose_bin)?;
        tools::locate(&self.config.tools.kubectl_bin)?;
        Ok(())
    }

    fn processor(&self) -> ManifestProcessor {
        ManifestProcessor::new(
            self.config.classification.clone(),
            self.config.output.clone(),
        )
        .with_dry_run(self.dry_run)
    }

    /// Discover compose folders under `root` and run each one
    pub async fn run(&self, root: &Path) -> Result<RunReport> {
        if !self.dry_run {
            self.preflight()?;
        }

        let folders = discovery::discover(
            root,
            &self.config.discovery,
            &self.config.output.dir_name,
        )?;
        info!("Found {} compose folder(s) under {}", folders.len(), root.display());

        let mut outcomes = Vec::with_capacity(folders.len());
        for folder in folders {
            let span = info_span!("folder", dir = %folder.dir.display());
            let outcome = match self.run_folder(&folder).instrument(span).await {
                Ok(report) => FolderOutcome::Completed(report),
                Err(e) => {
                    error!("Folder {} failed: {}", folder.dir.display(), e);
                    FolderOutcome::Failed {
                        folder: folder.dir.clone(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(RunReport {
            root: root.to_path_buf(),
            folders: outcomes,
        })
    }

    /// Run all steps for one folder, stopping at the first failure
    pub async fn run_folder(&self, folder: &ComposeFolder) -> Result<FolderReport> {
        let output_dir = folder.dir.join(&self.config.output.dir_name);
        let managed = discovery::managed_files(&folder.dir, &self.config.classification)?;
        for (kept, clash) in colliding_targets(&managed) {
            warn!(
                "{} and {} both map to '{}'; the manifest of the later one wins",
                kept.path.display(),
                clash.path.display(),
                clash.target.name
            );
        }

        let generated = if self.dry_run {
            managed
                .iter()
                .map(|file| kubectl::manifest_path(&output_dir, &file.target))
                .collect()
        } else {
            kompose::convert(&self.config.tools, &folder.compose_file, &output_dir).await?;
            self.generate(&managed, &output_dir).await?
        };

        let rewrite = if output_dir.is_dir() {
            self.processor().process_directory(&output_dir)?
        } else {
            DirectoryReport {
                directory: output_dir.clone(),
                manifests: Vec::new(),
            }
        };

        Ok(FolderReport {
            folder: folder.clone(),
            output_dir,
            generated,
            rewrite,
        })
    }

    async fn generate(&self, managed: &[ManagedFile], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(managed.len());
        for file in managed {
            let manifest =
                kubectl::generate(&self.config.tools, &file.target, &file.path, output_dir).await?;
            written.push(manifest.path);
        }
        Ok(written)
    }
}

/// Pairs of managed files in one folder that produce the same ConfigMap or
/// Secret name, as (first seen, later)
fn colliding_targets(managed: &[ManagedFile]) -> Vec<(&ManagedFile, &ManagedFile)> {
    let mut seen: HashMap<&str, &ManagedFile> = HashMap::new();
    let mut collisions = Vec::new();
    for file in managed {
        match seen.get(file.target.name.as_str()) {
            Some(first) => collisions.push((*first, file)),
            None => {
                seen.insert(&file.target.name, file);
            }
        }
    }
    collisions
}
