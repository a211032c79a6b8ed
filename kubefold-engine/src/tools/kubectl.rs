//! ConfigMap / Secret manifest generation
//!
//! Renders one manifest per managed file with
//! `kubectl create ... --dry-run=client -o yaml`; nothing reaches a cluster.

use super::run;
use crate::config::ToolsConfig;
use kubefold_common::{ManagedKind, ManagedTarget, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// A ConfigMap or Secret manifest written to the output directory
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GeneratedManifest {
    pub target: ManagedTarget,
    pub source: PathBuf,
    pub path: PathBuf,
}

/// Output file for a target, `<name>-configmap.yaml` / `<name>-secret.yaml`
pub fn manifest_path(output_dir: &Path, target: &ManagedTarget) -> PathBuf {
    output_dir.join(format!("{}-{}.yaml", target.name, target.kind.manifest_suffix()))
}

/// Build the dry-run `kubectl create` invocation for one file
pub fn create_command(tools: &ToolsConfig, target: &ManagedTarget, source: &Path) -> Command {
    let mut cmd = Command::new(&tools.kubectl_bin);
    cmd.arg("create");
    match target.kind {
        ManagedKind::ConfigMap => cmd.arg("configmap"),
        ManagedKind::Secret => cmd.arg("secret").arg("generic"),
    };
    cmd.arg(&target.name)
        .arg(format!("--from-file={}", source.display()))
        .arg("--dry-run=client")
        .arg("--output=yaml");
    cmd
}

/// Render the manifest for `source` and write it into `output_dir`
pub async fn generate(
    tools: &ToolsConfig,
    target: &ManagedTarget,
    source: &Path,
    output_dir: &Path,
) -> Result<GeneratedManifest> {
    let mut cmd = create_command(tools, target, source);
    let output = run(&tools.kubectl_bin, &mut cmd).await?;

    let path = manifest_path(output_dir, target);
    tokio::fs::write(&path, &output.stdout).await?;
    info!("Created {} manifest {}", target.kind, path.display());

    Ok(GeneratedManifest {
        target: target.clone(),
        source: source.to_path_buf(),
        path,
    })
}
