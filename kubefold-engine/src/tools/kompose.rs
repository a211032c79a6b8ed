//! Compose-to-manifest conversion
//!
//! Uses the kompose CLI to produce the initial manifest set.

use super::run;
use crate::config::ToolsConfig;
use kubefold_common::Result;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Build the `kompose convert` invocation
pub fn convert_command(tools: &ToolsConfig, compose_file: &Path, output_dir: &Path) -> Command {
    let mut cmd = Command::new(&tools.kompose_bin);
    cmd.arg("convert")
        .arg("--file")
        .arg(compose_file)
        .arg("--out")
        // Trailing separator makes kompose treat the target as a directory.
        .arg(format!("{}/", output_dir.display()))
        .args(&tools.kompose_args);

    if let Some(folder) = compose_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        cmd.current_dir(folder);
    }
    cmd
}

/// Convert a compose file into manifests under `output_dir`
pub async fn convert(tools: &ToolsConfig, compose_file: &Path, output_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(output_dir).await?;

    let mut cmd = convert_command(tools, compose_file, output_dir);
    run(&tools.kompose_bin, &mut cmd).await?;

    info!(
        "Converted {} into {}",
        compose_file.display(),
        output_dir.display()
    );
    Ok(())
}
