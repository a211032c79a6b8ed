//! External tool invocation
//!
//! Thin wrappers over the compose converter and the cluster CLI. Every call
//! is awaited to completion and its exit status checked before continuing.

pub mod kompose;
pub mod kubectl;

use kubefold_common::{Error, Result};
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Resolve a tool binary on `PATH` (or as a path)
pub fn locate(bin: &str) -> Result<PathBuf> {
    which::which(bin).map_err(|e| Error::Tool {
        tool: bin.to_string(),
        message: format!("not found: {}", e),
    })
}

/// Run a prepared command and fail on a non-zero exit status
pub(crate) async fn run(tool: &str, cmd: &mut Command) -> Result<Output> {
    debug!("Running {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| Error::Tool {
        tool: tool.to_string(),
        message: format!("failed to run: {}", e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Tool {
            tool: tool.to_string(),
            message: format!("exited with {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(output)
}
