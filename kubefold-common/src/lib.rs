//! Common types and utilities shared between kubefold-engine and kubefold-cli

pub mod classify;

use std::path::PathBuf;

pub use classify::{classify, ClassificationRules, ManagedKind, ManagedTarget};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed manifest {path}: {reason}")]
    MalformedManifest { path: PathBuf, reason: String },

    #[error("Unresolved mount reference in {path}: container '{container}' mounts unknown volume '{volume}'")]
    UnresolvedMountReference {
        path: PathBuf,
        container: String,
        volume: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("No compose source found in {0}")]
    NoComposeSource(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedManifest { .. } => "MalformedManifest",
            Self::UnresolvedMountReference { .. } => "UnresolvedMountReference",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Tool { .. } => "Tool",
            Self::NoComposeSource(_) => "NoComposeSource",
            Self::Io(_) => "Io",
            Self::Yaml(_) => "Yaml",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        let err = Error::MalformedManifest {
            path: PathBuf::from("web-pod.yaml"),
            reason: "bad indent".to_string(),
        };
        assert_eq!(err.kind(), "MalformedManifest");
        assert!(err.to_string().contains("web-pod.yaml"));

        let err = Error::UnresolvedMountReference {
            path: PathBuf::from("db-pod.yaml"),
            container: "db".to_string(),
            volume: "ghost".to_string(),
        };
        assert_eq!(err.kind(), "UnresolvedMountReference");
        assert!(err.to_string().contains("'ghost'"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.kind(), "Io");
    }
}
