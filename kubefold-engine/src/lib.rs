//! Kubefold engine library
//!
//! Turns compose projects into Kubernetes manifests whose config and
//! credential files are served from ConfigMaps and Secrets instead of
//! persistent volume claims.

// Core modules
pub mod config;
pub mod logging;

// Manifest rewriting
pub mod manifest;
pub mod rewrite;

// External collaborators and orchestration
pub mod discovery;
pub mod pipeline;
pub mod tools;

pub use config::EngineConfig;
pub use kubefold_common::{Error, Result};
pub use manifest::PodManifest;
pub use pipeline::Pipeline;
pub use rewrite::ManifestProcessor;
