//! Configuration management for kubefold
//!
//! Settings are layered, lowest priority first:
//! 1. Default values
//! 2. Configuration file (TOML format)
//! 3. Environment variables
//!
//! Command-line flags are applied on top by the CLI.

use crate::logging::LoggingConfig;
use kubefold_common::ClassificationRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration struct for kubefold
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// External tool configuration
    pub tools: ToolsConfig,
    /// Generated manifest layout
    pub output: OutputConfig,
    /// Managed file extensions
    pub classification: ClassificationRules,
    /// Compose folder discovery
    pub discovery: DiscoveryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Compose-to-manifest converter binary
    pub kompose_bin: String,
    /// Cluster CLI used to render ConfigMaps and Secrets
    pub kubectl_bin: String,
    /// Extra arguments passed to `kompose convert`
    pub kompose_args: Vec<String>,
}

/// Generated manifest layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory name, relative to each compose folder
    pub dir_name: String,
    /// File name suffixes identifying pod-bearing manifests
    pub pod_manifest_suffixes: Vec<String>,
    /// Suffix of standalone claim manifests, after the volume name
    pub claim_suffix: String,
    /// Extensions tried when looking up claim manifests
    pub claim_extensions: Vec<String>,
}

/// Compose folder discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File names recognized as compose sources
    pub compose_file_names: Vec<String>,
    /// Maximum directory depth to descend
    pub max_depth: usize,
    /// Directory names never descended into
    pub skip_dirs: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            kompose_bin: "kompose".to_string(),
            kubectl_bin: "kubectl".to_string(),
            kompose_args: Vec::new(),
        }
    }
}

/// Lowercased kinds whose converter output carries a pod spec, as they
/// appear in generated file names (`web-deployment.yaml`)
const POD_BEARING_KINDS: &[&str] = &[
    "pod",
    "deployment",
    "statefulset",
    "daemonset",
    "replicaset",
    "replicationcontroller",
    "job",
    "cronjob",
];

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir_name: "k8s".to_string(),
            pod_manifest_suffixes: POD_BEARING_KINDS
                .iter()
                .flat_map(|kind| ["yaml", "yml"].map(|ext| format!("-{}.{}", kind, ext)))
                .collect(),
            claim_suffix: "-persistentvolumeclaim".to_string(),
            claim_extensions: vec!["yaml".to_string(), "yml".to_string()],
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            compose_file_names: vec![
                "compose.yaml".to_string(),
                "compose.yml".to_string(),
                "docker-compose.yaml".to_string(),
                "docker-compose.yml".to_string(),
            ],
            max_depth: 8,
            skip_dirs: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
            ],
        }
    }
}

impl OutputConfig {
    /// Whether a file name looks like a generated pod manifest
    pub fn is_pod_manifest(&self, file_name: &str) -> bool {
        self.pod_manifest_suffixes
            .iter()
            .any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

impl EngineConfig {
    /// Load configuration from environment variables and the first config
    /// file found. An explicit path must exist and parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::find_config_file() {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Environment variable override
            std::env::var("KUBEFOLD_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("./kubefold.toml")),
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config/kubefold/config.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Tools
        if let Ok(bin) = std::env::var("KUBEFOLD_KOMPOSE_BIN") {
            self.tools.kompose_bin = bin;
        }
        if let Ok(bin) = std::env::var("KUBEFOLD_KUBECTL_BIN") {
            self.tools.kubectl_bin = bin;
        }

        // Output
        if let Ok(dir) = std::env::var("KUBEFOLD_OUTPUT_DIR") {
            self.output.dir_name = dir;
        }

        // Discovery
        if let Ok(depth) = std::env::var("KUBEFOLD_MAX_DEPTH") {
            if let Ok(depth) = depth.parse() {
                self.discovery.max_depth = depth;
            }
        }

        // Logging
        if let Ok(level) = std::env::var("KUBEFOLD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(dir) = std::env::var("KUBEFOLD_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        if let Ok(json) = std::env::var("KUBEFOLD_LOG_JSON") {
            if let Ok(json) = json.parse() {
                self.logging.json = json;
            }
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tools.kompose_bin.trim().is_empty() {
            return Err(ConfigError::Validation("kompose_bin cannot be empty".to_string()));
        }
        if self.tools.kubectl_bin.trim().is_empty() {
            return Err(ConfigError::Validation("kubectl_bin cannot be empty".to_string()));
        }

        if self.output.dir_name.trim().is_empty() {
            return Err(ConfigError::Validation("output dir_name cannot be empty".to_string()));
        }
        if self.output.pod_manifest_suffixes.is_empty() {
            return Err(ConfigError::Validation(
                "at least one pod manifest suffix is required".to_string(),
            ));
        }
        if self.output.claim_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "at least one claim extension is required".to_string(),
            ));
        }

        if self.discovery.compose_file_names.is_empty() {
            return Err(ConfigError::Validation(
                "at least one compose file name is required".to_string(),
            ));
        }

        let rules = &self.classification;
        for ext in rules.config_extensions.iter().chain(&rules.secret_extensions) {
            if ext.is_empty() || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "classification extension '{}' must be non-empty and without dots",
                    ext
                )));
            }
        }
        if let Some(ext) = rules
            .config_extensions
            .iter()
            .find(|e| rules.secret_extensions.contains(e))
        {
            return Err(ConfigError::Validation(format!(
                "extension '{}' is listed as both config and secret",
                ext
            )));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),
    /// Failed to parse configuration
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Configuration validation failed
    #[error("Config validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for kubefold_common::Error {
    fn from(err: ConfigError) -> Self {
        kubefold_common::Error::InvalidConfig(err.to_string())
    }
}
