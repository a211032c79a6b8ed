//! CLI configuration management
//!
//! Resolves the engine configuration and layers command-line flags on top.

use anyhow::{Context, Result};
use kubefold_engine::EngineConfig;
use std::path::Path;

/// Flags that take precedence over the file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub kompose_bin: Option<String>,
    pub kubectl_bin: Option<String>,
    pub output_dir: Option<String>,
    pub verbose: u8,
}

impl Overrides {
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(bin) = &self.kompose_bin {
            config.tools.kompose_bin = bin.clone();
        }
        if let Some(bin) = &self.kubectl_bin {
            config.tools.kubectl_bin = bin.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir_name = dir.clone();
        }
        config.logging = config.logging.clone().with_verbosity(self.verbose);
    }
}

/// Load the configuration file (or defaults) and apply command-line flags
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(path).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config
        .validate()
        .context("Invalid configuration after applying command-line flags")?;
    Ok(config)
}
