//! Runner settings.

use std::path::{Path, PathBuf};

use eco_core::config::EcosystemConfig;

use crate::error::Result;

/// Settings for one interactive session.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessConfig {
    /// RON file overriding the default world config.
    pub config_path: Option<PathBuf>,
    /// World seed.
    pub seed: u64,
    /// Wall-clock frame period of the owner loop, in milliseconds.
    pub frame_ms: u64,
    /// Stop after this many frames. 0 runs until `quit`.
    pub max_frames: u64,
    /// Start with ticks suspended.
    pub start_paused: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            seed: 1,
            frame_ms: 16,
            max_frames: 0,
            start_paused: false,
        }
    }
}

impl HeadlessConfig {
    /// Load the world config, falling back to defaults when no path is set.
    pub fn ecosystem(&self) -> Result<EcosystemConfig> {
        load_ecosystem(self.config_path.as_deref())
    }
}

/// Load and validate a world config file, or return the defaults.
pub fn load_ecosystem(path: Option<&Path>) -> Result<EcosystemConfig> {
    let Some(path) = path else {
        return Ok(EcosystemConfig::default());
    };
    let config = EcosystemConfig::load(path)?;
    tracing::info!(path = %path.display(), "Loaded world config");
    Ok(config)
}
