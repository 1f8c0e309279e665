//! World configuration.
//!
//! [`EcosystemConfig::default`] reproduces the stock world. Any subset of
//! fields can be overridden from a RON file; missing fields fall back to
//! their defaults.
//!
//! ```
//! use eco_core::config::EcosystemConfig;
//!
//! let config = EcosystemConfig::from_ron_str("(world: (width: 800.0, height: 600.0))").unwrap();
//! assert_eq!(config.world.width, 800.0);
//! assert_eq!(config.population.agents, 88);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcoError, Result};

/// Complete configuration for one simulated world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EcosystemConfig {
    /// World dimensions and spatial grid.
    pub world: WorldConfig,
    /// Initial population sizes.
    pub population: PopulationConfig,
    /// Resource growth limits and starting tunables.
    pub ecology: EcologyConfig,
    /// Fixed-step and snapshot timing.
    pub timing: TimingConfig,
}

/// World dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World width in units.
    pub width: f32,
    /// World height in units.
    pub height: f32,
    /// Side length of a spatial grid cell.
    pub cell_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2400.0,
            height: 1440.0,
            cell_size: 48.0,
        }
    }
}

/// Number of entities of each kind created for a fresh world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Herbivores.
    pub agents: u32,
    /// Predators.
    pub predators: u32,
    /// Apex predators.
    pub apex: u32,
    /// Venomous coral hunters.
    pub coral: u32,
    /// Titans.
    pub titans: u32,
    /// Plants and pods combined.
    pub resources: u32,
    /// Fraction of initial resources created as pods.
    pub pod_fraction: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            agents: 88,
            predators: 28,
            apex: 12,
            coral: 16,
            titans: 4,
            resources: 280,
            pod_fraction: 0.2,
        }
    }
}

/// Ecology caps and initial world tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcologyConfig {
    /// Global cap on pod-kind resources.
    pub max_pods: u32,
    /// Per-pod cap on explosions.
    pub max_pod_cycles: u32,
    /// Starting fertility.
    pub fertility: f32,
    /// Starting chaos bias for the regime controller.
    pub chaos_level: f32,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            max_pods: 80,
            max_pod_cycles: 3,
            fertility: 0.6,
            chaos_level: 0.35,
        }
    }
}

/// Timing of the fixed-step loop and snapshot publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Logical duration of one tick in seconds.
    pub fixed_dt: f32,
    /// Longest wall-clock frame fed into the accumulator, in milliseconds.
    pub max_frame_ms: f64,
    /// Most steps run for one frame.
    pub max_steps_per_frame: u32,
    /// Interval between forced full snapshots, in milliseconds.
    pub full_resync_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 0.06,
            max_frame_ms: 200.0,
            max_steps_per_frame: 8,
            full_resync_ms: 2000.0,
        }
    }
}

impl EcosystemConfig {
    /// Parse and validate a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| EcoError::ConfigParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| EcoError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| EcoError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable by the simulation.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EcoError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        };
        positive("world.width", self.world.width)?;
        positive("world.height", self.world.height)?;
        positive("world.cell_size", self.world.cell_size)?;
        positive("timing.fixed_dt", self.timing.fixed_dt)?;
        if !(0.0..=1.0).contains(&self.population.pod_fraction) {
            return Err(EcoError::InvalidConfig(format!(
                "population.pod_fraction must be within [0, 1], got {}",
                self.population.pod_fraction
            )));
        }
        if self.timing.max_steps_per_frame == 0 {
            return Err(EcoError::InvalidConfig(
                "timing.max_steps_per_frame must be at least 1".to_string(),
            ));
        }
        let usable = |ms: f64| ms.is_finite() && ms > 0.0;
        if !usable(self.timing.max_frame_ms) || !usable(self.timing.full_resync_ms) {
            return Err(EcoError::InvalidConfig(
                "timing intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
