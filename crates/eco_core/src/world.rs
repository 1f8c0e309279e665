//! World-level tunables shared by every system.

use serde::{Deserialize, Serialize};

use crate::config::EcosystemConfig;

/// Tunables read by systems through an explicit `&Globals` argument.
///
/// Only the regime controller and the performance governor write these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Globals {
    /// Speeds up resource regrowth.
    pub fertility: f32,
    /// Scales every creature's base energy drain.
    pub metabolism_multiplier: f32,
    /// Smoothed environmental stress in `[0, 1]`.
    pub storminess: f32,
    /// Energy an agent needs before it can reproduce.
    pub reproduction_threshold: f32,
    /// Constant bias toward storms.
    pub chaos_level: f32,
    /// Visual effect budget in `(0, 1]`.
    pub effect_quality: f32,
    /// Heavy systems run every `update_stride` ticks.
    pub update_stride: u32,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            fertility: 0.6,
            metabolism_multiplier: 1.0,
            storminess: 0.0,
            reproduction_threshold: 1.6,
            chaos_level: 0.35,
            effect_quality: 1.0,
            update_stride: 1,
        }
    }
}

impl Globals {
    /// Starting tunables for a configured world.
    #[must_use]
    pub fn from_config(config: &EcosystemConfig) -> Self {
        Self {
            fertility: config.ecology.fertility,
            chaos_level: config.ecology.chaos_level,
            ..Self::default()
        }
    }
}

/// Coarse environmental state derived from storminess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Normal conditions.
    #[default]
    Calm,
    /// High stress; creatures burn energy faster.
    Storm,
}

impl Regime {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Regime::Calm => "calm",
            Regime::Storm => "storm",
        }
    }
}

/// Lowest accepted zoom factor.
pub const MIN_ZOOM: f32 = 0.3;
/// Highest accepted zoom factor.
pub const MAX_ZOOM: f32 = 4.0;

/// Viewer camera, carried through snapshots for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Zoom factor within `[MIN_ZOOM, MAX_ZOOM]`.
    pub zoom: f32,
    /// Centre x.
    pub x: f32,
    /// Centre y.
    pub y: f32,
}

impl Camera {
    /// Camera centred on a world of the given size.
    #[must_use]
    pub fn centered(width: f32, height: f32) -> Self {
        Self {
            zoom: 1.0,
            x: width / 2.0,
            y: height / 2.0,
        }
    }

    /// Set the zoom, clamped. Non-finite values are ignored.
    pub fn set_zoom(&mut self, value: f32) {
        if value.is_finite() {
            self.zoom = value.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Move the centre. Ignored unless both coordinates are finite.
    pub fn set_center(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.x = x;
            self.y = y;
        }
    }
}
