//! Closed-loop performance governor.
//!
//! The governor watches how long steps take and how many creatures are
//! alive, and trades fidelity for speed when either grows: heavy systems
//! run less often, fewer particles are spawned and snapshots go out less
//! frequently.

use serde::{Deserialize, Serialize};

use crate::world::Globals;

/// Weight of the previous average in the step-time EMA.
const EMA_KEEP: f64 = 0.9;

/// Load band chosen from creature count and average step time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBand {
    /// Full fidelity.
    #[default]
    Normal,
    /// Moderate load.
    Medium,
    /// Heavy load.
    High,
}

impl LoadBand {
    /// Pick a band. No hysteresis: the band follows the inputs directly.
    #[must_use]
    pub fn classify(creatures: usize, avg_step_ms: f64) -> Self {
        if creatures > 9000 || avg_step_ms > 12.0 {
            Self::High
        } else if creatures > 4500 || avg_step_ms > 6.0 {
            Self::Medium
        } else {
            Self::Normal
        }
    }

    /// Heavy systems run every `update_stride` ticks.
    #[must_use]
    pub const fn update_stride(self) -> u32 {
        match self {
            Self::Normal => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Effect quality in `(0, 1]`.
    #[must_use]
    pub const fn effect_quality(self) -> f32 {
        match self {
            Self::Normal => 1.0,
            Self::Medium => 0.6,
            Self::High => 0.35,
        }
    }

    /// Minimum time between snapshot messages.
    #[must_use]
    pub const fn snapshot_interval_ms(self) -> f64 {
        match self {
            Self::Normal => 50.0,
            Self::Medium => 80.0,
            Self::High => 120.0,
        }
    }
}

/// Step-time tracker and band selector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Governor {
    avg_step_ms: f64,
    band: LoadBand,
}

impl Governor {
    /// A governor with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exponential moving average of step duration.
    #[must_use]
    pub fn avg_step_ms(&self) -> f64 {
        self.avg_step_ms
    }

    /// Band chosen by the last observation.
    #[must_use]
    pub fn band(&self) -> LoadBand {
        self.band
    }

    /// Current minimum snapshot interval.
    #[must_use]
    pub fn snapshot_interval_ms(&self) -> f64 {
        self.band.snapshot_interval_ms()
    }

    /// Fold one step measurement into the average, pick a band and apply its
    /// stride and effect quality to `globals`.
    pub fn observe(&mut self, step_ms: f64, creatures: usize, globals: &mut Globals) -> LoadBand {
        if step_ms.is_finite() && step_ms >= 0.0 {
            self.avg_step_ms = self.avg_step_ms * EMA_KEEP + step_ms * (1.0 - EMA_KEEP);
        }
        let band = LoadBand::classify(creatures, self.avg_step_ms);
        if band != self.band {
            tracing::debug!(
                from = ?self.band,
                to = ?band,
                avg_step_ms = self.avg_step_ms,
                creatures,
                "Load band changed"
            );
        }
        self.band = band;
        globals.update_stride = band.update_stride();
        globals.effect_quality = band.effect_quality();
        band
    }

    /// Forget history, e.g. after a world reset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
