//! Calm/storm regime controller.
//!
//! Storminess drifts toward a target driven by food scarcity, herbivore
//! pressure and the chaos bias, and feeds back into metabolism and the
//! agent breeding threshold.

use crate::species::Species;
use crate::store::EntityStore;
use crate::world::{Globals, Regime};

/// Storminess above which the world is in a storm.
pub const STORM_THRESHOLD: f32 = 0.55;

/// Fraction of the gap to the target closed per tick.
pub const SMOOTHING: f32 = 0.05;

/// Agent count that counts as one unit of grazing pressure.
pub const PRESSURE_SCALE: f32 = 80.0;

/// Update the regime tunables in `globals` and return the new regime.
pub fn regime_system(store: &EntityStore, globals: &mut Globals) -> Regime {
    let (total, count) = store
        .resources
        .iter()
        .fold((0.0_f32, 0_usize), |(sum, n), (_, r)| (sum + r.amount, n + 1));
    let avg_amount = if count > 0 { total / count as f32 } else { 0.0 };

    let scarcity = if avg_amount < 0.5 {
        (0.5 - avg_amount) * 2.0
    } else {
        0.0
    };
    let pressure = store.count(Species::Agent) as f32 / PRESSURE_SCALE;
    let chaos = globals.chaos_level;
    let target = (0.6 * scarcity + 0.25 * pressure + 0.45 * chaos).clamp(0.0, 1.0);

    globals.storminess += (target - globals.storminess) * SMOOTHING;
    globals.metabolism_multiplier = 1.0 + 1.5 * globals.storminess + 0.25 * chaos;
    globals.reproduction_threshold = 1.6 - 0.15 * chaos;

    if globals.storminess > STORM_THRESHOLD {
        Regime::Storm
    } else {
        Regime::Calm
    }
}
