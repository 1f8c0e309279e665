//! Test fixtures and helpers.
//!
//! Hand-built worlds, a scripted random source, and RON scenario files for
//! consistent testing.

use std::collections::VecDeque;

use eco_core::components::{EntityId, ResourceKind};
use eco_core::config::EcosystemConfig;
use eco_core::math::Vec2;
use eco_core::random::RandomSource;
use eco_core::simulation::Simulation;
use eco_core::species::Species;
use serde::Deserialize;

/// Fixed step used by the runtime.
pub const DT: f32 = 0.06;

/// Random source that replays a scripted sequence of floats.
///
/// Once the script is exhausted the fallback value is returned forever.
/// `int(lo, hi)` maps the next float onto the inclusive range.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    script: VecDeque<f32>,
    fallback: f32,
    draws: usize,
}

impl ScriptedRandom {
    /// Replay `values`, then return `fallback`.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            script: values.into_iter().collect(),
            fallback,
            draws: 0,
        }
    }

    /// Always return `value`.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self::new(std::iter::empty(), value)
    }

    /// Number of draws taken so far.
    #[must_use]
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for ScriptedRandom {
    fn float(&mut self) -> f32 {
        self.draws += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn int(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as f32;
        let offset = (self.float() * span).floor() as i32;
        lo + offset.clamp(0, hi - lo)
    }
}

/// Config with no initial population, for hand-built scenarios.
#[must_use]
pub fn empty_config() -> EcosystemConfig {
    let mut config = EcosystemConfig::default();
    let p = &mut config.population;
    p.agents = 0;
    p.predators = 0;
    p.apex = 0;
    p.coral = 0;
    p.titans = 0;
    p.resources = 0;
    config
}

/// Config with a small mixed population.
#[must_use]
pub fn small_config() -> EcosystemConfig {
    let mut config = EcosystemConfig::default();
    let p = &mut config.population;
    p.agents = 24;
    p.predators = 8;
    p.apex = 3;
    p.coral = 4;
    p.titans = 1;
    p.resources = 70;
    config
}

/// A world with nothing in it.
#[must_use]
pub fn empty_sim(seed: u64) -> Simulation {
    Simulation::empty(empty_config(), seed)
}

/// A small populated world.
#[must_use]
pub fn small_sim(seed: u64) -> Simulation {
    Simulation::new(small_config(), seed)
}

/// Spawn a creature and set its energy. Returns its id.
pub fn place_creature(sim: &mut Simulation, species: Species, at: Vec2, energy: f32) -> EntityId {
    let id = sim.spawn_creature(species, at);
    if let Some(creature) = sim.store_mut().creatures.get_mut(id) {
        creature.energy = energy;
    }
    id
}

/// Spawn a resource and set its amount. Returns its id.
pub fn place_resource(sim: &mut Simulation, kind: ResourceKind, at: Vec2, amount: f32) -> EntityId {
    let id = sim.spawn_resource(kind, at);
    if let Some(resource) = sim.store_mut().resources.get_mut(id) {
        resource.amount = amount;
    }
    id
}

/// Stop a creature in place so steering and physics do not move it far.
pub fn freeze(sim: &mut Simulation, id: EntityId) {
    if let Some(velocity) = sim.store_mut().velocities.get_mut(id) {
        velocity.value = Vec2::ZERO;
    }
}

/// A world holding `creatures` agents spread over the map.
#[must_use]
pub fn crowded_sim(creatures: u32, seed: u64) -> Simulation {
    let mut config = empty_config();
    config.population.agents = creatures;
    Simulation::new(config, seed)
}

/// One creature in a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct CreaturePlacement {
    /// Species to spawn.
    pub species: Species,
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Starting energy; species default if absent.
    #[serde(default)]
    pub energy: Option<f32>,
}

/// One resource in a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcePlacement {
    /// Plant or pod.
    pub kind: ResourceKind,
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Starting amount.
    #[serde(default = "full_amount")]
    pub amount: f32,
}

fn full_amount() -> f32 {
    1.0
}

/// A hand-placed world described in RON.
///
/// ```
/// use eco_test_utils::fixtures::Scenario;
///
/// let scenario = Scenario::from_ron(
///     "(seed: 3, creatures: [(species: agent, x: 10.0, y: 10.0)], resources: [])",
/// )
/// .unwrap();
/// let sim = scenario.build();
/// assert_eq!(sim.store().creature_count(), 1);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// World seed.
    pub seed: u64,
    /// World size and tunables; population counts are ignored.
    #[serde(default)]
    pub config: EcosystemConfig,
    /// Creatures to place.
    #[serde(default)]
    pub creatures: Vec<CreaturePlacement>,
    /// Resources to place.
    #[serde(default)]
    pub resources: Vec<ResourcePlacement>,
}

impl Scenario {
    /// Parse a scenario from RON.
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Build the world.
    #[must_use]
    pub fn build(&self) -> Simulation {
        let mut sim = Simulation::empty(self.config.clone(), self.seed);
        for c in &self.creatures {
            let id = sim.spawn_creature(c.species, Vec2::new(c.x, c.y));
            if let Some(energy) = c.energy {
                if let Some(creature) = sim.store_mut().creatures.get_mut(id) {
                    creature.energy = energy;
                }
            }
        }
        for r in &self.resources {
            place_resource(&mut sim, r.kind, Vec2::new(r.x, r.y), r.amount);
        }
        tracing::debug!(
            creatures = self.creatures.len(),
            resources = self.resources.len(),
            "Built scenario"
        );
        sim
    }
}
