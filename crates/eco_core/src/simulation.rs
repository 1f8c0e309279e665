//! Core simulation loop.
//!
//! [`Simulation`] owns the entity store, the world tunables and the random
//! source, and runs the systems in a fixed order each step. When every
//! species has died out the world is rebuilt from a derived seed and the
//! step reports the reset so publishers can send a full snapshot.
//!
//! # Example
//!
//! ```
//! use eco_core::config::EcosystemConfig;
//! use eco_core::simulation::Simulation;
//!
//! let mut sim = Simulation::new(EcosystemConfig::default(), 42);
//! let report = sim.step(0.06);
//! assert_eq!(report.tick, 1);
//! assert_eq!(sim.tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::components::{EntityId, ResourceKind};
use crate::config::EcosystemConfig;
use crate::governor::{Governor, LoadBand};
use crate::math::Vec2;
use crate::random::{derive_reset_seed, RandomSource, SeededRandom};
use crate::species::Species;
use crate::store::EntityStore;
use crate::systems::{
    collision_system, ecology::pod_count, ecology_system, force_field_system, lifecycle_system,
    metabolism_system, paint_force_field, physics_system, regime_system, spawn_creature,
    spawn_resource, steering_system, PredationEvent,
};
use crate::world::{Camera, Globals, Regime};

/// Everything that happened during one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Tick reached by this step. Zero when the step ended in a reset.
    pub tick: u64,
    /// Kills made during metabolism.
    pub predations: Vec<PredationEvent>,
    /// Creatures born.
    pub births: Vec<EntityId>,
    /// Creatures that starved.
    pub deaths: Vec<EntityId>,
    /// Plants scattered by pod explosions.
    pub seeded: usize,
    /// True if heavy systems ran this step.
    pub heavy: bool,
    /// True if the world went extinct and was rebuilt.
    pub reset: bool,
}

/// The ecosystem simulation.
///
/// # System Execution Order
///
/// Each step:
/// 1. **Steering**, **Force Field**, **Collision** every `update_stride`
///    ticks, with `dt * update_stride`
/// 2. **Physics**
/// 3. **Metabolism & Predation**
/// 4. **Ecology**
/// 5. **Lifecycle**, including particle decay
/// 6. **Regime**
pub struct Simulation {
    tick: u64,
    seed: u64,
    resets: u64,
    config: EcosystemConfig,
    store: EntityStore,
    globals: Globals,
    regime: Regime,
    camera: Camera,
    governor: Governor,
    rng: Box<dyn RandomSource + Send>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("seed", &self.seed)
            .field("resets", &self.resets)
            .field("creatures", &self.store.creature_count())
            .field("resources", &self.store.resources.len())
            .field("regime", &self.regime)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create a populated world from `config`, seeded with `seed`.
    #[must_use]
    pub fn new(config: EcosystemConfig, seed: u64) -> Self {
        Self::with_random(config, seed, Box::new(SeededRandom::new(seed)))
    }

    /// Create a populated world drawing randomness from `rng`.
    #[must_use]
    pub fn with_random(
        config: EcosystemConfig,
        seed: u64,
        rng: Box<dyn RandomSource + Send>,
    ) -> Self {
        let mut sim = Self::empty_with_random(config, seed, rng);
        sim.populate();
        sim
    }

    /// Create a world with no entities. Useful for hand-built scenarios.
    #[must_use]
    pub fn empty(config: EcosystemConfig, seed: u64) -> Self {
        Self::empty_with_random(config, seed, Box::new(SeededRandom::new(seed)))
    }

    /// Create an empty world drawing randomness from `rng`.
    #[must_use]
    pub fn empty_with_random(
        config: EcosystemConfig,
        seed: u64,
        rng: Box<dyn RandomSource + Send>,
    ) -> Self {
        Self {
            tick: 0,
            seed,
            resets: 0,
            globals: Globals::from_config(&config),
            camera: Camera::centered(config.world.width, config.world.height),
            config,
            store: EntityStore::new(),
            regime: Regime::Calm,
            governor: Governor::new(),
            rng,
        }
    }

    fn populate(&mut self) {
        let population = self.config.population.clone();
        let (width, height) = (self.config.world.width, self.config.world.height);
        let counts = [
            (Species::Agent, population.agents),
            (Species::Predator, population.predators),
            (Species::Apex, population.apex),
            (Species::Coral, population.coral),
            (Species::Titan, population.titans),
        ];
        for (species, count) in counts {
            for _ in 0..count {
                let at = Vec2::new(self.rng.float() * width, self.rng.float() * height);
                spawn_creature(&mut self.store, self.rng.as_mut(), species, at, None);
            }
        }

        let max_pods = self.config.ecology.max_pods as usize;
        let mut pods = 0;
        for _ in 0..population.resources {
            let wants_pod = self.rng.float() < population.pod_fraction;
            let kind = if wants_pod && pods < max_pods {
                pods += 1;
                ResourceKind::Pod
            } else {
                ResourceKind::Plant
            };
            let at = Vec2::new(self.rng.float() * width, self.rng.float() * height);
            spawn_resource(&mut self.store, self.rng.as_mut(), kind, at);
        }
    }

    /// Current tick. Restarts at 0 after a reset.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Seed of the current world.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of extinction resets so far.
    #[must_use]
    pub const fn resets(&self) -> u64 {
        self.resets
    }

    /// World configuration.
    #[must_use]
    pub fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    /// Entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Entity store, mutably. For scenario setup.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// World tunables.
    #[must_use]
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// World tunables, mutably. For scenario setup.
    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    /// Current regime.
    #[must_use]
    pub const fn regime(&self) -> Regime {
        self.regime
    }

    /// Viewer camera.
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Viewer camera, mutably.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Performance governor.
    #[must_use]
    pub const fn governor(&self) -> &Governor {
        &self.governor
    }

    /// Create a creature with fresh traits.
    pub fn spawn_creature(&mut self, species: Species, at: Vec2) -> EntityId {
        spawn_creature(&mut self.store, self.rng.as_mut(), species, at, None)
    }

    /// Create a full resource.
    pub fn spawn_resource(&mut self, kind: ResourceKind, at: Vec2) -> EntityId {
        spawn_resource(&mut self.store, self.rng.as_mut(), kind, at)
    }

    /// Paint a force field. Positive polarity attracts, negative repels.
    pub fn paint_force_field(&mut self, at: Vec2, polarity: f32) -> EntityId {
        paint_force_field(&mut self.store, at, polarity)
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> StepReport {
        self.tick += 1;
        let cell = self.config.world.cell_size;
        let stride = self.globals.update_stride.max(1);
        let heavy = self.tick % u64::from(stride) == 0;

        if heavy {
            let heavy_dt = dt * stride as f32;
            steering_system(&mut self.store, cell, heavy_dt);
            force_field_system(&mut self.store, heavy_dt);
            collision_system(&mut self.store, cell, heavy_dt);
        }

        physics_system(&mut self.store, &self.config.world, dt);
        let predations =
            metabolism_system(&mut self.store, &self.globals, self.rng.as_mut(), cell, dt);
        let seeded = ecology_system(
            &mut self.store,
            &self.globals,
            self.rng.as_mut(),
            &self.config,
            dt,
        );
        let lifecycle = lifecycle_system(
            &mut self.store,
            &self.globals,
            self.rng.as_mut(),
            &self.config.world,
            dt,
        );
        self.regime = regime_system(&self.store, &mut self.globals);

        let mut report = StepReport {
            tick: self.tick,
            predations,
            births: lifecycle.births,
            deaths: lifecycle.deaths,
            seeded,
            heavy,
            reset: false,
        };

        if self.store.is_extinct() {
            self.reset();
            report.tick = self.tick;
            report.reset = true;
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        report
    }

    /// Rebuild the world from a derived seed.
    pub fn reset(&mut self) {
        self.resets += 1;
        let old_seed = self.seed;
        self.seed = derive_reset_seed(old_seed, self.resets);
        self.rng.reseed(self.seed);
        self.tick = 0;
        self.store = EntityStore::new();
        self.globals = Globals::from_config(&self.config);
        self.regime = Regime::Calm;
        self.governor.reset();
        self.populate();
        tracing::info!(
            old_seed,
            new_seed = self.seed,
            resets = self.resets,
            "All species extinct, world reset"
        );
    }

    /// Feed a measured step duration to the governor, which may change the
    /// update stride and effect quality.
    pub fn record_step_time(&mut self, step_ms: f64) -> LoadBand {
        let creatures = self.store.creature_count();
        self.governor.observe(step_ms, creatures, &mut self.globals)
    }

    /// Number of pod-kind resources.
    #[must_use]
    pub fn pod_count(&self) -> usize {
        pod_count(&self.store)
    }

    /// Hash of the simulation state. Equal states hash equally.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.seed.hash(&mut hasher);

        let bits = |v: Vec2, h: &mut DefaultHasher| {
            v.x.to_bits().hash(h);
            v.y.to_bits().hash(h);
        };

        self.store.positions.len().hash(&mut hasher);
        for (id, pos) in self.store.positions.iter() {
            id.hash(&mut hasher);
            bits(pos.value, &mut hasher);
        }
        for (id, vel) in self.store.velocities.iter() {
            id.hash(&mut hasher);
            bits(vel.value, &mut hasher);
        }
        for (id, c) in self.store.creatures.iter() {
            id.hash(&mut hasher);
            c.species.hash(&mut hasher);
            c.energy.to_bits().hash(&mut hasher);
            c.age.to_bits().hash(&mut hasher);
            c.rest.to_bits().hash(&mut hasher);
            c.dna.speed.to_bits().hash(&mut hasher);
            c.dna.sense.to_bits().hash(&mut hasher);
            c.dna.metabolism.to_bits().hash(&mut hasher);
            c.dna.hue_shift.hash(&mut hasher);
            c.dna.venom.to_bits().hash(&mut hasher);
        }
        for (id, r) in self.store.resources.iter() {
            id.hash(&mut hasher);
            r.kind.hash(&mut hasher);
            r.amount.to_bits().hash(&mut hasher);
            r.regen_timer.to_bits().hash(&mut hasher);
            r.explosions.hash(&mut hasher);
            r.cycles.hash(&mut hasher);
        }
        for (id, b) in self.store.bursts.iter() {
            id.hash(&mut hasher);
            b.life.to_bits().hash(&mut hasher);
        }
        for (id, f) in self.store.force_fields.iter() {
            id.hash(&mut hasher);
            f.strength.to_bits().hash(&mut hasher);
        }
        self.globals.storminess.to_bits().hash(&mut hasher);

        hasher.finish()
    }
}
