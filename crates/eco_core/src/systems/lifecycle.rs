//! Creature creation, ageing, reproduction and starvation.

use crate::components::{is_evolved, Caste, Creature, Dna, EntityId, Position, Velocity};
use crate::config::WorldConfig;
use crate::math::{wrap_point, Vec2};
use crate::random::RandomSource;
use crate::species::{GenomeProfile, Species, Threshold, TraitRange};
use crate::store::EntityStore;
use crate::systems::particles::particle_decay_system;
use crate::world::Globals;

/// Entities created and destroyed by one lifecycle pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    /// Children born this tick.
    pub births: Vec<EntityId>,
    /// Creatures that starved this tick.
    pub deaths: Vec<EntityId>,
}

fn draw(range: TraitRange, rng: &mut dyn RandomSource) -> f32 {
    range.initial_base + rng.float() * range.initial_span
}

fn initial_dna(genome: &GenomeProfile, rng: &mut dyn RandomSource) -> Dna {
    let speed = draw(genome.speed, rng);
    let sense = draw(genome.sense, rng);
    let metabolism = draw(genome.metabolism, rng);
    let hue_shift = rng.int(-genome.initial_hue_spread, genome.initial_hue_spread);
    let venom = genome.venom.map_or(0.0, |(range, _)| draw(range, rng));
    Dna {
        speed,
        sense,
        metabolism,
        hue_shift,
        venom,
    }
}

/// Mutate a parent's traits. Each trait moves by up to half the species
/// mutation step either way and is clamped to its bounds.
fn mutated_dna(genome: &GenomeProfile, parent: &Dna, rng: &mut dyn RandomSource) -> Dna {
    let step = genome.mutation_step;
    let speed = genome.speed.clamp(parent.speed + rng.jitter(step));
    let sense = genome.sense.clamp(parent.sense + rng.jitter(step));
    let metabolism = genome.metabolism.clamp(parent.metabolism + rng.jitter(step));
    let hue_shift = (parent.hue_shift + rng.int(-genome.hue_step, genome.hue_step))
        .clamp(-genome.hue_limit, genome.hue_limit);
    let venom = genome.venom.map_or(0.0, |(range, venom_step)| {
        range.clamp(parent.venom + rng.jitter(venom_step))
    });
    Dna {
        speed,
        sense,
        metabolism,
        hue_shift,
        venom,
    }
}

/// Create a creature at `at`.
///
/// Without a parent the traits are drawn from the species' initial
/// distribution. With one they are a mutated copy of the parent's, and
/// species that inherit hue take the parent's hue as their base.
pub fn spawn_creature(
    store: &mut EntityStore,
    rng: &mut dyn RandomSource,
    species: Species,
    at: Vec2,
    parent: Option<&Creature>,
) -> EntityId {
    let profile = species.profile();
    let dna = match parent {
        Some(parent) => mutated_dna(&profile.genome, &parent.dna, rng),
        None => initial_dna(&profile.genome, rng),
    };
    let speed = profile.spawn_speed * dna.speed;
    let velocity = Velocity::new(rng.jitter(speed), rng.jitter(speed));

    let base_hue = match parent {
        Some(parent) if profile.reproduction.inherits_hue => parent.color_hue,
        _ => profile.base_hue,
    };
    let (caste, evolved) = if profile.snapshot.caste {
        (Some(Caste::classify(&dna)), is_evolved(&dna))
    } else {
        (None, false)
    };

    let id = store.create_entity();
    store.positions.insert(id, Position { value: at });
    store.velocities.insert(id, velocity);
    store.creatures.insert(
        id,
        Creature {
            species,
            color_hue: base_hue + dna.hue_shift as f32,
            energy: profile.initial_energy,
            age: 0.0,
            rest: 0.0,
            dna,
            caste,
            evolved,
        },
    );
    id
}

/// Age every creature, let eligible ones reproduce, remove the starved and
/// decay burst particles.
///
/// Reproduction splits the parent's energy: the parent keeps `retention`
/// of it and the child receives the rest, so the pair's total is unchanged.
/// Agents never starve; their energy is held at zero instead.
pub fn lifecycle_system(
    store: &mut EntityStore,
    globals: &Globals,
    rng: &mut dyn RandomSource,
    world: &WorldConfig,
    dt: f32,
) -> LifecycleReport {
    let mut report = LifecycleReport::default();

    for id in store.creatures.ids() {
        let Some(mut creature) = store.creatures.get(id).copied() else {
            continue;
        };
        let profile = creature.species.profile();
        let rules = profile.reproduction;
        creature.age += dt;
        creature.energy = creature.energy.max(0.0);

        let threshold = match rules.threshold {
            Threshold::Global => globals.reproduction_threshold,
            Threshold::Fixed(value) => value,
        };
        let eligible = creature.energy >= threshold
            && creature.age > rules.min_age
            && (rules.chance >= 1.0 || rng.chance(rules.chance));

        if eligible {
            let parent_state = (
                store.positions.get(id).map(|p| p.value),
                store.velocities.get(id).map(|v| v.value),
            );
            if let (Some(pos), Some(vel)) = parent_state {
                let at = wrap_point(
                    pos + Vec2::new(rng.jitter(rules.jitter), rng.jitter(rules.jitter)),
                    world.width,
                    world.height,
                );
                let child = spawn_creature(store, rng, creature.species, at, Some(&creature));
                let child_vel = (vel
                    + Vec2::new(rng.jitter(rules.jitter), rng.jitter(rules.jitter)))
                .clamp_length_max(profile.max_speed);
                if let Some(v) = store.velocities.get_mut(child) {
                    v.value = child_vel;
                }
                let total = creature.energy;
                creature.energy = total * rules.retention;
                if let Some(c) = store.creatures.get_mut(child) {
                    c.energy = total - creature.energy;
                }
                report.births.push(child);
            }
        }

        if profile.starves && creature.energy <= 0.0 {
            store.destroy_entity(id);
            report.deaths.push(id);
            continue;
        }

        if let Some(row) = store.creatures.get_mut(id) {
            *row = creature;
        }
    }

    particle_decay_system(store, dt);
    report
}
