//! Energy drain, grazing and predation.
//!
//! Species feed one after another in [`FEEDING_ORDER`], so grazers bite
//! before hunters move and a titan strikes apex before coral gets a turn.
//! Within a species, creatures go in ascending id order. Per creature:
//!
//! 1. Rest counts down by `dt`.
//! 2. Energy drains by `0.03 * metabolism_multiplier * drain_factor *
//!    dna.metabolism * dt`, scaled by the aggression term for species that
//!    use it and by the rest factor while still resting, then clamps to
//!    `[0, cap]`.
//! 3. Hunters that are not resting eat at most one prey inside their eat
//!    radius, trying prey species in list order. Grazers bite every food
//!    source inside theirs.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::Vec2;
use crate::random::RandomSource;
use crate::spatial::SpatialGrid;
use crate::species::{GrazeProfile, HuntProfile, PreyRule, Species};
use crate::store::EntityStore;
use crate::systems::particles::{spawn_kill_burst, KillSite};
use crate::world::Globals;

/// Base energy drain per second before the world multiplier.
pub const BASE_DRAIN: f32 = 0.03;

/// Order in which species drain and feed each tick.
pub const FEEDING_ORDER: [Species; 5] = [
    Species::Agent,
    Species::Predator,
    Species::Apex,
    Species::Titan,
    Species::Coral,
];

/// One successful hunt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredationEvent {
    /// The hunter.
    pub predator: EntityId,
    /// Species of the hunter.
    pub predator_species: Species,
    /// The destroyed prey.
    pub prey: EntityId,
    /// Species of the prey.
    pub prey_species: Species,
    /// Where the prey died.
    pub position: Vec2,
}

/// Run metabolism and feeding for every creature.
pub fn metabolism_system(
    store: &mut EntityStore,
    globals: &Globals,
    rng: &mut dyn RandomSource,
    cell_size: f32,
    dt: f32,
) -> Vec<PredationEvent> {
    let base_drain = BASE_DRAIN * globals.metabolism_multiplier;

    // Positions do not move during this system, so one index serves every
    // lookup. Eaten prey stay in the index and are rejected by a liveness
    // check.
    let food = SpatialGrid::build(
        cell_size,
        store.resources.iter().filter_map(|(id, resource)| {
            if resource.amount <= 0.0 {
                return None;
            }
            store.positions.get(id).map(|pos| (id, pos.value))
        }),
        0.0,
    );
    let creatures: SpatialGrid<(EntityId, Species)> = SpatialGrid::build(
        cell_size,
        store.creatures.iter().filter_map(|(id, creature)| {
            store
                .positions
                .get(id)
                .map(|pos| ((id, creature.species), pos.value))
        }),
        0.0,
    );

    let order: Vec<EntityId> = FEEDING_ORDER
        .iter()
        .flat_map(|&species| {
            store
                .creatures
                .iter()
                .filter(move |(_, creature)| creature.species == species)
                .map(|(id, _)| id)
        })
        .collect();
    let mut events = Vec::new();

    for id in order {
        // Eaten earlier this tick
        let Some(mut creature) = store.creatures.get(id).copied() else {
            continue;
        };
        let profile = creature.species.profile();

        creature.rest = (creature.rest - dt).max(0.0);
        let mut drain = base_drain * profile.metabolism.drain_factor * creature.dna.metabolism * dt;
        if profile.metabolism.aggression_drain {
            drain *= 0.7 + 0.4 * creature.dna.aggression();
        }
        if creature.is_resting() {
            drain *= profile.metabolism.rest_factor;
        }
        creature.energy = (creature.energy - drain).clamp(0.0, profile.energy_cap);

        if let Some(pos) = store.positions.get(id).map(|p| p.value) {
            if let Some(graze) = profile.graze {
                graze_nearby(store, &food, graze, pos, &mut creature.energy, profile.energy_cap);
            }
            let hunt = if creature.is_resting() { None } else { profile.hunt };
            if let Some(hunt) = hunt {
                if let Some(kill) = find_kill(store, &creatures, &hunt, id, pos) {
                    store.destroy_entity(kill.prey);
                    creature.energy = (creature.energy + kill.gain).min(profile.energy_cap);
                    creature.rest = kill.rule.rest_min + rng.float() * kill.rule.rest_span;
                    spawn_kill_burst(
                        store,
                        globals,
                        rng,
                        hunt.burst,
                        KillSite {
                            prey: kill.position,
                            hunter: pos,
                            hue: creature.color_hue,
                            energy: creature.energy,
                        },
                    );
                    events.push(PredationEvent {
                        predator: id,
                        predator_species: creature.species,
                        prey: kill.prey,
                        prey_species: kill.rule.prey,
                        position: kill.position,
                    });
                }
            }
        }

        if let Some(row) = store.creatures.get_mut(id) {
            *row = creature;
        }
    }

    events
}

fn graze_nearby(
    store: &mut EntityStore,
    food: &SpatialGrid<EntityId>,
    graze: GrazeProfile,
    pos: Vec2,
    energy: &mut f32,
    cap: f32,
) {
    let radius_sq = graze.eat_radius * graze.eat_radius;
    for entry in food.query_within(pos, graze.eat_radius) {
        if entry.position.distance_squared(pos) >= radius_sq {
            continue;
        }
        let Some(resource) = store.resources.get_mut(entry.item) else {
            continue;
        };
        if resource.amount <= 0.0 {
            continue;
        }
        let bite = graze.bite.min(resource.amount);
        resource.amount -= bite;
        *energy = (*energy + bite).min(cap);
    }
}

struct Kill {
    prey: EntityId,
    position: Vec2,
    rule: PreyRule,
    gain: f32,
}

/// First live prey inside the eat radius, trying prey species in list
/// order and the nearest individual within a species.
fn find_kill(
    store: &EntityStore,
    creatures: &SpatialGrid<(EntityId, Species)>,
    hunt: &HuntProfile,
    hunter: EntityId,
    pos: Vec2,
) -> Option<Kill> {
    hunt.prey.iter().find_map(|rule| {
        let entry = creatures.nearest(pos, hunt.eat_radius, |entry| {
            let (id, species) = entry.item;
            id != hunter && species == rule.prey && store.creatures.contains(id)
        })?;
        let (prey, _) = entry.item;
        let venom = store.creatures.get(prey).map_or(0.0, |c| c.dna.venom);
        Some(Kill {
            prey,
            position: entry.position,
            rule: *rule,
            gain: rule.bonus * (1.0 - venom * rule.venom_penalty),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Creature, Dna, Position, Resource, ResourceKind, Velocity};
    use crate::random::SeededRandom;

    fn add(store: &mut EntityStore, species: Species, at: Vec2, energy: f32) -> EntityId {
        let id = store.create_entity();
        store.positions.insert(id, Position { value: at });
        store.velocities.insert(id, Velocity::ZERO);
        store.creatures.insert(
            id,
            Creature {
                species,
                color_hue: 10.0,
                energy,
                age: 0.0,
                rest: 0.0,
                dna: Dna::default(),
                caste: None,
                evolved: false,
            },
        );
        id
    }

    fn food(store: &mut EntityStore, at: Vec2, amount: f32) -> EntityId {
        let id = store.create_entity();
        store.positions.insert(id, Position { value: at });
        store.resources.insert(
            id,
            Resource {
                kind: ResourceKind::Plant,
                amount,
                regen_timer: 3.0,
                age: 0.0,
                cycles: 0,
                explosions: 0,
                seed_timer: None,
                morphology: None,
            },
        );
        id
    }

    #[test]
    fn test_drain_scales_with_multiplier() {
        let mut store = EntityStore::new();
        let agent = add(&mut store, Species::Agent, Vec2::new(500.0, 500.0), 1.0);
        let globals = Globals {
            metabolism_multiplier: 2.0,
            ..Globals::default()
        };
        let mut rng = SeededRandom::new(0);

        metabolism_system(&mut store, &globals, &mut rng, 48.0, 1.0);

        let energy = store.creatures.get(agent).unwrap().energy;
        assert!((energy - (1.0 - 0.06)).abs() < 1e-6);
    }

    #[test]
    fn test_agent_grazes_every_resource_in_reach() {
        let mut store = EntityStore::new();
        let agent = add(&mut store, Species::Agent, Vec2::new(100.0, 100.0), 0.5);
        let near = food(&mut store, Vec2::new(104.0, 100.0), 0.4);
        let also_near = food(&mut store, Vec2::new(100.0, 106.0), 1.0);
        let far = food(&mut store, Vec2::new(130.0, 100.0), 1.0);
        let mut rng = SeededRandom::new(0);

        metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);

        assert_eq!(store.resources.get(near).unwrap().amount, 0.0);
        assert!((store.resources.get(also_near).unwrap().amount - 0.4).abs() < 1e-6);
        assert_eq!(store.resources.get(far).unwrap().amount, 1.0);
        // 0.5 - 0.0018 drain + 0.4 + 0.6
        let energy = store.creatures.get(agent).unwrap().energy;
        assert!((energy - 1.4982).abs() < 1e-5);
    }

    #[test]
    fn test_predator_kill() {
        let mut store = EntityStore::new();
        let predator = add(&mut store, Species::Predator, Vec2::new(100.0, 100.0), 1.0);
        let prey = add(&mut store, Species::Agent, Vec2::new(105.0, 100.0), 1.0);
        let mut rng = SeededRandom::new(4);

        let events = metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].predator, predator);
        assert_eq!(events[0].prey, prey);
        assert_eq!(events[0].prey_species, Species::Agent);
        assert!(!store.is_alive(prey));

        let hunter = store.creatures.get(predator).unwrap();
        assert!(hunter.energy > 1.9 && hunter.energy <= 2.0);
        assert!((4.0..7.0).contains(&hunter.rest));
        assert_eq!(store.bursts.len(), 4);
    }

    #[test]
    fn test_predators_feed_before_coral() {
        let mut store = EntityStore::new();
        // Coral holds the lower id, so plain id order would hand it the kill
        let coral = add(&mut store, Species::Coral, Vec2::new(103.0, 100.0), 1.0);
        let predator = add(&mut store, Species::Predator, Vec2::new(97.0, 100.0), 1.0);
        let prey = add(&mut store, Species::Agent, Vec2::new(100.0, 100.0), 1.0);
        let mut rng = SeededRandom::new(6);

        let events = metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].predator, predator);
        assert_eq!(events[0].prey, prey);
        assert_eq!(store.creatures.get(coral).unwrap().rest, 0.0);
    }

    #[test]
    fn test_resting_hunter_does_not_eat() {
        let mut store = EntityStore::new();
        let coral = add(&mut store, Species::Coral, Vec2::new(100.0, 100.0), 1.0);
        store.creatures.get_mut(coral).unwrap().rest = 2.0;
        let prey = add(&mut store, Species::Agent, Vec2::new(103.0, 100.0), 1.0);
        let mut rng = SeededRandom::new(0);

        let events = metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);

        assert!(events.is_empty());
        assert!(store.is_alive(prey));
        let hunter = store.creatures.get(coral).unwrap();
        assert!((hunter.rest - 1.94).abs() < 1e-5);
        // Rest factor 0.4 applies to the drain
        let expected = 1.0 - 0.03 * 1.5 * 0.06 * 0.4;
        assert!((hunter.energy - expected).abs() < 1e-6);
    }

    #[test]
    fn test_venom_reduces_apex_gain() {
        let mut store = EntityStore::new();
        let apex = add(&mut store, Species::Apex, Vec2::new(100.0, 100.0), 1.0);
        let coral = add(&mut store, Species::Coral, Vec2::new(105.0, 100.0), 1.0);
        store.creatures.get_mut(coral).unwrap().dna.venom = 0.8;
        let mut rng = SeededRandom::new(0);

        metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);

        // 1.0 * (1 - 0.8 * 0.5) = 0.6
        let energy = store.creatures.get(apex).unwrap().energy;
        let drained = 1.0 - 0.03 * 1.1 * 0.06;
        assert!((energy - (drained + 0.6)).abs() < 1e-5);
    }

    #[test]
    fn test_apex_prefers_predators() {
        let mut store = EntityStore::new();
        add(&mut store, Species::Apex, Vec2::new(100.0, 100.0), 1.0);
        let coral = add(&mut store, Species::Coral, Vec2::new(102.0, 100.0), 1.0);
        let predator = add(&mut store, Species::Predator, Vec2::new(110.0, 100.0), 1.0);
        let mut rng = SeededRandom::new(0);

        let events = metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);

        // The predator and the coral are both in reach; the apex also sits
        // inside the coral's own eat radius, but coral only hunts agents.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].prey, predator);
        assert!(store.is_alive(coral));
    }

    #[test]
    fn test_energy_stays_within_cap() {
        let mut store = EntityStore::new();
        let titan = add(&mut store, Species::Titan, Vec2::new(100.0, 100.0), 5.9);
        add(&mut store, Species::Apex, Vec2::new(104.0, 100.0), 1.0);
        let mut rng = SeededRandom::new(0);

        metabolism_system(&mut store, &Globals::default(), &mut rng, 48.0, 0.06);
        assert_eq!(store.creatures.get(titan).unwrap().energy, 6.0);
    }
}
