//! Resource regrowth and seed-pod explosions.

use std::f32::consts::TAU;

use crate::components::{EntityId, PlantMorphology, Position, Resource, ResourceKind};
use crate::config::EcosystemConfig;
use crate::math::{wrap_point, Vec2};
use crate::random::RandomSource;
use crate::store::EntityStore;
use crate::world::Globals;

/// Amount a pod must exceed before it can explode.
pub const POD_RIPENESS: f32 = 0.6;

/// Amount left in a pod right after it explodes.
pub const POD_SPENT_AMOUNT: f32 = 0.3;

/// Resources above this amount do not regrow.
pub const FULL_AMOUNT: f32 = 0.99;

fn seed_timer(rng: &mut dyn RandomSource) -> f32 {
    10.0 + rng.float() * 12.0
}

fn morphology(rng: &mut dyn RandomSource) -> PlantMorphology {
    PlantMorphology {
        branch_count: (2 + rng.int(0, 4)).unsigned_abs(),
        branch_angle: 0.4 + rng.float() * 0.8,
        curvature: 0.2 + rng.float() * 0.6,
        segment_length: 10.0 + rng.float() * 12.0,
        thickness: 0.6 + rng.float() * 0.8,
        depth: 0.2 + rng.float() * 0.7,
        lean: (rng.float() - 0.5) * 0.6,
    }
}

/// Create a full resource at `at`.
///
/// Plants get random morphology; pods get a random seed timer.
pub fn spawn_resource(
    store: &mut EntityStore,
    rng: &mut dyn RandomSource,
    kind: ResourceKind,
    at: Vec2,
) -> EntityId {
    let id = store.create_entity();
    store.positions.insert(id, Position { value: at });
    let morphology = match kind {
        ResourceKind::Plant => Some(morphology(rng)),
        ResourceKind::Pod => None,
    };
    let regen_timer = rng.float() * 5.0;
    let seed_timer = match kind {
        ResourceKind::Plant => None,
        ResourceKind::Pod => Some(seed_timer(rng)),
    };
    store.resources.insert(
        id,
        Resource {
            kind,
            amount: 1.0,
            regen_timer,
            age: 0.0,
            cycles: 0,
            explosions: 0,
            seed_timer,
            morphology,
        },
    );
    id
}

/// Count of pod-kind resources.
#[must_use]
pub fn pod_count(store: &EntityStore) -> usize {
    store
        .resources
        .iter()
        .filter(|(_, r)| r.kind == ResourceKind::Pod)
        .count()
}

/// Age resources, explode ripe pods and regrow depleted food.
///
/// Returns the number of plants seeded this tick.
pub fn ecology_system(
    store: &mut EntityStore,
    globals: &Globals,
    rng: &mut dyn RandomSource,
    config: &EcosystemConfig,
    dt: f32,
) -> usize {
    let max_pods = config.ecology.max_pods as usize;
    let max_cycles = config.ecology.max_pod_cycles;
    let regrowth_rate = 0.8 + globals.fertility * 1.2;
    let pods = pod_count(store);
    let mut seeded = 0;

    for id in store.resources.ids() {
        let Some(mut resource) = store.resources.get(id).copied() else {
            continue;
        };
        resource.age += dt;

        let ripe = resource
            .seed_timer
            .is_some_and(|timer| resource.age > timer);
        if resource.kind == ResourceKind::Pod
            && ripe
            && resource.amount > POD_RIPENESS
            && resource.explosions < max_cycles
            && pods < max_pods
        {
            if let Some(center) = store.positions.get(id).map(|p| p.value) {
                seeded += scatter_seeds(store, rng, config, id, center, resource.amount);
            }
            resource.amount = POD_SPENT_AMOUNT;
            resource.explosions += 1;
            resource.age = 0.0;
            resource.seed_timer = Some(seed_timer(rng));
        }

        if resource.amount <= FULL_AMOUNT {
            resource.regen_timer -= dt * regrowth_rate;
            if resource.regen_timer <= 0.0 {
                resource.amount = 1.0;
                resource.regen_timer = 6.0 + rng.float() * 4.0;
                resource.cycles += 1;
                resource.age = 0.0;
            }
        }

        if let Some(row) = store.resources.get_mut(id) {
            *row = resource;
        }
    }

    seeded
}

/// Spawn `4 + id % 4` plants in a jittered ring around a pod.
fn scatter_seeds(
    store: &mut EntityStore,
    rng: &mut dyn RandomSource,
    config: &EcosystemConfig,
    pod: EntityId,
    center: Vec2,
    amount: f32,
) -> usize {
    let seeds = 4 + (pod % 4) as usize;
    let base_angle = (pod as f32 * 0.6) % TAU;
    let base_dist = 18.0 + amount * 10.0;
    let spacing = TAU / seeds as f32;

    for i in 0..seeds {
        let angle = base_angle + i as f32 * spacing + (rng.float() - 0.5) * 0.3;
        let dist = base_dist * (0.7 + rng.float() * 0.6);
        let at = wrap_point(
            center + Vec2::from_angle(angle) * dist,
            config.world.width,
            config.world.height,
        );
        spawn_resource(store, rng, ResourceKind::Plant, at);
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    fn ripe_pod(store: &mut EntityStore, rng: &mut SeededRandom, at: Vec2) -> EntityId {
        let id = spawn_resource(store, rng, ResourceKind::Pod, at);
        let pod = store.resources.get_mut(id).unwrap();
        pod.seed_timer = Some(1.0);
        pod.age = 2.0;
        id
    }

    #[test]
    fn test_spawned_resources() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(9);
        let plant = spawn_resource(&mut store, &mut rng, ResourceKind::Plant, Vec2::ZERO);
        let pod = spawn_resource(&mut store, &mut rng, ResourceKind::Pod, Vec2::ZERO);

        let plant = store.resources.get(plant).unwrap();
        let morph = plant.morphology.unwrap();
        assert!((2..=6).contains(&morph.branch_count));
        assert!((0.2..0.9).contains(&morph.depth));
        assert!(plant.seed_timer.is_none());
        assert!((0.0..5.0).contains(&plant.regen_timer));

        let pod = store.resources.get(pod).unwrap();
        assert!(pod.morphology.is_none());
        assert!((10.0..22.0).contains(&pod.seed_timer.unwrap()));
    }

    #[test]
    fn test_pod_explodes_into_ring_of_plants() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(1);
        let config = EcosystemConfig::default();
        let pod = ripe_pod(&mut store, &mut rng, Vec2::new(500.0, 500.0));

        let seeded = ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);

        assert_eq!(seeded, 4 + (pod % 4) as usize);
        assert_eq!(store.resources.len(), 1 + seeded);
        let state = store.resources.get(pod).unwrap();
        assert_eq!(state.explosions, 1);
        assert_eq!(state.age, 0.0);
        assert!((10.0..22.0).contains(&state.seed_timer.unwrap()));

        for (id, resource) in store.resources.iter() {
            if id == pod {
                continue;
            }
            assert_eq!(resource.kind, ResourceKind::Plant);
            let d = store.positions.get(id).unwrap().value.distance(Vec2::new(500.0, 500.0));
            // (18 + 10) * [0.7, 1.3)
            assert!((19.5..36.5).contains(&d), "distance {d}");
        }
    }

    #[test]
    fn test_seeds_wrap_into_world() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(5);
        let config = EcosystemConfig::default();
        ripe_pod(&mut store, &mut rng, Vec2::new(1.0, 1.0));

        ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);

        for (_, pos) in store.positions.iter() {
            assert!((0.0..config.world.width).contains(&pos.value.x));
            assert!((0.0..config.world.height).contains(&pos.value.y));
        }
    }

    #[test]
    fn test_explosion_caps() {
        let mut rng = SeededRandom::new(2);
        let mut config = EcosystemConfig::default();

        // Per-pod cycle cap
        let mut store = EntityStore::new();
        let pod = ripe_pod(&mut store, &mut rng, Vec2::new(500.0, 500.0));
        store.resources.get_mut(pod).unwrap().explosions = config.ecology.max_pod_cycles;
        let seeded = ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);
        assert_eq!(seeded, 0);

        // Global pod cap
        config.ecology.max_pods = 1;
        let mut store = EntityStore::new();
        ripe_pod(&mut store, &mut rng, Vec2::new(500.0, 500.0));
        let seeded = ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);
        assert_eq!(seeded, 0);
    }

    #[test]
    fn test_unripe_or_depleted_pod_does_not_explode() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(3);
        let config = EcosystemConfig::default();
        let pod = ripe_pod(&mut store, &mut rng, Vec2::new(500.0, 500.0));
        store.resources.get_mut(pod).unwrap().amount = 0.5;

        let seeded = ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);
        assert_eq!(seeded, 0);
    }

    #[test]
    fn test_regrowth_resets_amount() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(4);
        let config = EcosystemConfig::default();
        let plant = spawn_resource(&mut store, &mut rng, ResourceKind::Plant, Vec2::ZERO);
        {
            let r = store.resources.get_mut(plant).unwrap();
            r.amount = 0.2;
            r.regen_timer = 0.1;
        }
        // fertility 0.6: rate 1.52, one step of 0.06 removes 0.0912
        ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);
        let r = store.resources.get(plant).unwrap();
        assert_eq!(r.amount, 0.2);
        assert!((r.regen_timer - 0.0088).abs() < 1e-5);

        ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);
        let r = store.resources.get(plant).unwrap();
        assert_eq!(r.amount, 1.0);
        assert_eq!(r.cycles, 1);
        assert_eq!(r.age, 0.0);
        assert!((6.0..10.0).contains(&r.regen_timer));
    }

    #[test]
    fn test_full_resource_does_not_tick_timer() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(4);
        let config = EcosystemConfig::default();
        let plant = spawn_resource(&mut store, &mut rng, ResourceKind::Plant, Vec2::ZERO);
        let before = store.resources.get(plant).unwrap().regen_timer;
        ecology_system(&mut store, &Globals::default(), &mut rng, &config, 0.06);
        assert_eq!(store.resources.get(plant).unwrap().regen_timer, before);
    }
}
