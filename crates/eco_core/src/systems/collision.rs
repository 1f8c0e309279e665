//! Soft-body collision between creatures.

use crate::components::EntityId;
use crate::math::Vec2;
use crate::spatial::SpatialGrid;
use crate::store::EntityStore;

/// Impulse scale for overlapping bodies.
pub const COLLISION_STRENGTH: f32 = 40.0;

struct Body {
    id: EntityId,
    position: Vec2,
    radius: f32,
}

/// Push overlapping creatures apart.
///
/// Bodies are bucketed into single grid cells and each pair inside a 3x3
/// neighbourhood is resolved once. The impulse
/// `COLLISION_STRENGTH * overlap / (ra + rb) * dt` acts along the contact
/// normal, subtracted from the first body and added to the second, so the
/// pair's summed velocity is unchanged. Coincident bodies are skipped.
pub fn collision_system(store: &mut EntityStore, cell_size: f32, dt: f32) {
    if store.creatures.len() <= 1 {
        return;
    }

    let bodies: Vec<Body> = store
        .creatures
        .iter()
        .filter_map(|(id, creature)| {
            if !store.velocities.contains(id) {
                return None;
            }
            let pos = store.positions.get(id)?;
            Some(Body {
                id,
                position: pos.value,
                radius: creature.species.profile().collision.radius(creature.energy),
            })
        })
        .collect();
    if bodies.len() <= 1 {
        return;
    }

    let grid = SpatialGrid::build(
        cell_size,
        bodies.iter().enumerate().map(|(i, body)| (i, body.position)),
        0.0,
    );

    let mut impulses = vec![Vec2::ZERO; bodies.len()];
    for (i, body) in bodies.iter().enumerate() {
        for j in grid.neighborhood(body.position) {
            if j <= i {
                continue;
            }
            let other = &bodies[j];
            let delta = other.position - body.position;
            let dist_sq = delta.dot(delta);
            if dist_sq <= 0.0 {
                continue;
            }
            let min_dist = body.radius + other.radius;
            if dist_sq >= min_dist * min_dist {
                continue;
            }
            let dist = dist_sq.sqrt();
            let overlap = (min_dist - dist) / min_dist;
            let impulse = delta * (COLLISION_STRENGTH * overlap * dt / dist);
            impulses[i] -= impulse;
            impulses[j] += impulse;
        }
    }

    for (body, impulse) in bodies.iter().zip(impulses) {
        if impulse == Vec2::ZERO {
            continue;
        }
        if let Some(vel) = store.velocities.get_mut(body.id) {
            vel.value += impulse;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Creature, Dna, Position, Velocity};
    use crate::species::Species;

    fn body(store: &mut EntityStore, species: Species, at: Vec2, energy: f32) -> EntityId {
        let id = store.create_entity();
        store.positions.insert(id, Position { value: at });
        store.velocities.insert(id, Velocity::ZERO);
        store.creatures.insert(
            id,
            Creature {
                species,
                color_hue: 0.0,
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

    #[test]
    fn test_overlapping_pair_is_pushed_apart() {
        let mut store = EntityStore::new();
        // Agent radius at energy 1 is 6, so the pair overlaps by 6 of 12
        let a = body(&mut store, Species::Agent, Vec2::new(100.0, 100.0), 1.0);
        let b = body(&mut store, Species::Agent, Vec2::new(106.0, 100.0), 1.0);

        collision_system(&mut store, 48.0, 1.0);

        let va = store.velocities.get(a).unwrap().value;
        let vb = store.velocities.get(b).unwrap().value;
        assert!((va.x + 20.0).abs() < 1e-4);
        assert!((vb.x - 20.0).abs() < 1e-4);
        assert!((va + vb).length() < 1e-4);
    }

    #[test]
    fn test_pairs_across_cell_borders_collide() {
        let mut store = EntityStore::new();
        let a = body(&mut store, Species::Titan, Vec2::new(47.0, 10.0), 4.0);
        let b = body(&mut store, Species::Titan, Vec2::new(60.0, 10.0), 4.0);

        collision_system(&mut store, 48.0, 0.06);
        assert!(store.velocities.get(a).unwrap().value.x < 0.0);
        assert!(store.velocities.get(b).unwrap().value.x > 0.0);
    }

    #[test]
    fn test_coincident_and_separated_bodies_are_skipped() {
        let mut store = EntityStore::new();
        let a = body(&mut store, Species::Agent, Vec2::new(100.0, 100.0), 1.0);
        let b = body(&mut store, Species::Agent, Vec2::new(100.0, 100.0), 1.0);
        let c = body(&mut store, Species::Agent, Vec2::new(300.0, 100.0), 1.0);

        collision_system(&mut store, 48.0, 1.0);
        for id in [a, b, c] {
            assert_eq!(store.velocities.get(id).unwrap().value, Vec2::ZERO);
        }
    }

    #[test]
    fn test_single_creature_is_noop() {
        let mut store = EntityStore::new();
        let a = body(&mut store, Species::Apex, Vec2::new(1.0, 1.0), 3.0);
        collision_system(&mut store, 48.0, 1.0);
        assert_eq!(store.velocities.get(a).unwrap().value, Vec2::ZERO);
    }
}
