//! Seek-and-blend steering.
//!
//! Each creature looks for the nearest target its species hunts (agents
//! look for food) within `seek_radius * sense` and blends its velocity
//! toward a pursuit velocity. Agents also push apart from crowding agents.

use crate::components::EntityId;
use crate::math::Vec2;
use crate::spatial::SpatialGrid;
use crate::species::{SteerTarget, Species};
use crate::store::EntityStore;

/// Distance below which agents push away from each other.
pub const SEPARATION_RADIUS: f32 = 18.0;

/// Separation acceleration at zero distance.
pub const SEPARATION_STRENGTH: f32 = 30.0;

/// Steer every creature that is not resting.
///
/// `cell_size` is the spatial grid cell; `dt` is the (stride-scaled) step.
pub fn steering_system(store: &mut EntityStore, cell_size: f32, dt: f32) {
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

    let mut updates: Vec<(EntityId, Vec2)> = Vec::with_capacity(store.creatures.len());

    for (id, creature) in store.creatures.iter() {
        if creature.is_resting() {
            continue;
        }
        let (Some(pos), Some(vel)) = (store.positions.get(id), store.velocities.get(id)) else {
            continue;
        };
        let pos = pos.value;
        let mut velocity = vel.value;
        let steering = creature.species.profile().steering;
        let dna = creature.dna;
        let seek_radius = steering.seek_radius * dna.sense;

        let target = match steering.target {
            SteerTarget::Resources => food.nearest(pos, seek_radius, |_| true).map(|e| e.position),
            SteerTarget::Prey(prey) => creatures
                .nearest(pos, seek_radius, |e| prey.contains(&e.item.1))
                .map(|e| e.position),
        };

        if let Some(target) = target {
            let (speed_scale, blend) = if steering.aggressive {
                let aggression = dna.aggression();
                (0.8 + 0.25 * aggression, steering.blend + 0.1 * aggression)
            } else {
                (1.0, steering.blend)
            };
            let desired =
                (target - pos).normalize() * (steering.desired_speed * dna.speed * speed_scale);
            velocity = velocity.blend(desired, blend);
        }

        if steering.separates {
            let mut push = Vec2::ZERO;
            for other in creatures.query_within(pos, SEPARATION_RADIUS) {
                let (other_id, other_species) = other.item;
                if other_id == id || other_species != creature.species {
                    continue;
                }
                let away = pos - other.position;
                let dist_sq = away.dot(away);
                if dist_sq <= 0.0 || dist_sq >= SEPARATION_RADIUS * SEPARATION_RADIUS {
                    continue;
                }
                let dist = dist_sq.sqrt();
                let strength = (SEPARATION_RADIUS - dist) / SEPARATION_RADIUS;
                push += away * (strength * SEPARATION_STRENGTH / dist);
            }
            velocity += push * dt;
        }

        updates.push((id, velocity));
    }

    for (id, velocity) in updates {
        if let Some(vel) = store.velocities.get_mut(id) {
            vel.value = velocity;
        }
    }
}
