//! Velocity integration with toroidal wrap.
//!
//! Creature speed is capped at the species `max_speed` before moving, so
//! no accumulation of steering and field pushes can run away.

use crate::components::EntityId;
use crate::config::WorldConfig;
use crate::math::wrap_point;
use crate::store::EntityStore;

/// Advance every mobile entity and every burst particle by `dt`, wrapping
/// positions into the world.
///
/// Creature velocities over their species cap are scaled down first.
/// Entities with a velocity but no position are skipped.
pub fn physics_system(store: &mut EntityStore, world: &WorldConfig, dt: f32) {
    let EntityStore {
        positions,
        velocities,
        creatures,
        bursts,
        ..
    } = store;

    // Only touch rows that exceed the cap so untouched rows keep their version
    let speeding: Vec<(EntityId, f32)> = creatures
        .iter()
        .filter_map(|(id, creature)| {
            let max = creature.species.profile().max_speed;
            let velocity = velocities.get(id)?;
            (velocity.value.length() > max).then_some((id, max))
        })
        .collect();
    for (id, max) in speeding {
        if let Some(velocity) = velocities.get_mut(id) {
            velocity.value = velocity.value.clamp_length_max(max);
        }
    }

    for (id, velocity) in velocities.iter() {
        let Some(position) = positions.get_mut(id) else {
            continue;
        };
        position.value = wrap_point(
            position.value + velocity.value * dt,
            world.width,
            world.height,
        );
    }

    for (id, burst) in bursts.iter() {
        let Some(position) = positions.get_mut(id) else {
            continue;
        };
        position.value = wrap_point(
            position.value + burst.velocity * dt,
            world.width,
            world.height,
        );
    }
}
