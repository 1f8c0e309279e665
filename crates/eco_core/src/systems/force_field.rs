//! Player-painted attractors and repellers.

use crate::components::{EntityId, ForceField, Position};
use crate::math::Vec2;
use crate::store::EntityStore;

/// Radius of a painted field.
pub const FIELD_RADIUS: f32 = 80.0;

/// Strength per unit of polarity.
pub const FIELD_STRENGTH: f32 = 50.0;

/// Fraction of the radius within which painting moves an existing field.
pub const REUSE_FRACTION: f32 = 0.6;

/// Create a field at `point`, or move and re-polarise the first existing
/// field closer than `REUSE_FRACTION * FIELD_RADIUS`.
///
/// Positive polarity attracts, negative repels. Returns the field's id.
pub fn paint_force_field(store: &mut EntityStore, point: Vec2, polarity: f32) -> EntityId {
    let reuse_sq = (FIELD_RADIUS * REUSE_FRACTION).powi(2);
    let existing = store.force_fields.iter().find_map(|(id, _)| {
        let pos = store.positions.get(id)?;
        (pos.value.distance_squared(point) < reuse_sq).then_some(id)
    });

    let id = existing.unwrap_or_else(|| store.create_entity());
    store.positions.insert(id, Position { value: point });
    store.force_fields.insert(
        id,
        ForceField {
            strength: FIELD_STRENGTH * polarity,
            radius: FIELD_RADIUS,
        },
    );
    id
}

/// Push every entity with a velocity toward (or away from) each field it
/// is inside.
///
/// The push falls off linearly from `|strength|` at the centre to zero at
/// the rim. An entity exactly on the centre has no direction and is left
/// alone.
pub fn force_field_system(store: &mut EntityStore, dt: f32) {
    if store.force_fields.is_empty() {
        return;
    }
    let fields: Vec<(Vec2, ForceField)> = store
        .force_fields
        .iter()
        .filter_map(|(id, field)| store.positions.get(id).map(|pos| (pos.value, *field)))
        .collect();

    let EntityStore {
        positions,
        velocities,
        ..
    } = store;

    for (id, velocity) in velocities.iter_mut() {
        let Some(pos) = positions.get(id) else {
            continue;
        };
        for (center, field) in &fields {
            let offset = *center - pos.value;
            let dist_sq = offset.dot(offset);
            if dist_sq == 0.0 || dist_sq > field.radius * field.radius {
                continue;
            }
            let dist = dist_sq.sqrt();
            let falloff = (1.0 - dist / field.radius) * field.strength.abs();
            let sign = if field.strength >= 0.0 { 1.0 } else { -1.0 };
            velocity.value += offset * (sign * falloff * dt / dist);
        }
    }
}
