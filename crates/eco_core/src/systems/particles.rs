//! Kill-site burst particles.
//!
//! Bursts are purely visual. Their ids come from the store's particle free
//! list and go back to it when they expire, so a long run does not burn
//! through the id space.

use std::f32::consts::TAU;

use crate::components::{Burst, Position};
use crate::math::Vec2;
use crate::random::RandomSource;
use crate::species::BurstStyle;
use crate::store::EntityStore;
use crate::world::Globals;

/// Most live particles allowed at the given effect quality.
#[must_use]
pub fn burst_budget(effect_quality: f32) -> usize {
    (420.0 * effect_quality).round().max(60.0) as usize
}

/// Where and how a kill effect is drawn.
#[derive(Debug, Clone, Copy)]
pub struct KillSite {
    /// Prey position at the moment of the kill.
    pub prey: Vec2,
    /// Hunter position.
    pub hunter: Vec2,
    /// Particle hue.
    pub hue: f32,
    /// Hunter energy after feeding; radial bursts fly faster from
    /// well-fed hunters.
    pub energy: f32,
}

/// Spawn the particles for one kill, clipped to the remaining budget.
///
/// Returns the number of particles created.
pub fn spawn_kill_burst(
    store: &mut EntityStore,
    globals: &Globals,
    rng: &mut dyn RandomSource,
    style: BurstStyle,
    site: KillSite,
) -> usize {
    let quality = globals.effect_quality;
    let count = match style {
        BurstStyle::Absorb { count, .. } | BurstStyle::Radial { count } => count,
    };
    let requested = ((count as f32 * quality).round() as usize).max(1);
    let remaining = burst_budget(quality).saturating_sub(store.bursts.len());
    let spawned = requested.min(remaining);

    for _ in 0..spawned {
        let (velocity, life) = match style {
            BurstStyle::Absorb { speed, life, .. } => {
                let toward = site.hunter - site.prey;
                let raw = Vec2::new(
                    toward.x * (0.8 + rng.float() * 0.5),
                    toward.y * (0.8 + rng.float() * 0.5),
                );
                (raw.normalize() * speed, life + rng.float() * 0.3)
            }
            BurstStyle::Radial { .. } => {
                let angle = rng.float() * TAU;
                let speed = (40.0 + site.energy * 12.0) * (0.6 + rng.float() * 0.8);
                (Vec2::from_angle(angle) * speed, 1.4 + rng.float() * 0.6)
            }
        };
        let id = store.acquire_particle();
        store.positions.insert(id, Position { value: site.prey });
        store.bursts.insert(
            id,
            Burst {
                velocity,
                life,
                hue: site.hue,
            },
        );
    }
    spawned
}

/// Age every particle and recycle the expired ones.
pub fn particle_decay_system(store: &mut EntityStore, dt: f32) {
    let mut expired = Vec::new();
    for (id, burst) in store.bursts.iter_mut() {
        burst.life -= dt;
        if burst.life <= 0.0 {
            expired.push(id);
        }
    }
    for id in expired {
        store.recycle_particle(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    fn site() -> KillSite {
        KillSite {
            prey: Vec2::new(10.0, 10.0),
            hunter: Vec2::new(20.0, 10.0),
            hue: 5.0,
            energy: 3.0,
        }
    }

    #[test]
    fn test_budget_floor_and_scale() {
        assert_eq!(burst_budget(1.0), 420);
        assert_eq!(burst_budget(0.6), 252);
        assert_eq!(burst_budget(0.1), 60);
    }

    #[test]
    fn test_absorb_particles_head_to_hunter() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(1);
        let style = BurstStyle::Absorb {
            count: 4,
            speed: 70.0,
            life: 0.5,
        };
        let n = spawn_kill_burst(&mut store, &Globals::default(), &mut rng, style, site());
        assert_eq!(n, 4);
        for (id, burst) in store.bursts.iter() {
            assert!((burst.velocity.length() - 70.0).abs() < 1e-3);
            assert!(burst.velocity.x > 0.0);
            assert!((0.5..0.8).contains(&burst.life));
            assert_eq!(store.positions.get(id).unwrap().value, Vec2::new(10.0, 10.0));
        }
    }

    #[test]
    fn test_request_is_clipped_to_budget() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(2);
        let globals = Globals {
            effect_quality: 0.1,
            ..Globals::default()
        };
        let style = BurstStyle::Radial { count: 8 };
        // quality 0.1 requests max(1, round(0.8)) = 1 per kill; budget 60
        let mut total = 0;
        for _ in 0..100 {
            total += spawn_kill_burst(&mut store, &globals, &mut rng, style, site());
        }
        assert_eq!(total, 60);
        assert_eq!(store.bursts.len(), 60);
    }

    #[test]
    fn test_decay_recycles_ids() {
        let mut store = EntityStore::new();
        let mut rng = SeededRandom::new(3);
        spawn_kill_burst(
            &mut store,
            &Globals::default(),
            &mut rng,
            BurstStyle::Radial { count: 8 },
            site(),
        );
        assert_eq!(store.bursts.len(), 8);

        particle_decay_system(&mut store, 1.0);
        assert_eq!(store.bursts.len(), 8);

        particle_decay_system(&mut store, 1.1);
        assert!(store.bursts.is_empty());
        assert_eq!(store.free_particle_count(), 8);
        assert!(store.positions.is_empty());
    }
}
