//! Simulation systems.
//!
//! Systems contain the logic that processes components. Each one is a plain
//! function over the [`EntityStore`](crate::store::EntityStore) that reads
//! world tunables through an explicit `&Globals` argument and draws
//! randomness from an injected [`RandomSource`](crate::random::RandomSource).
//!
//! Run order within a tick is fixed by
//! [`Simulation::step`](crate::simulation::Simulation::step):
//!
//! 1. **Steering**, **Force Field**, **Collision** (heavy, every `update_stride` ticks)
//! 2. **Physics**
//! 3. **Metabolism & Predation** (spawns kill bursts)
//! 4. **Ecology**
//! 5. **Lifecycle** (reproduction, starvation, particle decay)
//! 6. **Regime**

pub mod collision;
pub mod ecology;
pub mod force_field;
pub mod lifecycle;
pub mod metabolism;
pub mod particles;
pub mod physics;
pub mod regime;
pub mod steering;

pub use collision::collision_system;
pub use ecology::{ecology_system, spawn_resource};
pub use force_field::{force_field_system, paint_force_field};
pub use lifecycle::{lifecycle_system, spawn_creature, LifecycleReport};
pub use metabolism::{metabolism_system, PredationEvent};
pub use particles::{burst_budget, particle_decay_system, spawn_kill_burst, KillSite};
pub use physics::physics_system;
pub use regime::regime_system;
pub use steering::steering_system;
