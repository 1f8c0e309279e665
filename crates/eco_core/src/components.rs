//! Component definitions.
//!
//! Components are pure data with no behavior. Every entity is a bare id
//! plus whatever rows exist for it in the [`EntityStore`](crate::store::EntityStore)
//! tables.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::species::Species;

/// Unique identifier for entities.
pub type EntityId = u32;

/// World position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Current position.
    pub value: Vec2,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            value: Vec2::new(x, y),
        }
    }
}

/// Linear velocity in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Current velocity.
    pub value: Vec2,
}

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Self = Self { value: Vec2::ZERO };

    /// Create a new velocity.
    #[must_use]
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self {
            value: Vec2::new(vx, vy),
        }
    }
}

/// Heritable trait vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dna {
    /// Movement speed multiplier.
    pub speed: f32,
    /// Perception radius multiplier.
    pub sense: f32,
    /// Energy drain multiplier.
    pub metabolism: f32,
    /// Hue offset from the species base hue.
    pub hue_shift: i32,
    /// Coral only; zero for other species.
    pub venom: f32,
}

impl Default for Dna {
    fn default() -> Self {
        Self {
            speed: 1.0,
            sense: 1.0,
            metabolism: 1.0,
            hue_shift: 0,
            venom: 0.0,
        }
    }
}

impl Dna {
    /// Aggression index used by predator steering and drain.
    #[must_use]
    pub fn aggression(&self) -> f32 {
        (self.speed + self.sense - self.metabolism).clamp(0.2, 1.4)
    }
}

/// Behavioural role of an agent, derived from its traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Caste {
    /// No dominant trait.
    #[default]
    Balanced,
    /// Keen senses.
    Scout,
    /// Fast mover.
    Runner,
    /// Low metabolism.
    Saver,
}

impl Caste {
    /// Classify traits into a caste.
    #[must_use]
    pub fn classify(dna: &Dna) -> Self {
        if dna.sense > dna.speed && dna.sense > 1.1 {
            Self::Scout
        } else if dna.speed > dna.sense && dna.speed > 1.1 {
            Self::Runner
        } else if dna.metabolism < 0.9 {
            Self::Saver
        } else {
            Self::Balanced
        }
    }
}

/// True if the traits mark an "evolved" form.
#[must_use]
pub fn is_evolved(dna: &Dna) -> bool {
    dna.speed + dna.sense + (2.0 - dna.metabolism) > 3.5
}

/// A living creature of any species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    /// Species tag.
    pub species: Species,
    /// Display hue in degrees.
    pub color_hue: f32,
    /// Stored energy, within `[0, species cap]`.
    pub energy: f32,
    /// Age in seconds.
    pub age: f32,
    /// Remaining post-kill rest in seconds.
    pub rest: f32,
    /// Heritable traits.
    pub dna: Dna,
    /// Agent caste; `None` for other species.
    pub caste: Option<Caste>,
    /// Agent evolved flag; always false for other species.
    pub evolved: bool,
}

impl Creature {
    /// True while in post-kill rest.
    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.rest > 0.0
    }
}

/// Kind of renewable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Regrowing plant.
    Plant,
    /// Seed pod that periodically scatters plants.
    Pod,
}

/// Procedural-growth traits used to draw a plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantMorphology {
    /// Number of branches per fork.
    pub branch_count: u32,
    /// Angle between branches in radians.
    pub branch_angle: f32,
    /// Bend along each branch.
    pub curvature: f32,
    /// Base segment length.
    pub segment_length: f32,
    /// Stem thickness.
    pub thickness: f32,
    /// Relative recursion depth.
    pub depth: f32,
    /// Overall lean.
    pub lean: f32,
}

/// A renewable food source. Never destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Plant or pod.
    pub kind: ResourceKind,
    /// Food available, within `[0, 1]`.
    pub amount: f32,
    /// Countdown to the next regrowth.
    pub regen_timer: f32,
    /// Seconds since the last regrowth or explosion.
    pub age: f32,
    /// Completed regrowth cycles.
    pub cycles: u32,
    /// Completed pod explosions.
    pub explosions: u32,
    /// Age at which a pod explodes; `None` for plants.
    pub seed_timer: Option<f32>,
    /// Drawing traits; `None` for pods.
    pub morphology: Option<PlantMorphology>,
}

/// Player-painted attractor or repeller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceField {
    /// Positive attracts, negative repels.
    pub strength: f32,
    /// Influence radius.
    pub radius: f32,
}

/// Short-lived visual particle. Carries its own velocity so force fields
/// and steering never see it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Burst {
    /// Drift velocity.
    pub velocity: Vec2,
    /// Remaining lifetime in seconds.
    pub life: f32,
    /// Display hue.
    pub hue: f32,
}
