//! Species kinds and their static behaviour tables.
//!
//! Every creature is tagged with a [`Species`]. Anything that differs
//! between species (trait bounds, steering targets, prey lists, collision
//! size, reproduction rules, which extra fields a snapshot carries) lives in
//! a [`SpeciesProfile`] looked up with [`Species::profile`]. Systems never
//! branch on species names; they read the profile.

use serde::{Deserialize, Serialize};

/// Creature species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Herbivore grazing on resources.
    Agent,
    /// Hunts agents.
    Predator,
    /// Hunts predators and coral.
    Apex,
    /// Venomous hunter of agents.
    Coral,
    /// Hunts apex predators.
    Titan,
}

impl Species {
    /// All species in snapshot order.
    pub const ALL: [Species; 5] = [
        Species::Agent,
        Species::Predator,
        Species::Apex,
        Species::Coral,
        Species::Titan,
    ];

    /// Static behaviour table for this species.
    #[must_use]
    pub fn profile(self) -> &'static SpeciesProfile {
        match self {
            Species::Agent => &AGENT,
            Species::Predator => &PREDATOR,
            Species::Apex => &APEX,
            Species::Coral => &CORAL,
            Species::Titan => &TITAN,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.profile().name
    }

    /// Position of this species in [`Species::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Species::Agent => 0,
            Species::Predator => 1,
            Species::Apex => 2,
            Species::Coral => 3,
            Species::Titan => 4,
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounds and initial distribution of one heritable trait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitRange {
    /// Lower clamp.
    pub min: f32,
    /// Upper clamp.
    pub max: f32,
    /// Initial value is `initial_base + r * initial_span`.
    pub initial_base: f32,
    /// See `initial_base`.
    pub initial_span: f32,
}

impl TraitRange {
    const fn new(min: f32, max: f32, initial_base: f32, initial_span: f32) -> Self {
        Self {
            min,
            max,
            initial_base,
            initial_span,
        }
    }

    /// Clamp a value into the trait bounds.
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Heritable trait layout and mutation amplitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenomeProfile {
    /// Mutation amplitude for speed, sense and metabolism.
    pub mutation_step: f32,
    /// Speed trait.
    pub speed: TraitRange,
    /// Sense trait.
    pub sense: TraitRange,
    /// Metabolism trait.
    pub metabolism: TraitRange,
    /// Largest per-generation hue step (integer, symmetric).
    pub hue_step: i32,
    /// Hue shift clamp (symmetric).
    pub hue_limit: i32,
    /// Initial hue shift spread (integer, symmetric).
    pub initial_hue_spread: i32,
    /// Venom trait and its mutation amplitude, for species that carry one.
    pub venom: Option<(TraitRange, f32)>,
}

/// What a species steers toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerTarget {
    /// Resources with `amount > 0`.
    Resources,
    /// Creatures of these species.
    Prey(&'static [Species]),
}

/// Seek-and-blend steering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringProfile {
    /// Target kind.
    pub target: SteerTarget,
    /// Seek radius before scaling by `sense`.
    pub seek_radius: f32,
    /// Desired pursuit speed before scaling by `speed`.
    pub desired_speed: f32,
    /// Fraction of the current velocity kept each blend.
    pub blend: f32,
    /// Scale speed and blend by the aggression index.
    pub aggressive: bool,
    /// Apply same-species separation.
    pub separates: bool,
}

/// Soft-body collision radius: `base + energy * per_energy`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionProfile {
    /// Radius at zero energy.
    pub base_radius: f32,
    /// Radius growth per unit of energy.
    pub per_energy: f32,
}

impl CollisionProfile {
    /// Collision radius for a creature with `energy`.
    #[must_use]
    pub fn radius(&self, energy: f32) -> f32 {
        self.base_radius + energy * self.per_energy
    }
}

/// Energy drain parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetabolismProfile {
    /// Multiplier on the world base drain.
    pub drain_factor: f32,
    /// Drain multiplier while resting after a kill.
    pub rest_factor: f32,
    /// Scale drain by `0.7 + 0.4 * aggression`.
    pub aggression_drain: bool,
}

/// One entry of a hunter's prey list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreyRule {
    /// Prey species.
    pub prey: Species,
    /// Energy gained from the kill before penalties.
    pub bonus: f32,
    /// Bonus is scaled by `1 - venom * venom_penalty` of the prey.
    pub venom_penalty: f32,
    /// Minimum rest after the kill, seconds.
    pub rest_min: f32,
    /// Random extra rest, seconds.
    pub rest_span: f32,
}

/// Particle effect spawned at a kill site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurstStyle {
    /// Particles stream from the prey toward the hunter.
    Absorb {
        /// Particles at full effect quality.
        count: u32,
        /// Particle speed.
        speed: f32,
        /// Minimum lifetime.
        life: f32,
    },
    /// Particles scatter radially from the kill site.
    Radial {
        /// Particles at full effect quality.
        count: u32,
    },
}

/// Hunting parameters for predator species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuntProfile {
    /// Contact distance for a kill.
    pub eat_radius: f32,
    /// Prey list in priority order.
    pub prey: &'static [PreyRule],
    /// Kill effect.
    pub burst: BurstStyle,
}

/// Grazing parameters for herbivores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrazeProfile {
    /// Feeding distance.
    pub eat_radius: f32,
    /// Largest bite from one resource per tick.
    pub bite: f32,
}

/// Reproduction threshold source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Read `Globals::reproduction_threshold`.
    Global,
    /// Fixed energy threshold.
    Fixed(f32),
}

/// Reproduction rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReproductionProfile {
    /// Energy required.
    pub threshold: Threshold,
    /// Age that must be exceeded.
    pub min_age: f32,
    /// Fraction of energy the parent keeps; the child gets the rest.
    pub retention: f32,
    /// Amplitude of position and velocity jitter applied to the child.
    pub jitter: f32,
    /// Per-tick probability once eligible.
    pub chance: f32,
    /// Child hue is based on the parent's hue instead of the species base.
    pub inherits_hue: bool,
}

/// Which species-specific fields a snapshot entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotFields {
    /// Caste and evolved flag.
    pub caste: bool,
    /// Venom trait.
    pub venom: bool,
}

/// Static description of a species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesProfile {
    /// Lowercase name.
    pub name: &'static str,
    /// Upper energy clamp.
    pub energy_cap: f32,
    /// Energy of a freshly created creature.
    pub initial_energy: f32,
    /// Base hue for non-inherited colouring.
    pub base_hue: f32,
    /// Initial velocity spread, scaled by the speed trait.
    pub spawn_speed: f32,
    /// Hard cap on velocity magnitude.
    pub max_speed: f32,
    /// Heritable traits.
    pub genome: GenomeProfile,
    /// Steering behaviour.
    pub steering: SteeringProfile,
    /// Collision size.
    pub collision: CollisionProfile,
    /// Energy drain.
    pub metabolism: MetabolismProfile,
    /// Hunting, for predator species.
    pub hunt: Option<HuntProfile>,
    /// Grazing, for herbivores.
    pub graze: Option<GrazeProfile>,
    /// Reproduction.
    pub reproduction: ReproductionProfile,
    /// Destroyed when energy reaches zero.
    pub starves: bool,
    /// Extra snapshot fields.
    pub snapshot: SnapshotFields,
}

const PLAIN_FIELDS: SnapshotFields = SnapshotFields {
    caste: false,
    venom: false,
};

static AGENT: SpeciesProfile = SpeciesProfile {
    name: "agent",
    energy_cap: 2.0,
    initial_energy: 1.0,
    base_hue: 200.0,
    spawn_speed: 40.0,
    max_speed: 90.0,
    genome: GenomeProfile {
        mutation_step: 0.1,
        speed: TraitRange::new(0.6, 1.4, 0.8, 0.4),
        sense: TraitRange::new(0.6, 1.4, 0.8, 0.4),
        metabolism: TraitRange::new(0.6, 1.6, 0.8, 0.4),
        hue_step: 4,
        hue_limit: 60,
        initial_hue_spread: 40,
        venom: None,
    },
    steering: SteeringProfile {
        target: SteerTarget::Resources,
        seek_radius: 140.0,
        desired_speed: 40.0,
        blend: 0.8,
        aggressive: false,
        separates: true,
    },
    collision: CollisionProfile {
        base_radius: 4.0,
        per_energy: 2.0,
    },
    metabolism: MetabolismProfile {
        drain_factor: 1.0,
        rest_factor: 1.0,
        aggression_drain: false,
    },
    hunt: None,
    graze: Some(GrazeProfile {
        eat_radius: 10.0,
        bite: 0.6,
    }),
    reproduction: ReproductionProfile {
        threshold: Threshold::Global,
        min_age: 8.0,
        retention: 0.5,
        jitter: 8.0,
        chance: 1.0,
        inherits_hue: true,
    },
    // Herbivores clamp at zero energy but never starve to death.
    starves: false,
    snapshot: SnapshotFields {
        caste: true,
        venom: false,
    },
};

static PREDATOR: SpeciesProfile = SpeciesProfile {
    name: "predator",
    energy_cap: 3.5,
    initial_energy: 2.0,
    base_hue: 5.0,
    spawn_speed: 55.0,
    max_speed: 180.0,
    genome: GenomeProfile {
        mutation_step: 0.22,
        speed: TraitRange::new(0.45, 2.0, 0.6, 0.9),
        sense: TraitRange::new(0.35, 2.1, 0.6, 0.9),
        metabolism: TraitRange::new(0.4, 2.2, 0.6, 1.0),
        hue_step: 8,
        hue_limit: 80,
        initial_hue_spread: 45,
        venom: None,
    },
    steering: SteeringProfile {
        target: SteerTarget::Prey(&[Species::Agent]),
        seek_radius: 200.0,
        desired_speed: 60.0,
        blend: 0.65,
        aggressive: true,
        separates: false,
    },
    collision: CollisionProfile {
        base_radius: 6.0,
        per_energy: 2.5,
    },
    metabolism: MetabolismProfile {
        drain_factor: 1.9,
        rest_factor: 0.4,
        aggression_drain: true,
    },
    hunt: Some(HuntProfile {
        eat_radius: 9.0,
        prey: &[PreyRule {
            prey: Species::Agent,
            bonus: 1.0,
            venom_penalty: 0.0,
            rest_min: 4.0,
            rest_span: 3.0,
        }],
        burst: BurstStyle::Absorb {
            count: 4,
            speed: 70.0,
            life: 0.5,
        },
    }),
    graze: None,
    reproduction: ReproductionProfile {
        threshold: Threshold::Fixed(2.8),
        min_age: 10.0,
        retention: 0.5,
        jitter: 10.0,
        chance: 1.0,
        inherits_hue: false,
    },
    starves: true,
    snapshot: PLAIN_FIELDS,
};

static APEX: SpeciesProfile = SpeciesProfile {
    name: "apex",
    energy_cap: 5.0,
    initial_energy: 3.0,
    base_hue: 200.0,
    spawn_speed: 35.0,
    max_speed: 120.0,
    genome: GenomeProfile {
        mutation_step: 0.08,
        speed: TraitRange::new(0.5, 1.4, 0.8, 0.3),
        sense: TraitRange::new(0.7, 1.8, 1.1, 0.4),
        metabolism: TraitRange::new(0.5, 1.6, 0.8, 0.3),
        hue_step: 3,
        hue_limit: 30,
        initial_hue_spread: 15,
        venom: None,
    },
    steering: SteeringProfile {
        target: SteerTarget::Prey(&[Species::Predator, Species::Coral]),
        seek_radius: 260.0,
        desired_speed: 55.0,
        blend: 0.8,
        aggressive: false,
        separates: false,
    },
    collision: CollisionProfile {
        base_radius: 9.0,
        per_energy: 2.0,
    },
    metabolism: MetabolismProfile {
        drain_factor: 1.1,
        rest_factor: 0.3,
        aggression_drain: false,
    },
    hunt: Some(HuntProfile {
        eat_radius: 12.0,
        prey: &[
            PreyRule {
                prey: Species::Predator,
                bonus: 1.5,
                venom_penalty: 0.0,
                rest_min: 4.0,
                rest_span: 2.0,
            },
            PreyRule {
                prey: Species::Coral,
                bonus: 1.0,
                venom_penalty: 0.5,
                rest_min: 3.0,
                rest_span: 2.0,
            },
        ],
        burst: BurstStyle::Radial { count: 8 },
    }),
    graze: None,
    reproduction: ReproductionProfile {
        threshold: Threshold::Fixed(3.2),
        min_age: 14.0,
        retention: 0.55,
        jitter: 12.0,
        chance: 1.0,
        inherits_hue: false,
    },
    starves: true,
    snapshot: PLAIN_FIELDS,
};

static CORAL: SpeciesProfile = SpeciesProfile {
    name: "coral",
    energy_cap: 3.0,
    initial_energy: 1.5,
    base_hue: 340.0,
    spawn_speed: 45.0,
    max_speed: 130.0,
    genome: GenomeProfile {
        mutation_step: 0.18,
        speed: TraitRange::new(0.4, 1.8, 0.5, 0.8),
        sense: TraitRange::new(0.5, 1.8, 0.7, 0.8),
        metabolism: TraitRange::new(0.4, 1.8, 0.5, 0.8),
        hue_step: 6,
        hue_limit: 40,
        initial_hue_spread: 20,
        venom: Some((TraitRange::new(0.0, 0.9, 0.0, 0.6), 0.12)),
    },
    steering: SteeringProfile {
        target: SteerTarget::Prey(&[Species::Agent]),
        seek_radius: 180.0,
        desired_speed: 50.0,
        blend: 0.7,
        aggressive: false,
        separates: false,
    },
    collision: CollisionProfile {
        base_radius: 5.0,
        per_energy: 2.0,
    },
    metabolism: MetabolismProfile {
        drain_factor: 1.5,
        rest_factor: 0.4,
        aggression_drain: false,
    },
    hunt: Some(HuntProfile {
        eat_radius: 8.0,
        prey: &[PreyRule {
            prey: Species::Agent,
            bonus: 0.9,
            venom_penalty: 0.0,
            rest_min: 3.0,
            rest_span: 2.0,
        }],
        burst: BurstStyle::Absorb {
            count: 3,
            speed: 60.0,
            life: 0.4,
        },
    }),
    graze: None,
    reproduction: ReproductionProfile {
        threshold: Threshold::Fixed(2.5),
        min_age: 12.0,
        retention: 0.5,
        jitter: 10.0,
        chance: 1.0,
        inherits_hue: false,
    },
    starves: true,
    snapshot: SnapshotFields {
        caste: false,
        venom: true,
    },
};

static TITAN: SpeciesProfile = SpeciesProfile {
    name: "titan",
    energy_cap: 6.0,
    initial_energy: 4.0,
    base_hue: 260.0,
    spawn_speed: 28.0,
    max_speed: 100.0,
    genome: GenomeProfile {
        mutation_step: 0.1,
        speed: TraitRange::new(0.5, 1.5, 0.8, 0.4),
        sense: TraitRange::new(0.8, 1.8, 1.0, 0.5),
        metabolism: TraitRange::new(0.5, 1.6, 0.8, 0.4),
        hue_step: 3,
        hue_limit: 20,
        initial_hue_spread: 10,
        venom: None,
    },
    steering: SteeringProfile {
        target: SteerTarget::Prey(&[Species::Apex]),
        seek_radius: 300.0,
        desired_speed: 44.0,
        blend: 0.72,
        aggressive: false,
        separates: false,
    },
    collision: CollisionProfile {
        base_radius: 10.0,
        per_energy: 2.2,
    },
    metabolism: MetabolismProfile {
        drain_factor: 1.25,
        rest_factor: 0.35,
        aggression_drain: false,
    },
    hunt: Some(HuntProfile {
        eat_radius: 13.0,
        prey: &[PreyRule {
            prey: Species::Apex,
            bonus: 1.6,
            venom_penalty: 0.0,
            rest_min: 5.0,
            rest_span: 3.0,
        }],
        burst: BurstStyle::Radial { count: 8 },
    }),
    graze: None,
    reproduction: ReproductionProfile {
        threshold: Threshold::Fixed(4.8),
        min_age: 20.0,
        retention: 0.6,
        jitter: 14.0,
        chance: 0.06,
        inherits_hue: false,
    },
    starves: true,
    snapshot: PLAIN_FIELDS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, species) in Species::ALL.iter().enumerate() {
            assert_eq!(species.index(), i);
        }
    }

    #[test]
    fn test_initial_trait_ranges_within_clamps() {
        for species in Species::ALL {
            let genome = species.profile().genome;
            for range in [genome.speed, genome.sense, genome.metabolism] {
                assert!(range.initial_base >= range.min, "{species}");
                assert!(range.initial_base + range.initial_span <= range.max, "{species}");
            }
        }
    }

    #[test]
    fn test_only_agents_graze_and_survive_starvation() {
        for species in Species::ALL {
            let profile = species.profile();
            let is_agent = species == Species::Agent;
            assert_eq!(profile.graze.is_some(), is_agent);
            assert_eq!(profile.hunt.is_none(), is_agent);
            assert_eq!(profile.starves, !is_agent);
        }
    }

    #[test]
    fn test_speed_cap_leaves_room_for_pursuit() {
        for species in Species::ALL {
            let profile = species.profile();
            let fastest = profile.genome.speed.max;
            let aggression = if profile.steering.aggressive { 1.15 } else { 1.0 };
            let pursuit = profile.steering.desired_speed * fastest * aggression;
            assert!(profile.max_speed > pursuit, "{species}");
            assert!(profile.max_speed > profile.spawn_speed * fastest, "{species}");
        }
    }

    #[test]
    fn test_collision_radius_grows_with_energy() {
        let collision = Species::Titan.profile().collision;
        assert_eq!(collision.radius(0.0), 10.0);
        assert!((collision.radius(2.0) - 14.4).abs() < 1e-5);
    }

    #[test]
    fn test_snapshot_field_descriptors() {
        assert!(Species::Agent.profile().snapshot.caste);
        assert!(Species::Coral.profile().snapshot.venom);
        assert!(!Species::Predator.profile().snapshot.caste);
        assert!(!Species::Titan.profile().snapshot.venom);
    }
}
