//! Full and delta snapshots of world state.
//!
//! The owner thread turns the store into owned [`SnapshotMessage`] values
//! and sends them to a consumer, which rebuilds state with
//! [`SnapshotMirror`](crate::mirror::SnapshotMirror). Nothing is shared:
//! every message is a plain value.
//!
//! A full message carries every category as an id-sorted list. A delta
//! carries, per category, the entries whose rows changed since the previous
//! message plus the ids that disappeared. Change detection reads the row
//! version stamps kept by [`ComponentTable`](crate::store::ComponentTable)
//! rather than comparing values.
//!
//! Every message has a `sequence` number; deltas name the `base_sequence`
//! they continue so the consumer can detect a lost message.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{Caste, EntityId, PlantMorphology, ResourceKind};
use crate::error::{EcoError, Result};
use crate::simulation::Simulation;
use crate::species::Species;
use crate::store::EntityStore;
use crate::world::{Camera, Regime};

/// Performance figures shown by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerfStats {
    /// Owner frame rate.
    pub fps: f64,
    /// Average step duration.
    pub avg_step_ms: f64,
    /// Current effect quality.
    pub effect_quality: f32,
    /// Current heavy-system stride.
    pub update_stride: u32,
}

/// Header common to full and delta messages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Monotonic message number.
    pub sequence: u64,
    /// Simulation tick.
    pub tick: u64,
    /// Seed of the world the message describes.
    pub seed: u64,
    /// World width.
    pub width: f32,
    /// World height.
    pub height: f32,
    /// Current regime.
    pub regime: Regime,
    /// Viewer camera.
    pub camera: Camera,
    /// Performance figures.
    pub perf: PerfStats,
}

/// One creature as seen by the consumer.
///
/// The optional fields are present only for species whose profile asks for
/// them: caste and evolved for agents, venom for coral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreatureEntry {
    /// Entity id.
    pub id: EntityId,
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Velocity x.
    pub vx: f32,
    /// Velocity y.
    pub vy: f32,
    /// Display hue.
    pub color_hue: f32,
    /// Stored energy.
    pub energy: f32,
    /// Age in seconds.
    pub age: f32,
    /// Agent caste.
    pub caste: Option<Caste>,
    /// Agent evolved flag.
    pub evolved: Option<bool>,
    /// Coral venom.
    pub venom: Option<f32>,
}

/// One plant or pod.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Entity id.
    pub id: EntityId,
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Plant or pod.
    pub kind: ResourceKind,
    /// Food available.
    pub amount: f32,
    /// Seconds since the last regrowth or explosion.
    pub age: f32,
    /// Completed regrowth cycles.
    pub cycles: u32,
    /// Completed pod explosions.
    pub explosions: u32,
    /// Drawing traits for plants.
    pub morphology: Option<PlantMorphology>,
}

/// One burst particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstEntry {
    /// Entity id.
    pub id: EntityId,
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Remaining life.
    pub life: f32,
    /// Display hue.
    pub hue: f32,
}

/// One painted field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceFieldEntry {
    /// Entity id.
    pub id: EntityId,
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Signed strength.
    pub strength: f32,
    /// Influence radius.
    pub radius: f32,
}

/// Anything that appears in a snapshot list.
pub trait SnapshotEntry: Copy {
    /// Entity the entry describes.
    fn id(&self) -> EntityId;
}

impl SnapshotEntry for CreatureEntry {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl SnapshotEntry for ResourceEntry {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl SnapshotEntry for BurstEntry {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl SnapshotEntry for ForceFieldEntry {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Complete id-sorted lists for every category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentLists {
    /// Agents.
    pub agents: Vec<CreatureEntry>,
    /// Predators.
    pub predators: Vec<CreatureEntry>,
    /// Apex predators.
    pub apex: Vec<CreatureEntry>,
    /// Coral.
    pub coral: Vec<CreatureEntry>,
    /// Titans.
    pub titans: Vec<CreatureEntry>,
    /// Burst particles.
    pub bursts: Vec<BurstEntry>,
    /// Plants and pods.
    pub resources: Vec<ResourceEntry>,
    /// Painted fields.
    pub force_fields: Vec<ForceFieldEntry>,
}

impl ComponentLists {
    /// Capture the current store.
    #[must_use]
    pub fn capture(store: &EntityStore) -> Self {
        let mut lists = Self::default();
        for id in store.creatures.ids() {
            if let Some(entry) = creature_entry(store, id) {
                if let Some(species) = store.creatures.get(id).map(|c| c.species) {
                    lists.creatures_mut(species).push(entry);
                }
            }
        }
        lists.bursts = store
            .bursts
            .ids()
            .into_iter()
            .filter_map(|id| burst_entry(store, id))
            .collect();
        lists.resources = store
            .resources
            .ids()
            .into_iter()
            .filter_map(|id| resource_entry(store, id))
            .collect();
        lists.force_fields = store
            .force_fields
            .ids()
            .into_iter()
            .filter_map(|id| force_field_entry(store, id))
            .collect();
        lists
    }

    /// Creatures of one species.
    #[must_use]
    pub fn creatures(&self, species: Species) -> &[CreatureEntry] {
        match species {
            Species::Agent => &self.agents,
            Species::Predator => &self.predators,
            Species::Apex => &self.apex,
            Species::Coral => &self.coral,
            Species::Titan => &self.titans,
        }
    }

    /// Creatures of one species, mutably.
    pub fn creatures_mut(&mut self, species: Species) -> &mut Vec<CreatureEntry> {
        match species {
            Species::Agent => &mut self.agents,
            Species::Predator => &mut self.predators,
            Species::Apex => &mut self.apex,
            Species::Coral => &mut self.coral,
            Species::Titan => &mut self.titans,
        }
    }

    /// Creatures across every species.
    #[must_use]
    pub fn creature_count(&self) -> usize {
        Species::ALL.iter().map(|s| self.creatures(*s).len()).sum()
    }
}

/// Changes to one category since the base message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDelta<T> {
    /// New or changed entries, ascending id.
    pub upserts: Vec<T>,
    /// Ids no longer present, ascending.
    pub removes: Vec<EntityId>,
}

impl<T> Default for CategoryDelta<T> {
    fn default() -> Self {
        Self {
            upserts: Vec::new(),
            removes: Vec::new(),
        }
    }
}

impl<T> CategoryDelta<T> {
    /// True if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removes.is_empty()
    }
}

/// Per-category changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaLists {
    /// Agents.
    pub agents: CategoryDelta<CreatureEntry>,
    /// Predators.
    pub predators: CategoryDelta<CreatureEntry>,
    /// Apex predators.
    pub apex: CategoryDelta<CreatureEntry>,
    /// Coral.
    pub coral: CategoryDelta<CreatureEntry>,
    /// Titans.
    pub titans: CategoryDelta<CreatureEntry>,
    /// Burst particles.
    pub bursts: CategoryDelta<BurstEntry>,
    /// Plants and pods.
    pub resources: CategoryDelta<ResourceEntry>,
    /// Painted fields.
    pub force_fields: CategoryDelta<ForceFieldEntry>,
}

impl DeltaLists {
    /// Changes to one species.
    #[must_use]
    pub fn creatures(&self, species: Species) -> &CategoryDelta<CreatureEntry> {
        match species {
            Species::Agent => &self.agents,
            Species::Predator => &self.predators,
            Species::Apex => &self.apex,
            Species::Coral => &self.coral,
            Species::Titan => &self.titans,
        }
    }

    fn creatures_mut(&mut self, species: Species) -> &mut CategoryDelta<CreatureEntry> {
        match species {
            Species::Agent => &mut self.agents,
            Species::Predator => &mut self.predators,
            Species::Apex => &mut self.apex,
            Species::Coral => &mut self.coral,
            Species::Titan => &mut self.titans,
        }
    }

    /// Total upserts and removes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        let creatures: usize = Species::ALL
            .iter()
            .map(|s| {
                let delta = self.creatures(*s);
                delta.upserts.len() + delta.removes.len()
            })
            .sum();
        creatures
            + self.bursts.upserts.len()
            + self.bursts.removes.len()
            + self.resources.upserts.len()
            + self.resources.removes.len()
            + self.force_fields.upserts.len()
            + self.force_fields.removes.len()
    }
}

/// Complete world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullSnapshot {
    /// Header.
    pub envelope: Envelope,
    /// Every entity.
    pub components: ComponentLists,
}

/// Changes since `base_sequence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaSnapshot {
    /// Header.
    pub envelope: Envelope,
    /// Sequence of the message this delta continues.
    pub base_sequence: u64,
    /// Per-category changes.
    pub changes: DeltaLists,
}

/// A message on the snapshot channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotMessage {
    /// Complete state.
    Full(FullSnapshot),
    /// Incremental state.
    Delta(DeltaSnapshot),
}

impl SnapshotMessage {
    /// Header of either kind.
    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::Full(full) => &full.envelope,
            Self::Delta(delta) => &delta.envelope,
        }
    }

    /// True for a full message.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| EcoError::Codec(format!("Failed to encode snapshot: {e}")))
    }

    /// Decode from bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| EcoError::Codec(format!("Failed to decode snapshot: {e}")))
    }
}

fn creature_entry(store: &EntityStore, id: EntityId) -> Option<CreatureEntry> {
    let creature = store.creatures.get(id)?;
    let pos = store.positions.get(id)?.value;
    let vel = store.velocities.get(id).map(|v| v.value).unwrap_or_default();
    let fields = creature.species.profile().snapshot;
    Some(CreatureEntry {
        id,
        x: pos.x,
        y: pos.y,
        vx: vel.x,
        vy: vel.y,
        color_hue: creature.color_hue,
        energy: creature.energy,
        age: creature.age,
        caste: if fields.caste { creature.caste } else { None },
        evolved: fields.caste.then_some(creature.evolved),
        venom: fields.venom.then_some(creature.dna.venom),
    })
}

fn resource_entry(store: &EntityStore, id: EntityId) -> Option<ResourceEntry> {
    let resource = store.resources.get(id)?;
    let pos = store.positions.get(id)?.value;
    Some(ResourceEntry {
        id,
        x: pos.x,
        y: pos.y,
        kind: resource.kind,
        amount: resource.amount,
        age: resource.age,
        cycles: resource.cycles,
        explosions: resource.explosions,
        morphology: resource.morphology,
    })
}

fn burst_entry(store: &EntityStore, id: EntityId) -> Option<BurstEntry> {
    let burst = store.bursts.get(id)?;
    let pos = store.positions.get(id)?.value;
    Some(BurstEntry {
        id,
        x: pos.x,
        y: pos.y,
        life: burst.life,
        hue: burst.hue,
    })
}

fn force_field_entry(store: &EntityStore, id: EntityId) -> Option<ForceFieldEntry> {
    let field = store.force_fields.get(id)?;
    let pos = store.positions.get(id)?.value;
    Some(ForceFieldEntry {
        id,
        x: pos.x,
        y: pos.y,
        strength: field.strength,
        radius: field.radius,
    })
}

/// Table clocks at the moment a message was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Watermarks {
    positions: u64,
    velocities: u64,
    creatures: u64,
    resources: u64,
    force_fields: u64,
    bursts: u64,
}

impl Watermarks {
    fn of(store: &EntityStore) -> Self {
        Self {
            positions: store.positions.clock(),
            velocities: store.velocities.clock(),
            creatures: store.creatures.clock(),
            resources: store.resources.clock(),
            force_fields: store.force_fields.clock(),
            bursts: store.bursts.clock(),
        }
    }

    /// True if any row of `id` was written after these marks.
    fn changed(&self, store: &EntityStore, id: EntityId) -> bool {
        let newer = |version: Option<u64>, mark: u64| version.is_some_and(|v| v > mark);
        newer(store.positions.version(id), self.positions)
            || newer(store.velocities.version(id), self.velocities)
            || newer(store.creatures.version(id), self.creatures)
            || newer(store.resources.version(id), self.resources)
            || newer(store.force_fields.version(id), self.force_fields)
            || newer(store.bursts.version(id), self.bursts)
    }
}

/// What the consumer was last told.
#[derive(Debug, Clone)]
struct Baseline {
    sequence: u64,
    seed: u64,
    marks: Watermarks,
    creatures: [BTreeSet<EntityId>; 5],
    bursts: BTreeSet<EntityId>,
    resources: BTreeSet<EntityId>,
    force_fields: BTreeSet<EntityId>,
}

fn diff_category<T: SnapshotEntry>(
    store: &EntityStore,
    marks: &Watermarks,
    sent: &BTreeSet<EntityId>,
    current: &[T],
) -> CategoryDelta<T> {
    let upserts = current
        .iter()
        .filter(|entry| !sent.contains(&entry.id()) || marks.changed(store, entry.id()))
        .copied()
        .collect();
    let present: BTreeSet<EntityId> = current.iter().map(SnapshotEntry::id).collect();
    let removes = sent.difference(&present).copied().collect();
    CategoryDelta { upserts, removes }
}

fn id_set<T: SnapshotEntry>(entries: &[T]) -> BTreeSet<EntityId> {
    entries.iter().map(SnapshotEntry::id).collect()
}

/// Builds snapshot messages and remembers what was last sent.
#[derive(Debug, Clone, Default)]
pub struct SnapshotEncoder {
    next_sequence: u64,
    baseline: Option<Baseline>,
}

impl SnapshotEncoder {
    /// Encoder with no history. The first message is always full.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the last message built.
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.baseline.as_ref().map(|b| b.sequence)
    }

    /// Forget history so the next message is full.
    pub fn invalidate(&mut self) {
        self.baseline = None;
    }

    fn envelope(&mut self, sim: &Simulation, fps: f64) -> Envelope {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let globals = sim.globals();
        Envelope {
            sequence,
            tick: sim.tick(),
            seed: sim.seed(),
            width: sim.config().world.width,
            height: sim.config().world.height,
            regime: sim.regime(),
            camera: *sim.camera(),
            perf: PerfStats {
                fps,
                avg_step_ms: sim.governor().avg_step_ms(),
                effect_quality: globals.effect_quality,
                update_stride: globals.update_stride,
            },
        }
    }

    fn remember(&mut self, sequence: u64, sim: &Simulation, lists: &ComponentLists) {
        self.baseline = Some(Baseline {
            sequence,
            seed: sim.seed(),
            marks: Watermarks::of(sim.store()),
            creatures: Species::ALL.map(|s| id_set(lists.creatures(s))),
            bursts: id_set(&lists.bursts),
            resources: id_set(&lists.resources),
            force_fields: id_set(&lists.force_fields),
        });
    }

    /// Build a full message and make it the new baseline.
    pub fn full(&mut self, sim: &Simulation, fps: f64) -> SnapshotMessage {
        let envelope = self.envelope(sim, fps);
        let components = ComponentLists::capture(sim.store());
        self.remember(envelope.sequence, sim, &components);
        SnapshotMessage::Full(FullSnapshot {
            envelope,
            components,
        })
    }

    /// Build a delta against the last message. Falls back to a full
    /// message when there is no usable baseline, e.g. after a reset.
    pub fn delta(&mut self, sim: &Simulation, fps: f64) -> SnapshotMessage {
        let Some(baseline) = self.baseline.take() else {
            return self.full(sim, fps);
        };
        if baseline.seed != sim.seed() {
            return self.full(sim, fps);
        }

        let store = sim.store();
        let current = ComponentLists::capture(store);
        let marks = &baseline.marks;
        let mut changes = DeltaLists::default();
        for species in Species::ALL {
            *changes.creatures_mut(species) = diff_category(
                store,
                marks,
                &baseline.creatures[species.index()],
                current.creatures(species),
            );
        }
        changes.bursts = diff_category(store, marks, &baseline.bursts, &current.bursts);
        changes.resources = diff_category(store, marks, &baseline.resources, &current.resources);
        changes.force_fields =
            diff_category(store, marks, &baseline.force_fields, &current.force_fields);

        let envelope = self.envelope(sim, fps);
        self.remember(envelope.sequence, sim, &current);
        SnapshotMessage::Delta(DeltaSnapshot {
            envelope,
            base_sequence: baseline.sequence,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EcosystemConfig;
    use crate::math::Vec2;

    fn sim() -> Simulation {
        let config = EcosystemConfig::from_ron_str(
            "(population: (agents: 12, predators: 4, apex: 2, coral: 3, titans: 1, resources: 40))",
        )
        .unwrap();
        Simulation::new(config, 99)
    }

    #[test]
    fn test_full_lists_are_sorted_and_complete() {
        let sim = sim();
        let lists = ComponentLists::capture(sim.store());
        assert_eq!(lists.agents.len(), 12);
        assert_eq!(lists.titans.len(), 1);
        assert_eq!(lists.resources.len(), 40);
        assert!(lists.agents.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(lists.creature_count(), 22);
    }

    #[test]
    fn test_species_fields() {
        let sim = sim();
        let lists = ComponentLists::capture(sim.store());
        assert!(lists.agents.iter().all(|a| a.caste.is_some() && a.evolved.is_some()));
        assert!(lists.agents.iter().all(|a| a.venom.is_none()));
        assert!(lists.coral.iter().all(|c| c.venom.is_some() && c.caste.is_none()));
        assert!(lists.predators.iter().all(|p| p.venom.is_none() && p.evolved.is_none()));
    }

    #[test]
    fn test_first_message_is_full_then_deltas() {
        let mut sim = sim();
        let mut encoder = SnapshotEncoder::new();

        let first = encoder.delta(&sim, 60.0);
        assert!(first.is_full());
        assert_eq!(first.envelope().sequence, 0);

        sim.step(0.06);
        let second = encoder.delta(&sim, 60.0);
        let SnapshotMessage::Delta(delta) = second else {
            panic!("expected delta");
        };
        assert_eq!(delta.base_sequence, 0);
        assert_eq!(delta.envelope.sequence, 1);
        assert_eq!(delta.envelope.tick, 1);
    }

    #[test]
    fn test_unchanged_store_yields_empty_delta() {
        let sim = sim();
        let mut encoder = SnapshotEncoder::new();
        encoder.full(&sim, 0.0);
        let SnapshotMessage::Delta(delta) = encoder.delta(&sim, 0.0) else {
            panic!("expected delta");
        };
        assert_eq!(delta.changes.change_count(), 0);
    }

    #[test]
    fn test_removed_and_painted_entities_appear_in_delta() {
        let mut sim = sim();
        let mut encoder = SnapshotEncoder::new();
        encoder.full(&sim, 0.0);

        let victim = sim.store().species_ids(Species::Predator)[0];
        sim.store_mut().destroy_entity(victim);
        let field = sim.paint_force_field(Vec2::new(50.0, 50.0), 1.0);

        let SnapshotMessage::Delta(delta) = encoder.delta(&sim, 0.0) else {
            panic!("expected delta");
        };
        assert_eq!(delta.changes.predators.removes, vec![victim]);
        assert_eq!(delta.changes.force_fields.upserts.len(), 1);
        assert_eq!(delta.changes.force_fields.upserts[0].id, field);
        assert!(delta.changes.agents.is_empty());
    }

    #[test]
    fn test_reset_forces_full() {
        let mut sim = sim();
        let mut encoder = SnapshotEncoder::new();
        encoder.full(&sim, 0.0);
        sim.reset();
        assert!(encoder.delta(&sim, 0.0).is_full());
    }

    #[test]
    fn test_codec_round_trip_and_garbage() {
        let sim = sim();
        let mut encoder = SnapshotEncoder::new();
        let message = encoder.full(&sim, 30.0);
        let bytes = message.to_bytes().unwrap();
        assert_eq!(SnapshotMessage::from_bytes(&bytes).unwrap(), message);

        let err = SnapshotMessage::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, EcoError::Codec(_)));
    }
}
