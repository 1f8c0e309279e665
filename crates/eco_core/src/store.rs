//! Entity store: id allocation plus sparse per-component tables.
//!
//! Each table maps [`EntityId`] to a row; an entity "has" a component iff
//! a row exists. Rows carry a version stamp from a per-table clock, bumped
//! on insert and on every mutable access. The snapshot encoder compares
//! stamps against what it last sent instead of diffing values.
//!
//! Tables are `BTreeMap`s so iteration is always in ascending id order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Burst, Creature, EntityId, ForceField, Position, Resource, Velocity};
use crate::species::Species;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Row<T> {
    value: T,
    version: u64,
}

/// Sparse table of one component type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTable<T> {
    rows: BTreeMap<EntityId, Row<T>>,
    clock: u64,
}

impl<T> Default for ComponentTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            clock: 0,
        }
    }
}

impl<T> ComponentTable<T> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Insert or replace the row for `id`.
    pub fn insert(&mut self, id: EntityId, value: T) {
        let version = self.tick();
        self.rows.insert(id, Row { value, version });
    }

    /// Get the row for `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.rows.get(&id).map(|row| &row.value)
    }

    /// Get the row for `id` mutably. Marks the row as changed.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.clock += 1;
        let version = self.clock;
        self.rows.get_mut(&id).map(|row| {
            row.version = version;
            &mut row.value
        })
    }

    /// Remove the row for `id`. Removing a missing row is a no-op.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.rows.remove(&id).map(|row| row.value)
    }

    /// Check if `id` has a row.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.rows.iter().map(|(id, row)| (*id, &row.value))
    }

    /// Iterate rows mutably in ascending id order. Marks every row visited.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        let clock = &mut self.clock;
        self.rows.iter_mut().map(move |(id, row)| {
            *clock += 1;
            row.version = *clock;
            (*id, &mut row.value)
        })
    }

    /// Snapshot of the ids currently present, ascending.
    ///
    /// Systems that create or destroy entities while walking a table
    /// iterate this copy instead of the live table.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.rows.keys().copied().collect()
    }

    /// Version stamp of the row for `id`.
    #[must_use]
    pub fn version(&self, id: EntityId) -> Option<u64> {
        self.rows.get(&id).map(|row| row.version)
    }

    /// Latest stamp issued by this table.
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }
}

/// All component tables plus id allocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    next_id: EntityId,
    free_particles: Vec<EntityId>,
    /// Positions of every spatial entity.
    pub positions: ComponentTable<Position>,
    /// Velocities of every mobile entity.
    pub velocities: ComponentTable<Velocity>,
    /// Creatures of all species.
    pub creatures: ComponentTable<Creature>,
    /// Plants and pods.
    pub resources: ComponentTable<Resource>,
    /// Painted force fields.
    pub force_fields: ComponentTable<ForceField>,
    /// Transient particles.
    pub bursts: ComponentTable<Burst>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Allocate a fresh id. Ids from this counter are never reused.
    pub fn create_entity(&mut self) -> EntityId {
        // Default-constructed stores start at 0; skip it so ids stay non-zero.
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocate an id for a transient particle, reusing a recycled one when
    /// available.
    pub fn acquire_particle(&mut self) -> EntityId {
        match self.free_particles.pop() {
            Some(id) => id,
            None => self.create_entity(),
        }
    }

    /// Destroy a particle and return its id to the free list.
    pub fn recycle_particle(&mut self, id: EntityId) {
        if self.bursts.contains(id) {
            self.destroy_entity(id);
            self.free_particles.push(id);
        }
    }

    /// Remove `id` from every table. Idempotent.
    pub fn destroy_entity(&mut self, id: EntityId) {
        self.positions.remove(id);
        self.velocities.remove(id);
        self.creatures.remove(id);
        self.resources.remove(id);
        self.force_fields.remove(id);
        self.bursts.remove(id);
    }

    /// True if any table holds a row for `id`.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.positions.contains(id)
            || self.velocities.contains(id)
            || self.creatures.contains(id)
            || self.resources.contains(id)
            || self.force_fields.contains(id)
            || self.bursts.contains(id)
    }

    /// Number of recycled particle ids waiting for reuse.
    #[must_use]
    pub fn free_particle_count(&self) -> usize {
        self.free_particles.len()
    }

    /// Live creature count per species, indexed by [`Species::index`].
    #[must_use]
    pub fn species_counts(&self) -> [usize; 5] {
        let mut counts = [0; 5];
        for (_, creature) in self.creatures.iter() {
            counts[creature.species.index()] += 1;
        }
        counts
    }

    /// Live creatures of one species.
    #[must_use]
    pub fn count(&self, species: Species) -> usize {
        self.species_counts()[species.index()]
    }

    /// Ids of one species, ascending.
    #[must_use]
    pub fn species_ids(&self, species: Species) -> Vec<EntityId> {
        self.creatures
            .iter()
            .filter(|(_, creature)| creature.species == species)
            .map(|(id, _)| id)
            .collect()
    }

    /// Total creatures across species.
    #[must_use]
    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    /// True when every species has died out.
    #[must_use]
    pub fn is_extinct(&self) -> bool {
        self.creatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Dna;

    fn creature(species: Species) -> Creature {
        Creature {
            species,
            color_hue: 0.0,
            energy: 1.0,
            age: 0.0,
            rest: 0.0,
            dna: Dna::default(),
            caste: None,
            evolved: false,
        }
    }

    #[test]
    fn test_create_entity_is_monotonic() {
        let mut store = EntityStore::new();
        let a = store.create_entity();
        let b = store.create_entity();
        store.destroy_entity(a);
        let c = store.create_entity();
        assert_eq!(a, 1);
        assert!(b > a);
        assert!(c > b);
    }

    #[test]
    fn test_destroy_removes_every_component() {
        let mut store = EntityStore::new();
        let id = store.create_entity();
        store.positions.insert(id, Position::new(1.0, 2.0));
        store.velocities.insert(id, Velocity::ZERO);
        store.creatures.insert(id, creature(Species::Agent));

        store.destroy_entity(id);
        assert!(!store.is_alive(id));

        // Idempotent
        store.destroy_entity(id);
        assert!(!store.is_alive(id));
    }

    #[test]
    fn test_versions_bump_on_mutation() {
        let mut table = ComponentTable::new();
        table.insert(1, 10_u32);
        table.insert(2, 20_u32);
        let before = table.version(1).unwrap();

        let _ = table.get(1);
        assert_eq!(table.version(1), Some(before));

        *table.get_mut(1).unwrap() += 1;
        assert!(table.version(1).unwrap() > before);
        assert!(table.version(1).unwrap() > table.version(2).unwrap());
        assert_eq!(table.get(1), Some(&11));
    }

    #[test]
    fn test_iter_is_sorted_by_id() {
        let mut table = ComponentTable::new();
        for id in [5, 1, 3] {
            table.insert(id, id);
        }
        let ids: Vec<_> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(table.ids(), vec![1, 3, 5]);
    }

    #[test]
    fn test_particles_are_recycled() {
        let mut store = EntityStore::new();
        let first = store.acquire_particle();
        store.bursts.insert(
            first,
            Burst {
                velocity: crate::math::Vec2::ZERO,
                life: 1.0,
                hue: 0.0,
            },
        );
        store.recycle_particle(first);
        assert_eq!(store.free_particle_count(), 1);

        let reused = store.acquire_particle();
        assert_eq!(reused, first);
        assert_eq!(store.free_particle_count(), 0);

        // Not a burst: nothing to recycle
        let other = store.create_entity();
        store.recycle_particle(other);
        assert_eq!(store.free_particle_count(), 0);
    }

    #[test]
    fn test_species_counts() {
        let mut store = EntityStore::new();
        for species in [Species::Agent, Species::Agent, Species::Titan] {
            let id = store.create_entity();
            store.creatures.insert(id, creature(species));
        }
        assert_eq!(store.species_counts(), [2, 0, 0, 0, 1]);
        assert_eq!(store.count(Species::Titan), 1);
        assert_eq!(store.species_ids(Species::Agent), vec![1, 2]);
        assert!(!store.is_extinct());
    }
}
