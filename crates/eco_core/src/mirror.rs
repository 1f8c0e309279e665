//! Consumer-side reconstruction of world state from snapshot messages.

use std::collections::BTreeMap;

use crate::components::EntityId;
use crate::error::{EcoError, Result};
use crate::snapshot::{
    BurstEntry, CategoryDelta, ComponentLists, CreatureEntry, Envelope, ForceFieldEntry,
    ResourceEntry, SnapshotEntry, SnapshotMessage,
};
use crate::species::Species;

#[derive(Debug, Clone)]
struct Table<T> {
    rows: BTreeMap<EntityId, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: SnapshotEntry> Table<T> {
    fn from_list(entries: &[T]) -> Self {
        Self {
            rows: entries.iter().map(|e| (e.id(), *e)).collect(),
        }
    }

    fn apply(&mut self, delta: &CategoryDelta<T>) {
        for id in &delta.removes {
            self.rows.remove(id);
        }
        for entry in &delta.upserts {
            self.rows.insert(entry.id(), *entry);
        }
    }

    fn to_list(&self) -> Vec<T> {
        self.rows.values().copied().collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    creatures: [Table<CreatureEntry>; 5],
    bursts: Table<BurstEntry>,
    resources: Table<ResourceEntry>,
    force_fields: Table<ForceFieldEntry>,
}

/// Rebuilds world state from a stream of full and delta messages.
///
/// A delta is accepted only if its `base_sequence` matches the last applied
/// message. On [`EcoError::SequenceGap`] or [`EcoError::MissingBaseline`] the
/// mirror keeps its previous state and the caller should ask the owner for a
/// resync.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMirror {
    envelope: Option<Envelope>,
    tables: Tables,
}

impl SnapshotMirror {
    /// Mirror with no state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header of the last applied message.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    /// True once a full message has been applied.
    #[must_use]
    pub fn has_baseline(&self) -> bool {
        self.envelope.is_some()
    }

    /// Apply one message.
    pub fn apply(&mut self, message: &SnapshotMessage) -> Result<()> {
        match message {
            SnapshotMessage::Full(full) => {
                let lists = &full.components;
                self.tables = Tables {
                    creatures: Species::ALL.map(|s| Table::from_list(lists.creatures(s))),
                    bursts: Table::from_list(&lists.bursts),
                    resources: Table::from_list(&lists.resources),
                    force_fields: Table::from_list(&lists.force_fields),
                };
                self.envelope = Some(full.envelope);
                Ok(())
            }
            SnapshotMessage::Delta(delta) => {
                let Some(current) = self.envelope else {
                    return Err(EcoError::MissingBaseline);
                };
                if delta.base_sequence != current.sequence {
                    return Err(EcoError::SequenceGap {
                        expected: current.sequence,
                        received: delta.base_sequence,
                    });
                }
                let changes = &delta.changes;
                for species in Species::ALL {
                    self.tables.creatures[species.index()].apply(changes.creatures(species));
                }
                self.tables.bursts.apply(&changes.bursts);
                self.tables.resources.apply(&changes.resources);
                self.tables.force_fields.apply(&changes.force_fields);
                self.envelope = Some(delta.envelope);
                Ok(())
            }
        }
    }

    /// Current state as id-sorted lists, in the same shape as a full
    /// message.
    #[must_use]
    pub fn components(&self) -> ComponentLists {
        let mut lists = ComponentLists::default();
        for species in Species::ALL {
            *lists.creatures_mut(species) = self.tables.creatures[species.index()].to_list();
        }
        lists.bursts = self.tables.bursts.to_list();
        lists.resources = self.tables.resources.to_list();
        lists.force_fields = self.tables.force_fields.to_list();
        lists
    }

    /// Creatures currently mirrored.
    #[must_use]
    pub fn creature_count(&self) -> usize {
        self.tables.creatures.iter().map(|t| t.rows.len()).sum()
    }
}
