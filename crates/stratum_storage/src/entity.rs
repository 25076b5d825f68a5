//! Entity lifecycle management with generational indices.
//!
//! The `EntityIndex` hands out ids, tracks which archetype row holds each live
//! entity, and bumps generations on release so stale ids are detected.

// Allow u32 <-> usize casts - indices are bounded by MAX_INDEX
#![allow(clippy::cast_possible_truncation)]

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use stratum_foundation::{Error, ErrorKind, Id, MAX_GENERATION, MAX_INDEX, Result};
use tracing::warn;

use crate::archetype::ArchetypeId;

/// Where a live entity's data lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// Archetype holding the entity's row.
    pub archetype: ArchetypeId,
    /// Row within the archetype's columns.
    pub row: usize,
    /// Position in the dense array of live ids.
    pub dense: usize,
    /// The entity carries the `TAG` component.
    pub(crate) tag: bool,
    /// The entity has been used as a component, relation, or target, so the
    /// relationship index may hold entries for it.
    pub(crate) referenced: bool,
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Sparse/dense allocator for entity ids.
///
/// Freed indices are reused lowest-first. The component range
/// `[0, component_capacity)` and the entity range above it recycle
/// independently.
#[derive(Clone, Debug)]
pub struct EntityIndex {
    /// Live ids, unordered.
    dense: Vec<Id>,
    /// Slot per index, addressed by `Id::index`.
    sparse: Vec<Slot>,
    /// Freed entity-range indices.
    free: BinaryHeap<Reverse<u32>>,
    /// Freed component-range indices.
    free_components: BinaryHeap<Reverse<u32>>,
    /// Next never-used component index.
    next_component: u32,
    component_capacity: u32,
    /// Indices whose generation ran out.
    retired: usize,
}

impl EntityIndex {
    /// Creates an index reserving `component_capacity` low ids for components.
    #[must_use]
    pub fn new(component_capacity: u32) -> Self {
        Self::with_capacity(component_capacity, 0)
    }

    /// Creates an index with room for `entity_capacity` entities.
    #[must_use]
    pub fn with_capacity(component_capacity: u32, entity_capacity: usize) -> Self {
        let mut sparse = Vec::with_capacity(component_capacity as usize + entity_capacity);
        sparse.resize_with(component_capacity as usize, Slot::default);
        Self {
            dense: Vec::with_capacity(entity_capacity),
            sparse,
            free: BinaryHeap::new(),
            free_components: BinaryHeap::new(),
            next_component: 1,
            component_capacity,
            retired: 0,
        }
    }

    /// Allocates an ordinary entity whose row is `(archetype, row)`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CapacityExceeded`] if every index is in use.
    pub fn create(&mut self, archetype: ArchetypeId, row: usize) -> Result<Id> {
        let index = if let Some(Reverse(index)) = self.free.pop() {
            index
        } else {
            let index = self.sparse.len() as u32;
            if index > MAX_INDEX {
                return Err(Error::new(ErrorKind::CapacityExceeded { limit: MAX_INDEX }));
            }
            self.sparse.push(Slot::default());
            index
        };
        Ok(self.occupy(index, archetype, row))
    }

    /// Allocates an id from the low component range.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ComponentLimit`] if the range is exhausted.
    pub fn create_component(&mut self, archetype: ArchetypeId, row: usize) -> Result<Id> {
        let index = if let Some(Reverse(index)) = self.free_components.pop() {
            index
        } else if self.next_component < self.component_capacity {
            self.next_component += 1;
            self.next_component - 1
        } else {
            return Err(Error::new(ErrorKind::ComponentLimit {
                limit: self.component_capacity,
            }));
        };
        Ok(self.occupy(index, archetype, row))
    }

    /// Claims a specific component-range index. Used for well-known ids.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidId`] if the index is outside the component
    /// range or already occupied.
    pub fn reserve(&mut self, id: Id, archetype: ArchetypeId, row: usize) -> Result<Id> {
        let index = id.index();
        let occupied = self
            .sparse
            .get(index as usize)
            .is_none_or(|slot| slot.record.is_some());
        if index >= self.component_capacity || occupied {
            return Err(Error::invalid_id(id));
        }
        self.next_component = self.next_component.max(index + 1);
        Ok(self.occupy(index, archetype, row))
    }

    fn occupy(&mut self, index: u32, archetype: ArchetypeId, row: usize) -> Id {
        let dense = self.dense.len();
        let slot = &mut self.sparse[index as usize];
        let id = Id::entity(index, slot.generation);
        slot.record = Some(EntityRecord {
            archetype,
            row,
            dense,
            tag: false,
            referenced: false,
        });
        self.dense.push(id);
        id
    }

    /// Releases a live entity, bumping its generation.
    ///
    /// Returns the record it held, or `None` if the id was not alive.
    /// An index whose generation would wrap is retired instead of recycled.
    pub fn release(&mut self, id: Id) -> Option<EntityRecord> {
        if !self.is_alive(id) {
            return None;
        }
        let index = id.index();
        let slot = &mut self.sparse[index as usize];
        let record = slot.record.take()?;

        if slot.generation == MAX_GENERATION {
            warn!(index, "entity index retired after generation wrap-around");
            self.retired += 1;
        } else {
            slot.generation += 1;
            if index < self.component_capacity {
                self.free_components.push(Reverse(index));
            } else {
                self.free.push(Reverse(index));
            }
        }

        self.dense.swap_remove(record.dense);
        if let Some(moved) = self.dense.get(record.dense).copied() {
            if let Some(moved_record) = self.sparse[moved.index() as usize].record.as_mut() {
                moved_record.dense = record.dense;
            }
        }

        Some(record)
    }

    /// Checks if an id is a live entity of the current generation.
    #[must_use]
    pub fn is_alive(&self, id: Id) -> bool {
        !id.is_pair()
            && self
                .sparse
                .get(id.index() as usize)
                .is_some_and(|slot| slot.record.is_some() && slot.generation == id.generation())
    }

    /// Checks if the id's index slot is occupied, ignoring the generation.
    #[must_use]
    pub fn exists(&self, id: Id) -> bool {
        !id.is_pair() && self.is_occupied(id.index())
    }

    /// Checks if an index slot is occupied.
    #[must_use]
    pub fn is_occupied(&self, index: u32) -> bool {
        self.sparse
            .get(index as usize)
            .is_some_and(|slot| slot.record.is_some())
    }

    /// Returns the live id currently occupying an index.
    #[must_use]
    pub fn alive_at(&self, index: u32) -> Option<Id> {
        let slot = self.sparse.get(index as usize)?;
        slot.record.map(|_| Id::entity(index, slot.generation))
    }

    /// Returns the record for a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotAlive`] if the id is dead or stale.
    pub fn record(&self, id: Id) -> Result<&EntityRecord> {
        if id.is_pair() {
            return Err(Error::not_alive(id));
        }
        self.sparse
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.record.as_ref())
            .ok_or_else(|| Error::not_alive(id))
    }

    /// Returns the record at an index, ignoring the generation.
    #[must_use]
    pub fn record_at(&self, index: u32) -> Option<&EntityRecord> {
        self.sparse.get(index as usize)?.record.as_ref()
    }

    fn record_at_mut(&mut self, index: u32) -> Option<&mut EntityRecord> {
        self.sparse.get_mut(index as usize)?.record.as_mut()
    }

    /// Points an entity at a new archetype row.
    pub fn set_location(&mut self, id: Id, archetype: ArchetypeId, row: usize) {
        if let Some(record) = self.record_at_mut(id.index()) {
            record.archetype = archetype;
            record.row = row;
        }
    }

    /// Returns true if the id, or the relation of a pair, carries `TAG`.
    #[must_use]
    pub fn is_tag(&self, id: Id) -> bool {
        let index = if id.is_pair() {
            id.pair_relation().index()
        } else {
            id.index()
        };
        self.record_at(index).is_some_and(|record| record.tag)
    }

    pub(crate) fn set_tag(&mut self, id: Id, tag: bool) {
        if let Some(record) = self.record_at_mut(id.index()) {
            record.tag = tag;
        }
    }

    /// Returns true if the entity at this index may appear inside archetype
    /// types.
    #[must_use]
    pub fn is_referenced(&self, id: Id) -> bool {
        self.record_at(id.index()).is_some_and(|record| record.referenced)
    }

    /// Flags the halves of `id` as referenced by an archetype type.
    pub(crate) fn mark_referenced(&mut self, id: Id) {
        if id.is_pair() {
            for half in [id.pair_relation(), id.pair_target()] {
                if let Some(record) = self.record_at_mut(half.index()) {
                    record.referenced = true;
                }
            }
        } else if let Some(record) = self.record_at_mut(id.index()) {
            record.referenced = true;
        }
    }

    /// Returns the number of live entities, well-known ids included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Iterates over all live ids.
    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.dense.iter().copied()
    }

    /// Returns the current generation for an index, if the slot exists.
    #[must_use]
    pub fn generation(&self, index: u32) -> Option<u32> {
        self.sparse.get(index as usize).map(|slot| slot.generation)
    }

    /// Returns the number of indices retired after generation wrap-around.
    #[must_use]
    pub fn retired(&self) -> usize {
        self.retired
    }

    /// Returns the size of the reserved component range.
    #[must_use]
    pub fn component_capacity(&self) -> u32 {
        self.component_capacity
    }

    #[cfg(test)]
    fn force_generation(&mut self, index: u32, generation: u32) {
        self.sparse[index as usize].generation = generation;
    }
}
