//! Columnar archetype storage.
//!
//! An archetype holds every entity whose type (sorted id list) is identical.
//! Each non-tag id in the type owns one column, index-aligned with the
//! `entities` array, so iterating a component is a linear scan.
//!
//! Archetypes live in an arena addressed by [`ArchetypeId`]. Slots of
//! destroyed archetypes are never reused, so an `ArchetypeId` held by a cached
//! query either resolves to the archetype it was taken from or to nothing.

// Allow usize -> u32 casts - archetype counts are far below u32::MAX
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use stratum_foundation::builtin::WILDCARD;
use stratum_foundation::{Error, Id, Result, Value, pair};
use tracing::trace;

use crate::graph::Edge;
use crate::relationship::RelationshipIndex;

/// Index of an archetype in the store's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The archetype with the empty type. Every new entity starts here.
    pub const ROOT: Self = Self(0);

    /// Creates an archetype id from a raw arena index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archetype#{}", self.0)
    }
}

/// Where an id sits inside one archetype.
///
/// For wildcard pair keys the record points at the first matching pair and
/// `count` says how many consecutive-or-not pairs matched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArchetypeRecord {
    /// Position of the (first matching) id in the archetype type.
    pub index: usize,
    /// Number of ids in the type matched by the key.
    pub count: usize,
    /// Column holding the values of the first matching id that has data;
    /// `None` if every match is a tag.
    pub column: Option<usize>,
}

/// A set of entities sharing one type, stored as parallel columns.
pub struct Archetype {
    id: ArchetypeId,
    types: Box<[Id]>,
    entities: Vec<Id>,
    columns: Vec<Vec<Value>>,
    records: HashMap<Id, ArchetypeRecord>,
    pub(crate) edges: HashMap<Id, Edge>,
}

impl Archetype {
    /// Builds an empty archetype for a sorted, deduplicated type.
    ///
    /// Pairs also register wildcard keys (`(r, *)`, `(*, t)`, `(*, *)`) so a
    /// wildcard lookup is a single map probe.
    pub(crate) fn new(id: ArchetypeId, types: Box<[Id]>, is_tag: impl Fn(Id) -> bool) -> Self {
        let mut records = HashMap::with_capacity(types.len());
        let mut column_count = 0;

        for (index, &ty) in types.iter().enumerate() {
            let column = if is_tag(ty) {
                None
            } else {
                column_count += 1;
                Some(column_count - 1)
            };
            records.insert(
                ty,
                ArchetypeRecord {
                    index,
                    count: 1,
                    column,
                },
            );

            if ty.is_pair() {
                let relation = ty.pair_relation();
                let target = ty.pair_target();
                for key in [
                    pair(relation, WILDCARD),
                    pair(WILDCARD, target),
                    pair(WILDCARD, WILDCARD),
                ] {
                    records
                        .entry(key)
                        .and_modify(|record: &mut ArchetypeRecord| {
                            record.count += 1;
                            // Values come from the first match that has data
                            record.column = record.column.or(column);
                        })
                        .or_insert(ArchetypeRecord {
                            index,
                            count: 1,
                            column,
                        });
                }
            }
        }

        Self {
            id,
            types,
            entities: Vec::new(),
            columns: vec![Vec::new(); column_count],
            records,
            edges: HashMap::new(),
        }
    }

    /// Returns this archetype's id.
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Returns the sorted type signature.
    #[must_use]
    pub fn types(&self) -> &[Id] {
        &self.types
    }

    /// Returns the entity stored in each row.
    #[must_use]
    pub fn entities(&self) -> &[Id] {
        &self.entities
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity lives here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks if the type contains an id. Wildcard pairs are accepted.
    #[must_use]
    pub fn has(&self, id: Id) -> bool {
        self.records.contains_key(&id)
    }

    /// Returns the record for an id or wildcard pair.
    #[must_use]
    pub fn record(&self, id: Id) -> Option<&ArchetypeRecord> {
        self.records.get(&id)
    }

    /// Iterates over every record key, wildcard keys included.
    pub fn record_keys(&self) -> impl Iterator<Item = (Id, &ArchetypeRecord)> + '_ {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Returns the number of data columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns a column's values, index-aligned with [`Archetype::entities`].
    #[must_use]
    pub fn column(&self, column: usize) -> Option<&[Value]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Returns the value of `id` in `row`, or `None` for tags and absent ids.
    #[must_use]
    pub fn value(&self, row: usize, id: Id) -> Option<&Value> {
        let column = self.records.get(&id)?.column?;
        self.columns.get(column)?.get(row)
    }

    pub(crate) fn value_mut(&mut self, row: usize, column: usize) -> Option<&mut Value> {
        self.columns.get_mut(column)?.get_mut(row)
    }

    /// Returns the cached graph edge for an id, if any transition was taken.
    #[must_use]
    pub fn edge(&self, id: Id) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Appends a row for an entity. Columns must be filled by the caller.
    pub(crate) fn push_entity(&mut self, entity: Id) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Pushes a value into one column.
    pub(crate) fn push_value(&mut self, column: usize, value: Value) {
        self.columns[column].push(value);
    }

    /// Removes a row by moving the last row into it.
    ///
    /// Returns the entity that now occupies `row`, if one was moved.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<Id> {
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.entities.get(row).copied()
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("types", &self.types)
            .field("entities", &self.entities.len())
            .field("columns", &self.columns.len())
            .finish_non_exhaustive()
    }
}

/// The arena of archetypes plus the lookup structures kept in sync with it.
#[derive(Debug)]
pub struct ArchetypeStore {
    archetypes: Vec<Option<Archetype>>,
    by_type: HashMap<Box<[Id]>, ArchetypeId>,
    pub(crate) relationships: RelationshipIndex,
    live: usize,
}

impl Default for ArchetypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeStore {
    /// Creates a store holding only the root archetype.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a store with room for `capacity` archetypes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut store = Self {
            archetypes: Vec::with_capacity(capacity.max(1)),
            by_type: HashMap::with_capacity(capacity),
            relationships: RelationshipIndex::new(),
            live: 0,
        };
        store.find_or_create(&[], |_| false);
        store
    }

    /// Returns the archetype for a sorted type, creating it on first use.
    ///
    /// `is_tag` decides which ids get a column; it is only consulted when the
    /// archetype is created.
    pub fn find_or_create(&mut self, types: &[Id], is_tag: impl Fn(Id) -> bool) -> ArchetypeId {
        debug_assert!(types.windows(2).all(|w| w[0] < w[1]), "type must be sorted");
        if let Some(&id) = self.by_type.get(types) {
            return id;
        }

        let id = ArchetypeId::new(self.archetypes.len() as u32);
        let types: Box<[Id]> = types.into();
        let archetype = Archetype::new(id, types.clone(), is_tag);
        trace!(archetype = %id, types = ?archetype.types(), "created archetype");

        self.relationships.register(&archetype);
        self.by_type.insert(types, id);
        self.archetypes.push(Some(archetype));
        self.live += 1;
        id
    }

    /// Looks up an archetype by type without creating it.
    #[must_use]
    pub fn find(&self, types: &[Id]) -> Option<ArchetypeId> {
        self.by_type.get(types).copied()
    }

    /// Returns an archetype, or `None` if it was destroyed.
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.index())?.as_mut()
    }

    pub(crate) fn try_get(&self, id: ArchetypeId) -> Result<&Archetype> {
        self.get(id)
            .ok_or_else(|| Error::internal(format!("{id} was destroyed while in use")))
    }

    pub(crate) fn try_get_mut(&mut self, id: ArchetypeId) -> Result<&mut Archetype> {
        self.get_mut(id)
            .ok_or_else(|| Error::internal(format!("{id} was destroyed while in use")))
    }

    /// Returns the root (empty-type) archetype.
    ///
    /// # Panics
    ///
    /// Never in practice: the root archetype is created with the store and
    /// cannot be destroyed.
    #[must_use]
    pub fn root(&self) -> &Archetype {
        self.archetypes[ArchetypeId::ROOT.index()]
            .as_ref()
            .expect("root archetype always exists")
    }

    /// Iterates over live archetypes.
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> + '_ {
        self.archetypes.iter().flatten()
    }

    /// Returns the number of live archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if only destroyed slots remain (never, in practice).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the relationship index over this store's archetypes.
    #[must_use]
    pub fn relationships(&self) -> &RelationshipIndex {
        &self.relationships
    }

    /// Borrows two distinct archetypes mutably.
    pub(crate) fn pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> Result<(&mut Archetype, &mut Archetype)> {
        if a == b {
            return Err(Error::internal(format!("cannot borrow {a} twice")));
        }
        let (lo, hi, swapped) = if a < b { (a, b, false) } else { (b, a, true) };
        let (left, right) = self.archetypes.split_at_mut(hi.index());
        let first = left
            .get_mut(lo.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::internal(format!("{lo} was destroyed while in use")))?;
        let second = right
            .first_mut()
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::internal(format!("{hi} was destroyed while in use")))?;
        Ok(if swapped { (second, first) } else { (first, second) })
    }

    /// Moves the entity in `src[row]` to the end of `dst`.
    ///
    /// Values of ids present in both types move across; values of ids only in
    /// `src` are dropped; columns only in `dst` are filled by `fill`.
    /// Returns the new row and the entity swapped into `src[row]`, if any.
    ///
    /// # Errors
    ///
    /// Returns an internal error if either archetype was destroyed.
    pub(crate) fn move_row(
        &mut self,
        src: ArchetypeId,
        row: usize,
        dst: ArchetypeId,
        mut fill: impl FnMut(Id) -> Value,
    ) -> Result<(usize, Option<Id>)> {
        let (from, to) = self.pair_mut(src, dst)?;
        let entity = from.entities[row];
        let new_row = to.push_entity(entity);

        for &ty in from.types.iter() {
            let Some(src_column) = from.records.get(&ty).and_then(|r| r.column) else {
                continue;
            };
            let value = from.columns[src_column].swap_remove(row);
            if let Some(dst_column) = to.records.get(&ty).and_then(|r| r.column) {
                to.columns[dst_column].push(value);
            }
        }
        from.entities.swap_remove(row);
        let moved = from.entities.get(row).copied();

        for &ty in to.types.iter() {
            if let Some(column) = to.records.get(&ty).and_then(|r| r.column) {
                if to.columns[column].len() == new_row {
                    to.columns[column].push(fill(ty));
                }
            }
        }

        Ok((new_row, moved))
    }

    /// Destroys an archetype, unlinking it from the graph and the
    /// relationship index. The root archetype is never destroyed.
    pub(crate) fn destroy(&mut self, id: ArchetypeId) -> Option<Archetype> {
        if id == ArchetypeId::ROOT {
            return None;
        }
        let archetype = self.archetypes.get_mut(id.index())?.take()?;
        self.unlink_edges(&archetype);
        self.by_type.remove(archetype.types());
        self.relationships.unregister(&archetype);
        self.live -= 1;
        trace!(archetype = %id, "destroyed archetype");
        Some(archetype)
    }
}
