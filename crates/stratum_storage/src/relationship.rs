//! Reverse index from ids to the archetypes containing them.
//!
//! Every id in an archetype type, plus the wildcard keys derived from its
//! pairs, maps to the set of archetypes that contain it. Queries and
//! `World::each` start from the smallest of these sets instead of scanning
//! every archetype. Two further maps find all concrete pairs by relation or
//! by target, which is what deletion cleanup needs.

use std::collections::{HashMap, HashSet};

use stratum_foundation::Id;
use stratum_foundation::builtin::is_wildcard;

use crate::archetype::{Archetype, ArchetypeId, ArchetypeRecord};

/// The archetypes containing one id (or wildcard pair).
#[derive(Clone, Debug, Default)]
pub struct IdRecord {
    archetypes: HashMap<ArchetypeId, ArchetypeRecord>,
}

impl IdRecord {
    /// Returns the number of archetypes containing the id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns true if no archetype contains the id.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Returns where the id sits in one archetype.
    #[must_use]
    pub fn get(&self, archetype: ArchetypeId) -> Option<&ArchetypeRecord> {
        self.archetypes.get(&archetype)
    }
}

/// Maps ids to archetypes, and entities to the pairs mentioning them.
#[derive(Clone, Debug, Default)]
pub struct RelationshipIndex {
    records: HashMap<Id, IdRecord>,
    /// Relation index -> concrete pairs with that relation.
    by_relation: HashMap<u32, HashSet<Id>>,
    /// Target index -> concrete pairs with that target.
    by_target: HashMap<u32, HashSet<Id>>,
}

impl RelationshipIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every key of a newly created archetype.
    pub(crate) fn register(&mut self, archetype: &Archetype) {
        let aid = archetype.id();
        for (key, record) in archetype.record_keys() {
            self.records
                .entry(key)
                .or_default()
                .archetypes
                .insert(aid, *record);

            if let Some((relation, target)) = concrete_pair(key) {
                self.by_relation.entry(relation).or_default().insert(key);
                self.by_target.entry(target).or_default().insert(key);
            }
        }
    }

    /// Removes a destroyed archetype. Ids left without archetypes are dropped.
    pub(crate) fn unregister(&mut self, archetype: &Archetype) {
        let aid = archetype.id();
        for (key, _) in archetype.record_keys() {
            let Some(record) = self.records.get_mut(&key) else {
                continue;
            };
            record.archetypes.remove(&aid);
            if !record.is_empty() {
                continue;
            }
            self.records.remove(&key);

            if let Some((relation, target)) = concrete_pair(key) {
                remove_from(&mut self.by_relation, relation, key);
                remove_from(&mut self.by_target, target, key);
            }
        }
    }

    /// Returns the record for an id, if any archetype contains it.
    #[must_use]
    pub fn get(&self, id: Id) -> Option<&IdRecord> {
        self.records.get(&id)
    }

    /// Iterates over the archetypes containing an id.
    pub fn archetypes(&self, id: Id) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.records
            .get(&id)
            .into_iter()
            .flat_map(|record| record.archetypes.keys().copied())
    }

    /// Returns the number of archetypes containing an id.
    #[must_use]
    pub fn archetype_count(&self, id: Id) -> usize {
        self.records.get(&id).map_or(0, IdRecord::len)
    }

    /// Iterates over every concrete pair whose relation is `relation`.
    pub fn pairs_with_relation(&self, relation: Id) -> impl Iterator<Item = Id> + '_ {
        self.by_relation
            .get(&relation.index())
            .into_iter()
            .flat_map(|pairs| pairs.iter().copied())
    }

    /// Iterates over every concrete pair whose target is `target`.
    pub fn pairs_with_target(&self, target: Id) -> impl Iterator<Item = Id> + '_ {
        self.by_target
            .get(&target.index())
            .into_iter()
            .flat_map(|pairs| pairs.iter().copied())
    }

    /// Returns the number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn concrete_pair(id: Id) -> Option<(u32, u32)> {
    if !id.is_pair() {
        return None;
    }
    let relation = id.pair_relation();
    let target = id.pair_target();
    if is_wildcard(relation) || is_wildcard(target) {
        return None;
    }
    Some((relation.index(), target.index()))
}

fn remove_from(map: &mut HashMap<u32, HashSet<Id>>, key: u32, pair: Id) {
    if let Some(pairs) = map.get_mut(&key) {
        pairs.remove(&pair);
        if pairs.is_empty() {
            map.remove(&key);
        }
    }
}
