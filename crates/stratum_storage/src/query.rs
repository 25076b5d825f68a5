//! Queries over archetypes.
//!
//! A [`Query`] is an owned filter: the ids whose values it returns (terms),
//! ids an entity must also have (`with`), and ids it must not have
//! (`without`). Iterating borrows the world immutably, so the archetype set
//! cannot change underneath an iterator.
//!
//! Matching starts from the smallest archetype set in the relationship index
//! and checks the remaining ids against each candidate's records.

use std::sync::Arc;

use stratum_foundation::{Error, Id, Result, Value};

use crate::archetype::{Archetype, ArchetypeId, ArchetypeStore};
use crate::world::World;

/// Maximum number of ids a query may name across terms, `with`, and `without`.
pub const MAX_QUERY_IDS: usize = 32;

/// A filter selecting entities by the ids in their type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    terms: Vec<Id>,
    with: Vec<Id>,
    without: Vec<Id>,
}

impl Query {
    /// Creates a query returning the values of `terms`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidQuery`](stratum_foundation::ErrorKind::InvalidQuery)
    /// if `terms` is empty, repeats an id, or contains the null id.
    pub fn new(terms: &[Id]) -> Result<Self> {
        if terms.is_empty() {
            return Err(Error::invalid_query("a query needs at least one term"));
        }
        let query = Self {
            terms: Vec::with_capacity(terms.len()),
            with: Vec::new(),
            without: Vec::new(),
        };
        query.extend(terms, Slot::Terms)
    }

    /// Also requires `ids`, without returning their values.
    ///
    /// # Errors
    ///
    /// Returns an error if an id is null, already named, or excluded.
    pub fn with(self, ids: &[Id]) -> Result<Self> {
        self.extend(ids, Slot::With)
    }

    /// Excludes entities having any of `ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if an id is null or already named by the query.
    pub fn without(self, ids: &[Id]) -> Result<Self> {
        self.extend(ids, Slot::Without)
    }

    fn extend(mut self, ids: &[Id], slot: Slot) -> Result<Self> {
        for &id in ids {
            if id.is_null() {
                return Err(Error::invalid_query("the null id cannot be queried"));
            }
            if self.mentions(id) {
                return Err(Error::invalid_query(format!(
                    "{id:?} appears more than once"
                )));
            }
            match slot {
                Slot::Terms => self.terms.push(id),
                Slot::With => self.with.push(id),
                Slot::Without => self.without.push(id),
            }
        }
        let total = self.terms.len() + self.with.len() + self.without.len();
        if total > MAX_QUERY_IDS {
            return Err(Error::too_many_arguments(MAX_QUERY_IDS, total));
        }
        Ok(self)
    }

    fn mentions(&self, id: Id) -> bool {
        self.terms.contains(&id) || self.with.contains(&id) || self.without.contains(&id)
    }

    /// Returns the ids whose values each row carries.
    #[must_use]
    pub fn terms(&self) -> &[Id] {
        &self.terms
    }

    /// Returns the required ids that carry no value in rows.
    #[must_use]
    pub fn with_ids(&self) -> &[Id] {
        &self.with
    }

    /// Returns the excluded ids.
    #[must_use]
    pub fn without_ids(&self) -> &[Id] {
        &self.without
    }

    /// Returns the archetypes matching this query, in ascending id order.
    #[must_use]
    pub fn archetypes(&self, world: &World) -> Vec<ArchetypeId> {
        self.matches(world.store()).into_iter().map(|m| m.id).collect()
    }

    /// Iterates over matching rows.
    #[must_use]
    pub fn iter<'w>(&self, world: &'w World) -> QueryIter<'w> {
        QueryIter::new(world.store(), self.matches(world.store()))
    }

    /// Collects the matching entities.
    #[must_use]
    pub fn entities(&self, world: &World) -> Vec<Id> {
        self.iter(world).map(|row| row.entity()).collect()
    }

    /// Counts the matching entities without visiting rows.
    #[must_use]
    pub fn count(&self, world: &World) -> usize {
        let store = world.store();
        self.matches(store)
            .iter()
            .filter_map(|m| store.get(m.id))
            .map(Archetype::len)
            .sum()
    }

    /// Snapshots the current matches for repeated iteration.
    #[must_use]
    pub fn cached(&self, world: &World) -> CachedQuery {
        CachedQuery {
            matched: self.matches(world.store()),
            query: self.clone(),
        }
    }

    /// Rewrites the term values of every matching row in place.
    ///
    /// The callback receives the entity and one value per term, in term order.
    /// Tag terms are passed as [`Value::Nil`] and anything written to them is
    /// discarded. When two terms resolve to the same column, such as
    /// `(r, *)` and `(r, t)`, both see the stored value and only the earlier
    /// term's value is written back. Hooks do not fire.
    pub fn replace(&self, world: &mut World, mut f: impl FnMut(Id, &mut [Value])) {
        let matched = self.matches(world.store());
        let store = world.store_mut();
        let mut values = vec![Value::Nil; self.terms.len()];

        for m in matched {
            let Some(archetype) = store.get_mut(m.id) else {
                continue;
            };
            // A wildcard term can share its column with an exact term; the
            // first term naming a column owns it, later ones get a copy
            let owners: Vec<Option<usize>> = m
                .columns
                .iter()
                .enumerate()
                .map(|(term, column)| {
                    column.and_then(|c| m.columns[..term].iter().position(|&o| o == Some(c)))
                })
                .collect();

            for row in 0..archetype.len() {
                for term in 0..values.len() {
                    values[term] = match (owners[term], m.columns[term]) {
                        (Some(owner), _) => values[owner].clone(),
                        (None, Some(c)) => archetype
                            .value_mut(row, c)
                            .map(std::mem::take)
                            .unwrap_or_default(),
                        (None, None) => Value::Nil,
                    };
                }
                f(archetype.entities()[row], &mut values);
                for term in 0..values.len() {
                    if owners[term].is_some() {
                        continue;
                    }
                    if let Some(slot) = m.columns[term].and_then(|c| archetype.value_mut(row, c)) {
                        *slot = std::mem::take(&mut values[term]);
                    }
                }
            }
        }
    }

    fn matches(&self, store: &ArchetypeStore) -> Vec<MatchedArchetype> {
        let index = store.relationships();
        let required = || self.terms.iter().chain(&self.with).copied();

        let Some(seed) = required().min_by_key(|&id| index.archetype_count(id)) else {
            return Vec::new();
        };

        let mut matched: Vec<MatchedArchetype> = index
            .archetypes(seed)
            .filter_map(|aid| store.get(aid))
            .filter(|arch| required().all(|id| arch.has(id)))
            .filter(|arch| !self.without.iter().any(|&id| arch.has(id)))
            .map(|arch| MatchedArchetype {
                id: arch.id(),
                columns: self
                    .terms
                    .iter()
                    .map(|&id| arch.record(id).and_then(|r| r.column))
                    .collect(),
            })
            .collect();
        matched.sort_by_key(|m| m.id);
        matched
    }
}

#[derive(Copy, Clone)]
enum Slot {
    Terms,
    With,
    Without,
}

#[derive(Clone, Debug)]
struct MatchedArchetype {
    id: ArchetypeId,
    /// Column per term; `None` for tags.
    columns: Arc<[Option<usize>]>,
}

/// One matching entity and its term values.
#[derive(Clone, Debug)]
pub struct QueryRow<'w> {
    entity: Id,
    archetype: &'w Archetype,
    row: usize,
    columns: Arc<[Option<usize>]>,
}

impl<'w> QueryRow<'w> {
    /// Returns the entity.
    #[must_use]
    pub fn entity(&self) -> Id {
        self.entity
    }

    /// Returns the value of the term at `term`, or `None` for tags.
    #[must_use]
    pub fn get(&self, term: usize) -> Option<&'w Value> {
        let column = (*self.columns.get(term)?)?;
        self.archetype.column(column)?.get(self.row)
    }

    /// Returns the number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the query had no terms (never for a built query).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over the term values in term order.
    pub fn values(&self) -> impl Iterator<Item = Option<&'w Value>> + '_ {
        (0..self.len()).map(move |term| self.get(term))
    }

    /// Returns the archetype holding this row.
    #[must_use]
    pub fn archetype(&self) -> &'w Archetype {
        self.archetype
    }
}

/// Iterator over the rows of matched archetypes.
pub struct QueryIter<'w> {
    store: &'w ArchetypeStore,
    matched: std::vec::IntoIter<MatchedArchetype>,
    current: Option<(&'w Archetype, Arc<[Option<usize>]>)>,
    row: usize,
}

impl<'w> QueryIter<'w> {
    fn new(store: &'w ArchetypeStore, matched: Vec<MatchedArchetype>) -> Self {
        Self {
            store,
            matched: matched.into_iter(),
            current: None,
            row: 0,
        }
    }
}

impl<'w> Iterator for QueryIter<'w> {
    type Item = QueryRow<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((archetype, columns)) = &self.current {
                let archetype: &'w Archetype = *archetype;
                if let Some(&entity) = archetype.entities().get(self.row) {
                    let row = self.row;
                    self.row += 1;
                    return Some(QueryRow {
                        entity,
                        archetype,
                        row,
                        columns: Arc::clone(columns),
                    });
                }
            }
            // Destroyed archetypes (possible with cached matches) are skipped
            let next = self.matched.next()?;
            self.current = self.store.get(next.id).map(|arch| (arch, next.columns));
            self.row = 0;
        }
    }
}

/// A query whose archetype matches were computed once.
///
/// Archetypes created after caching are not seen until [`CachedQuery::refresh`].
/// Destroyed archetypes are skipped.
#[derive(Clone, Debug)]
pub struct CachedQuery {
    query: Query,
    matched: Vec<MatchedArchetype>,
}

impl CachedQuery {
    /// Iterates over rows of the cached archetypes.
    #[must_use]
    pub fn iter<'w>(&self, world: &'w World) -> QueryIter<'w> {
        QueryIter::new(world.store(), self.matched.clone())
    }

    /// Recomputes the matched archetypes.
    pub fn refresh(&mut self, world: &World) {
        self.matched = self.query.matches(world.store());
    }

    /// Returns the cached archetype ids, destroyed ones included.
    pub fn archetypes(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.matched.iter().map(|m| m.id)
    }

    /// Returns the underlying query.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }
}
