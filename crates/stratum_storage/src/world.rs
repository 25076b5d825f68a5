//! The `World`: entities, archetypes, relationships, and hooks in one store.
//!
//! All mutation goes through the world so the entity index, archetype
//! columns, relationship index and hook dispatch stay consistent. A mutation
//! either completes fully or is rejected before any state changes.

use std::collections::HashSet;

use stratum_foundation::builtin::{
    self, CHILD_OF, COMPONENT, DELETE, FIRST_COMPONENT, NAME, ON_DELETE, ON_DELETE_TARGET, TAG,
    WILDCARD, is_wildcard,
};
use stratum_foundation::{Error, Id, Result, Value, pair};
use tracing::debug;

use crate::archetype::{Archetype, ArchetypeId, ArchetypeStore};
use crate::config::WorldConfig;
use crate::entity::{EntityIndex, EntityRecord};
use crate::hooks::{Hook, HookDispatcher, HookKind};
use crate::query::Query;

/// Maximum number of ids accepted by [`World::has`] and [`World::get_many`].
pub const MAX_ARGS: usize = 4;

/// An archetype-based entity store.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    entities: EntityIndex,
    archetypes: ArchetypeStore,
    hooks: HookDispatcher,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the built-in ids fail to bootstrap (should never happen
    /// unless there's an internal bug).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
            .expect("default configuration bootstraps built-in ids")
    }

    /// Creates a world with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](stratum_foundation::ErrorKind::InvalidConfig)
    /// if the configuration does not validate.
    pub fn with_config(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let mut world = Self {
            entities: EntityIndex::with_capacity(
                config.component_capacity,
                config.entity_capacity,
            ),
            archetypes: ArchetypeStore::with_capacity(config.archetype_capacity),
            hooks: HookDispatcher::new(),
            config,
        };
        world.bootstrap()?;
        Ok(world)
    }

    fn bootstrap(&mut self) -> Result<()> {
        for id in builtin::ALL {
            self.spawn(|entities, row| entities.reserve(id, ArchetypeId::ROOT, row))?;
        }
        // Flags first, so the archetypes built below give tags no column
        for id in builtin::TAGS {
            self.entities.set_tag(id, true);
        }
        for id in builtin::TAGS {
            self.add(id, TAG)?;
        }
        for id in builtin::ALL {
            self.add(id, COMPONENT)?;
            if let Some(name) = builtin::name_of(id) {
                self.set(id, NAME, name)?;
            }
        }
        self.add(CHILD_OF, pair(ON_DELETE_TARGET, DELETE))
    }

    /// Allocates an id and places it in the root archetype.
    fn spawn(
        &mut self,
        allocate: impl FnOnce(&mut EntityIndex, usize) -> Result<Id>,
    ) -> Result<Id> {
        let row = self.archetypes.root().len();
        let id = allocate(&mut self.entities, row)?;
        self.archetypes
            .try_get_mut(ArchetypeId::ROOT)?
            .push_entity(id);
        Ok(id)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CapacityExceeded`](stratum_foundation::ErrorKind::CapacityExceeded)
    /// if the index space is exhausted.
    pub fn try_entity(&mut self) -> Result<Id> {
        self.spawn(|entities, row| entities.create(ArchetypeId::ROOT, row))
    }

    /// Creates an entity with no components.
    ///
    /// # Panics
    ///
    /// Panics if the index space is exhausted. Use [`World::try_entity`] to
    /// handle that case.
    pub fn entity(&mut self) -> Id {
        self.try_entity().expect("entity index space exhausted")
    }

    /// Creates a component id from the low component range.
    ///
    /// The id carries the `Component` tag.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ComponentLimit`](stratum_foundation::ErrorKind::ComponentLimit)
    /// if the range is exhausted.
    pub fn component(&mut self) -> Result<Id> {
        let id = self.spawn(|entities, row| entities.create_component(ArchetypeId::ROOT, row))?;
        self.add(id, COMPONENT)?;
        Ok(id)
    }

    /// Creates a component id that stores no values.
    ///
    /// # Errors
    ///
    /// Same as [`World::component`].
    pub fn tag(&mut self) -> Result<Id> {
        let id = self.component()?;
        self.add(id, TAG)?;
        Ok(id)
    }

    /// Checks if an id is a live entity of the current generation.
    #[must_use]
    pub fn contains(&self, entity: Id) -> bool {
        self.entities.is_alive(entity)
    }

    /// Checks if the id's index slot is occupied, ignoring the generation.
    #[must_use]
    pub fn exists(&self, entity: Id) -> bool {
        self.entities.exists(entity)
    }

    /// Deletes an entity and applies the cleanup policies of everything
    /// referring to it.
    ///
    /// Entities holding the deleted id (or a pair mentioning it) lose it,
    /// unless a `(OnDelete, Delete)` / `(OnDeleteTarget, Delete)` policy says
    /// they are deleted too. Deleting a dead id does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidId`](stratum_foundation::ErrorKind::InvalidId)
    /// for built-in ids.
    pub fn delete(&mut self, entity: Id) -> Result<()> {
        if !self.entities.is_alive(entity) {
            return Ok(());
        }
        if entity.index() < FIRST_COMPONENT {
            return Err(Error::invalid_id(entity).with_context("built-in ids cannot be deleted"));
        }

        let victims = self.collect_victims(entity);
        if victims.len() > 1 {
            debug!(?entity, cascade = victims.len() - 1, "cascading delete");
        }
        // Deepest first, so parents never strip pairs from doomed children
        for victim in victims.into_iter().rev() {
            if victim.index() >= FIRST_COMPONENT && self.entities.is_alive(victim) {
                self.delete_one(victim)?;
            }
        }
        Ok(())
    }

    /// Collects `root` and every entity its deletion cascades to, in
    /// breadth-first order.
    fn collect_victims(&self, root: Id) -> Vec<Id> {
        let mut victims = vec![root];
        let mut seen = HashSet::from([root]);
        let mut next = 0;

        while let Some(&id) = victims.get(next) {
            next += 1;
            if !self.entities.is_referenced(id) {
                continue;
            }
            let index = self.archetypes.relationships();
            let mut holders = Vec::new();

            if self.has_id(id, pair(ON_DELETE, DELETE)) {
                holders.extend(index.archetypes(id));
                holders.extend(index.archetypes(pair(id, WILDCARD)));
            }
            for held in index.pairs_with_target(id) {
                let relation = self.entities.alive_at(held.pair_relation().index());
                if relation.is_some_and(|r| self.has_id(r, pair(ON_DELETE_TARGET, DELETE))) {
                    holders.extend(index.archetypes(held));
                }
            }

            for aid in holders {
                let Some(archetype) = self.archetypes.get(aid) else {
                    continue;
                };
                for &holder in archetype.entities() {
                    if seen.insert(holder) {
                        victims.push(holder);
                    }
                }
            }
        }
        victims
    }

    fn delete_one(&mut self, entity: Id) -> Result<()> {
        let record = *self.entities.record(entity)?;
        let types = self.archetypes.try_get(record.archetype)?.types().to_vec();
        for &ty in &types {
            self.fire(HookKind::OnRemove, entity, ty);
        }

        let archetype = self.archetypes.try_get_mut(record.archetype)?;
        if let Some(moved) = archetype.swap_remove(record.row) {
            self.entities
                .set_location(moved, record.archetype, record.row);
        }

        let referenced = self.entities.is_referenced(entity);
        self.entities.release(entity);
        if referenced {
            self.remove_references(entity)?;
        }
        self.hooks.forget(entity);
        debug!(?entity, "deleted entity");
        Ok(())
    }

    /// Strips a deleted id from every entity still holding it, then destroys
    /// the archetypes that mentioned it.
    fn remove_references(&mut self, id: Id) -> Result<()> {
        let index = self.archetypes.relationships();
        let mut doomed: Vec<ArchetypeId> = index
            .archetypes(id)
            .chain(index.archetypes(pair(id, WILDCARD)))
            .chain(index.archetypes(pair(WILDCARD, id)))
            .collect();
        doomed.sort_unstable();
        doomed.dedup();

        for aid in doomed {
            let Some(archetype) = self.archetypes.get(aid) else {
                continue;
            };
            let (kept, removed): (Vec<Id>, Vec<Id>) = archetype
                .types()
                .iter()
                .copied()
                .partition(|&ty| !mentions(ty, id));
            let dst = {
                let entities = &self.entities;
                self.archetypes
                    .find_or_create(&kept, |ty| entities.is_tag(ty))
            };

            while let Some(&holder) = self.archetypes.try_get(aid)?.entities().last() {
                for &ty in &removed {
                    self.fire(HookKind::OnRemove, holder, ty);
                }
                let row = self.archetypes.try_get(aid)?.len() - 1;
                let (new_row, _) = self.archetypes.move_row(aid, row, dst, |_| Value::Nil)?;
                self.entities.set_location(holder, dst, new_row);
            }
            self.archetypes.destroy(aid);
        }
        Ok(())
    }

    /// Removes every component from an entity, keeping the entity alive.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotAlive`](stratum_foundation::ErrorKind::NotAlive)
    /// if the entity is dead.
    pub fn clear(&mut self, entity: Id) -> Result<()> {
        let record = *self.entities.record(entity)?;
        if record.archetype == ArchetypeId::ROOT {
            return Ok(());
        }
        let types = self.archetypes.try_get(record.archetype)?.types().to_vec();
        for &ty in &types {
            self.fire(HookKind::OnRemove, entity, ty);
        }
        self.migrate(entity, record, ArchetypeId::ROOT, |_| Value::Nil)?;
        self.entities.set_tag(entity, false);
        Ok(())
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Adds an id to an entity. Data components start as [`Value::Nil`].
    ///
    /// Adding an id the entity already has does nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotAlive` if the entity or component is dead, and `InvalidId`
    /// for wildcard or null components.
    pub fn add(&mut self, entity: Id, id: Id) -> Result<()> {
        self.validate_component(id)?;
        let record = *self.entities.record(entity)?;
        let dst = self.traverse_add(record.archetype, id)?;
        if dst == record.archetype {
            return Ok(());
        }
        self.migrate(entity, record, dst, |_| Value::Nil)?;
        self.on_added(entity, id);
        self.fire(HookKind::OnAdd, entity, id);
        Ok(())
    }

    /// Writes a component value, adding the component if it is missing.
    ///
    /// An existing value is overwritten in place. Setting a tag behaves like
    /// [`World::add`] and discards the value.
    ///
    /// # Errors
    ///
    /// Same as [`World::add`].
    pub fn set(&mut self, entity: Id, id: Id, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.validate_component(id)?;
        let record = *self.entities.record(entity)?;

        let archetype = self.archetypes.try_get_mut(record.archetype)?;
        if let Some(found) = archetype.record(id).copied() {
            let Some(column) = found.column else {
                return Ok(());
            };
            if let Some(slot) = archetype.value_mut(record.row, column) {
                *slot = value;
            }
            self.fire(HookKind::OnSet, entity, id);
            return Ok(());
        }

        let dst = self.traverse_add(record.archetype, id)?;
        let mut value = Some(value);
        self.migrate(entity, record, dst, |ty| {
            if ty == id {
                value.take().unwrap_or_default()
            } else {
                Value::Nil
            }
        })?;
        self.on_added(entity, id);
        self.fire(HookKind::OnAdd, entity, id);
        if !self.entities.is_tag(id) {
            self.fire(HookKind::OnSet, entity, id);
        }
        Ok(())
    }

    /// Removes an id from an entity. Removing an absent id does nothing.
    ///
    /// `OnRemove` fires while the value is still readable.
    ///
    /// # Errors
    ///
    /// Same as [`World::add`].
    pub fn remove(&mut self, entity: Id, id: Id) -> Result<()> {
        self.validate_component(id)?;
        let record = *self.entities.record(entity)?;
        let dst = {
            let entities = &self.entities;
            self.archetypes
                .traverse_remove(record.archetype, id, |ty| entities.is_tag(ty))
                .ok_or_else(|| Error::internal(format!("{} is gone", record.archetype)))?
        };
        if dst == record.archetype {
            return Ok(());
        }
        self.fire(HookKind::OnRemove, entity, id);
        self.migrate(entity, record, dst, |_| Value::Nil)?;
        if id == TAG {
            self.entities.set_tag(entity, false);
        }
        Ok(())
    }

    /// Returns an entity's value for one id.
    ///
    /// Returns `None` if the entity lacks the id or the id is a tag. A
    /// wildcard pair yields the value of the first matching pair.
    ///
    /// # Errors
    ///
    /// Returns `NotAlive` if the entity is dead.
    pub fn get(&self, entity: Id, id: Id) -> Result<Option<&Value>> {
        let (archetype, row) = self.location(entity)?;
        Ok(archetype.value(row, id))
    }

    /// Returns an entity's values for up to four ids.
    ///
    /// Each slot is `None` independently when that id is absent.
    ///
    /// # Errors
    ///
    /// Returns `TooManyArguments` for more than four ids and `NotAlive` if
    /// the entity is dead.
    pub fn get_many<const N: usize>(&self, entity: Id, ids: [Id; N]) -> Result<[Option<&Value>; N]> {
        if N > MAX_ARGS {
            return Err(Error::too_many_arguments(MAX_ARGS, N));
        }
        let (archetype, row) = self.location(entity)?;
        Ok(ids.map(|id| archetype.value(row, id)))
    }

    /// Checks if an entity has every listed id. Wildcard pairs are accepted.
    ///
    /// # Errors
    ///
    /// Returns `TooManyArguments` for more than four ids and `NotAlive` if
    /// the entity is dead.
    pub fn has(&self, entity: Id, ids: &[Id]) -> Result<bool> {
        if ids.len() > MAX_ARGS {
            return Err(Error::too_many_arguments(MAX_ARGS, ids.len()));
        }
        let (archetype, _) = self.location(entity)?;
        Ok(ids.iter().all(|&id| archetype.has(id)))
    }

    fn has_id(&self, entity: Id, id: Id) -> bool {
        self.location(entity)
            .is_ok_and(|(archetype, _)| archetype.has(id))
    }

    /// Returns the display name stored under the `Name` component.
    #[must_use]
    pub fn name(&self, id: Id) -> Option<&str> {
        self.get(id, NAME).ok()??.as_str()
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    /// Returns the target of the `index`-th `(relation, *)` pair on an entity.
    ///
    /// # Errors
    ///
    /// Returns `NotAlive` if the entity is dead and `InvalidId` if `relation`
    /// is itself a pair.
    pub fn target(&self, entity: Id, relation: Id, index: usize) -> Result<Option<Id>> {
        Self::validate_relation(relation)?;
        let (archetype, _) = self.location(entity)?;
        let Some(record) = archetype.record(pair(relation, WILDCARD)) else {
            return Ok(None);
        };
        if index >= record.count {
            return Ok(None);
        }
        // Pairs sharing a relation sort next to each other
        let held = archetype.types()[record.index + index];
        Ok(self.pair_second(held))
    }

    /// Returns every target of `(relation, *)` pairs on an entity.
    ///
    /// # Errors
    ///
    /// Same as [`World::target`].
    pub fn targets(&self, entity: Id, relation: Id) -> Result<Vec<Id>> {
        Self::validate_relation(relation)?;
        let (archetype, _) = self.location(entity)?;
        let Some(record) = archetype.record(pair(relation, WILDCARD)) else {
            return Ok(Vec::new());
        };
        Ok(archetype.types()[record.index..record.index + record.count]
            .iter()
            .filter_map(|&held| self.pair_second(held))
            .collect())
    }

    /// Returns the entity's `ChildOf` target.
    ///
    /// # Errors
    ///
    /// Returns `NotAlive` if the entity is dead.
    pub fn parent(&self, entity: Id) -> Result<Option<Id>> {
        self.target(entity, CHILD_OF, 0)
    }

    /// Iterates over every entity holding an id. Wildcard pairs are accepted.
    pub fn each(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        self.archetypes
            .relationships()
            .archetypes(id)
            .filter_map(move |aid| self.archetypes.get(aid))
            .flat_map(|archetype| archetype.entities().iter().copied())
    }

    /// Iterates over the entities whose `ChildOf` target is `parent`.
    ///
    /// A pair has no children.
    pub fn children(&self, parent: Id) -> impl Iterator<Item = Id> + '_ {
        (!parent.is_pair())
            .then(|| pair(CHILD_OF, parent))
            .into_iter()
            .flat_map(move |id| self.each(id))
    }

    /// Returns the live relation of a pair.
    #[must_use]
    pub fn pair_first(&self, id: Id) -> Option<Id> {
        id.is_pair()
            .then(|| self.entities.alive_at(id.pair_relation().index()))
            .flatten()
    }

    /// Returns the live target of a pair.
    #[must_use]
    pub fn pair_second(&self, id: Id) -> Option<Id> {
        id.is_pair()
            .then(|| self.entities.alive_at(id.pair_target().index()))
            .flatten()
    }

    // =========================================================================
    // Queries and maintenance
    // =========================================================================

    /// Builds a query returning the values of `terms`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for an empty, repeated, or null term list.
    pub fn query(&self, terms: &[Id]) -> Result<Query> {
        Query::new(terms)
    }

    /// Destroys every empty archetype except the root.
    ///
    /// Returns the number destroyed. Cached queries skip destroyed archetypes
    /// until refreshed.
    pub fn cleanup(&mut self) -> usize {
        let empty: Vec<ArchetypeId> = self
            .archetypes
            .iter()
            .filter(|archetype| archetype.is_empty() && archetype.id() != ArchetypeId::ROOT)
            .map(Archetype::id)
            .collect();
        for &aid in &empty {
            self.archetypes.destroy(aid);
        }
        debug!(
            destroyed = empty.len(),
            remaining = self.archetypes.len(),
            "archetype cleanup"
        );
        empty.len()
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    /// Registers a hook on a component or pair, returning the one it replaced.
    ///
    /// # Errors
    ///
    /// Same validation as [`World::add`] applies to `id`.
    pub fn set_hook(&mut self, id: Id, kind: HookKind, hook: Hook) -> Result<Option<Hook>> {
        self.validate_component(id)?;
        Ok(self.hooks.register(id, kind, hook))
    }

    /// Removes a hook.
    pub fn remove_hook(&mut self, id: Id, kind: HookKind) -> Option<Hook> {
        self.hooks.unregister(id, kind)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns the world configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns an archetype by id, if it still exists.
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    /// Returns the archetype holding an entity.
    ///
    /// # Errors
    ///
    /// Returns `NotAlive` if the entity is dead.
    pub fn archetype_of(&self, entity: Id) -> Result<&Archetype> {
        self.location(entity).map(|(archetype, _)| archetype)
    }

    /// Iterates over every live id, built-ins and components included.
    pub fn entities(&self) -> impl Iterator<Item = Id> + '_ {
        self.entities.iter()
    }

    /// Returns the number of live ids, built-ins and components included.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of live archetypes.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns the archetype store.
    #[must_use]
    pub fn store(&self) -> &ArchetypeStore {
        &self.archetypes
    }

    pub(crate) fn store_mut(&mut self) -> &mut ArchetypeStore {
        &mut self.archetypes
    }

    /// Returns the entity index.
    #[must_use]
    pub fn entity_index(&self) -> &EntityIndex {
        &self.entities
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn location(&self, entity: Id) -> Result<(&Archetype, usize)> {
        let record = self.entities.record(entity)?;
        Ok((self.archetypes.try_get(record.archetype)?, record.row))
    }

    fn validate_relation(relation: Id) -> Result<()> {
        if relation.is_pair() {
            return Err(Error::invalid_id(relation).with_context("a pair cannot be a relation"));
        }
        Ok(())
    }

    fn validate_component(&self, id: Id) -> Result<()> {
        if id.is_null() || is_wildcard(id) {
            return Err(Error::invalid_id(id));
        }
        if id.is_pair() {
            for half in [id.pair_relation(), id.pair_target()] {
                if !self.entities.is_occupied(half.index()) {
                    return Err(Error::not_alive(half));
                }
            }
            return Ok(());
        }
        if self.entities.is_alive(id) {
            Ok(())
        } else {
            Err(Error::not_alive(id))
        }
    }

    fn traverse_add(&mut self, from: ArchetypeId, id: Id) -> Result<ArchetypeId> {
        let entities = &self.entities;
        self.archetypes
            .traverse_add(from, id, |ty| entities.is_tag(ty))
            .ok_or_else(|| Error::internal(format!("{from} is gone")))
    }

    /// Moves an entity's row and updates both affected records.
    fn migrate(
        &mut self,
        entity: Id,
        record: EntityRecord,
        dst: ArchetypeId,
        fill: impl FnMut(Id) -> Value,
    ) -> Result<()> {
        let (row, moved) = self
            .archetypes
            .move_row(record.archetype, record.row, dst, fill)?;
        if let Some(moved) = moved {
            self.entities
                .set_location(moved, record.archetype, record.row);
        }
        self.entities.set_location(entity, dst, row);
        Ok(())
    }

    fn on_added(&mut self, entity: Id, id: Id) {
        self.entities.mark_referenced(id);
        if id == TAG {
            self.entities.set_tag(entity, true);
        }
    }

    /// Dispatches a hook with the entity's current value for `id`.
    fn fire(&self, kind: HookKind, entity: Id, id: Id) {
        if self.hooks.is_empty() {
            return;
        }
        let nil = Value::Nil;
        let value = self
            .location(entity)
            .ok()
            .and_then(|(archetype, row)| archetype.value(row, id));
        self.hooks.dispatch(kind, entity, id, value.unwrap_or(&nil));
    }
}

/// True if `ty` is `id` or a pair naming `id` on either side.
fn mentions(ty: Id, id: Id) -> bool {
    if ty.is_pair() {
        ty.pair_relation().index() == id.index() || ty.pair_target().index() == id.index()
    } else {
        ty == id
    }
}
