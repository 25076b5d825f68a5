//! The archetype graph.
//!
//! Adding or removing one id moves an entity between two archetypes whose
//! types differ by exactly that id. Each archetype caches those transitions as
//! edges, so repeated moves skip the type hash lookup.

use stratum_foundation::Id;

use crate::archetype::{Archetype, ArchetypeId, ArchetypeStore};

/// Cached transitions out of an archetype for one id.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Edge {
    /// Archetype reached by adding the id.
    pub add: Option<ArchetypeId>,
    /// Archetype reached by removing the id.
    pub remove: Option<ArchetypeId>,
}

impl ArchetypeStore {
    /// Returns the archetype reached from `from` by adding `id`.
    ///
    /// Returns `from` itself when its type already contains `id`.
    pub(crate) fn traverse_add(
        &mut self,
        from: ArchetypeId,
        id: Id,
        is_tag: impl Fn(Id) -> bool,
    ) -> Option<ArchetypeId> {
        let source = self.get(from)?;
        if source.has(id) {
            return Some(from);
        }
        if let Some(to) = source.edge(id).and_then(|edge| edge.add) {
            return Some(to);
        }

        let mut types = source.types().to_vec();
        let at = types.binary_search(&id).unwrap_or_else(|at| at);
        types.insert(at, id);

        let to = self.find_or_create(&types, is_tag);
        self.link(from, to, id);
        Some(to)
    }

    /// Returns the archetype reached from `from` by removing `id`.
    ///
    /// Returns `from` itself when its type does not contain `id`.
    pub(crate) fn traverse_remove(
        &mut self,
        from: ArchetypeId,
        id: Id,
        is_tag: impl Fn(Id) -> bool,
    ) -> Option<ArchetypeId> {
        let source = self.get(from)?;
        let Ok(at) = source.types().binary_search(&id) else {
            return Some(from);
        };
        if let Some(to) = source.edge(id).and_then(|edge| edge.remove) {
            return Some(to);
        }

        let mut types = source.types().to_vec();
        types.remove(at);

        let to = self.find_or_create(&types, is_tag);
        self.link(to, from, id);
        Some(to)
    }

    /// Records that `larger` is `smaller` plus `id`, in both directions.
    fn link(&mut self, smaller: ArchetypeId, larger: ArchetypeId, id: Id) {
        if let Some(arch) = self.get_mut(smaller) {
            arch.edges.entry(id).or_default().add = Some(larger);
        }
        if let Some(arch) = self.get_mut(larger) {
            arch.edges.entry(id).or_default().remove = Some(smaller);
        }
    }

    /// Drops every edge pointing at a destroyed archetype.
    ///
    /// Edges are symmetric, so only the neighbours named in its own edge map
    /// can point at it.
    pub(crate) fn unlink_edges(&mut self, destroyed: &Archetype) {
        for (&id, edge) in &destroyed.edges {
            if let Some(neighbour) = edge.add.and_then(|to| self.get_mut(to)) {
                clear_edge(neighbour, id, |edge| edge.remove = None);
            }
            if let Some(neighbour) = edge.remove.and_then(|to| self.get_mut(to)) {
                clear_edge(neighbour, id, |edge| edge.add = None);
            }
        }
    }
}

fn clear_edge(archetype: &mut Archetype, id: Id, clear: impl FnOnce(&mut Edge)) {
    if let Some(edge) = archetype.edges.get_mut(&id) {
        clear(edge);
        if edge.add.is_none() && edge.remove.is_none() {
            archetype.edges.remove(&id);
        }
    }
}
