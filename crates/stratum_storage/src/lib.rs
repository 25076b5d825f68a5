//! Archetype storage, relationship index, hooks, and queries for Stratum.
//!
//! This crate provides:
//! - [`EntityIndex`] - Generational id allocation with lowest-first reuse
//! - [`ArchetypeStore`] - Columnar archetypes and the add/remove graph
//! - [`RelationshipIndex`] - Id and wildcard-pair lookup of archetypes
//! - [`HookDispatcher`] - `OnAdd` / `OnRemove` / `OnSet` callbacks
//! - [`Query`] - Filtered, lazily iterated views over archetypes
//! - [`World`] - The store tying all of the above together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod archetype;
pub mod config;
pub mod entity;
pub mod graph;
pub mod hooks;
pub mod query;
pub mod relationship;
pub mod world;

pub use archetype::{Archetype, ArchetypeId, ArchetypeRecord, ArchetypeStore};
pub use config::WorldConfig;
pub use entity::{EntityIndex, EntityRecord};
pub use graph::Edge;
pub use hooks::{Hook, HookDispatcher, HookKind};
pub use query::{CachedQuery, MAX_QUERY_IDS, Query, QueryIter, QueryRow};
pub use relationship::{IdRecord, RelationshipIndex};
pub use world::{MAX_ARGS, World};
