//! Stratum - In-memory archetype store for entities, components, and relationships
//!
//! This crate re-exports all layers of the Stratum system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: stratum_storage    - Entity index, archetypes, relationships, hooks, queries
//! Layer 0: stratum_foundation - Core types (Id, Value, Error, built-in ids)
//! ```
//!
//! # Example
//!
//! ```
//! use stratum::foundation::pair;
//! use stratum::foundation::builtin::CHILD_OF;
//! use stratum::storage::World;
//!
//! let mut world = World::new();
//! let position = world.component().unwrap();
//! let parent = world.entity();
//! let child = world.entity();
//!
//! world.set(child, position, 3).unwrap();
//! world.add(child, pair(CHILD_OF, parent)).unwrap();
//!
//! assert_eq!(world.parent(child).unwrap(), Some(parent));
//! let query = world.query(&[position]).unwrap();
//! assert_eq!(query.entities(&world), vec![child]);
//! ```

pub use stratum_foundation as foundation;
pub use stratum_storage as storage;
