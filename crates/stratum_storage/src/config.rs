//! Configuration for a [`World`](crate::World).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use stratum_foundation::builtin::FIRST_COMPONENT;
use stratum_foundation::{Error, ErrorKind, MAX_INDEX, Result};

/// Sizing parameters for a world.
///
/// Every field is a capacity, not a behavior switch; the defaults suit most
/// stores.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Size of the low id range reserved for components (built-ins included).
    /// Ordinary entities are allocated above it.
    pub component_capacity: u32,

    /// Number of entity slots to pre-allocate.
    pub entity_capacity: usize,

    /// Number of archetype slots to pre-allocate.
    pub archetype_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            component_capacity: 256,
            entity_capacity: 0,
            archetype_capacity: 0,
        }
    }
}

impl WorldConfig {
    /// Creates a configuration pre-sized for a large population.
    #[must_use]
    pub fn large() -> Self {
        Self {
            component_capacity: 1024,
            entity_capacity: 100_000,
            archetype_capacity: 1024,
        }
    }

    /// Builder method to set the component range size.
    #[must_use]
    pub fn with_component_capacity(mut self, capacity: u32) -> Self {
        self.component_capacity = capacity;
        self
    }

    /// Builder method to set the entity pre-allocation.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Builder method to set the archetype pre-allocation.
    #[must_use]
    pub fn with_archetype_capacity(mut self, capacity: usize) -> Self {
        self.archetype_capacity = capacity;
        self
    }

    /// Checks that the configuration can back a world.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if the component range cannot hold
    /// the built-in ids or leaves no room for entities.
    pub fn validate(&self) -> Result<()> {
        if self.component_capacity < FIRST_COMPONENT {
            return Err(Error::new(ErrorKind::InvalidConfig(format!(
                "component_capacity {} is below the {FIRST_COMPONENT} reserved ids",
                self.component_capacity
            ))));
        }
        if self.component_capacity >= MAX_INDEX {
            return Err(Error::new(ErrorKind::InvalidConfig(format!(
                "component_capacity {} leaves no room for entities",
                self.component_capacity
            ))));
        }
        Ok(())
    }
}
