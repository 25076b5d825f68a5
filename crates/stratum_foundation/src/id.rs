//! Packed identifiers for entities and relationship pairs.
//!
//! Every id fits in 53 bits so it survives a round trip through an IEEE-754
//! double without loss.
//!
//! # Layout
//!
//! ```text
//! entity: | 0 | generation (26) | index (26)         |
//! pair:   | 1 | relation index (26) | target index (26) |
//!           ^ bit 52
//! ```
//!
//! Pairs only carry the *indices* of their two halves. Restoring the live
//! generation of a half requires the entity index that issued it.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of bits used for the index portion of an entity id.
pub const INDEX_BITS: u32 = 26;

/// Number of bits used for the generation portion of an entity id.
pub const GENERATION_BITS: u32 = 26;

/// Largest index an entity id can carry.
pub const MAX_INDEX: u32 = (1 << INDEX_BITS) - 1;

/// Largest generation an entity id can carry before it wraps.
pub const MAX_GENERATION: u32 = (1 << GENERATION_BITS) - 1;

const INDEX_MASK: u64 = MAX_INDEX as u64;
const GENERATION_MASK: u64 = MAX_GENERATION as u64;
const PAIR_FLAG: u64 = 1 << (INDEX_BITS + GENERATION_BITS);

/// Identifier for an entity or a (relation, target) pair.
///
/// Ids are plain integers; equality includes the generation, so a stale id
/// never compares equal to the id that reused its index.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Id(u64);

impl Id {
    /// The null id. Index 0 is never handed out by an entity index.
    pub const NULL: Self = Self(0);

    /// Largest raw value any valid id can have.
    pub const MAX_RAW: u64 = (1 << 53) - 1;

    /// Packs an entity index and generation into an id.
    ///
    /// Bits beyond [`INDEX_BITS`] / [`GENERATION_BITS`] are discarded.
    #[must_use]
    pub const fn entity(index: u32, generation: u32) -> Self {
        Self(((generation as u64 & GENERATION_MASK) << INDEX_BITS) | (index as u64 & INDEX_MASK))
    }

    /// Packs a relation and a target into a pair id.
    ///
    /// Only the indices of the two halves are kept. Passing a pair as either
    /// half is a programming error.
    #[must_use]
    pub const fn pair(relation: Self, target: Self) -> Self {
        debug_assert!(!relation.is_pair() && !target.is_pair());
        Self(PAIR_FLAG | ((relation.0 & INDEX_MASK) << INDEX_BITS) | (target.0 & INDEX_MASK))
    }

    /// Reinterprets a raw integer as an id.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Returns true if this is the null id.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this id encodes a (relation, target) pair.
    #[must_use]
    pub const fn is_pair(self) -> bool {
        self.0 & PAIR_FLAG != 0
    }

    /// Returns the index portion of an entity id.
    ///
    /// For a pair this is the target index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    /// Returns the generation portion of an entity id.
    ///
    /// Meaningless for pairs.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn generation(self) -> u32 {
        ((self.0 >> INDEX_BITS) & GENERATION_MASK) as u32
    }

    /// Returns the same index with the generation advanced by one.
    ///
    /// Wraps to generation 0 after [`MAX_GENERATION`].
    #[must_use]
    pub const fn with_next_generation(self) -> Self {
        let next = if self.generation() == MAX_GENERATION {
            0
        } else {
            self.generation() + 1
        };
        Self::entity(self.index(), next)
    }

    /// Returns the same index at generation 0.
    #[must_use]
    pub const fn without_generation(self) -> Self {
        if self.is_pair() {
            self
        } else {
            Self::entity(self.index(), 0)
        }
    }

    /// Returns the relation half of a pair, at generation 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn pair_relation(self) -> Self {
        Self::entity(((self.0 >> INDEX_BITS) & INDEX_MASK) as u32, 0)
    }

    /// Returns the target half of a pair, at generation 0.
    #[must_use]
    pub const fn pair_target(self) -> Self {
        Self::entity(self.index(), 0)
    }
}

/// Packs a relation and a target into a pair id.
///
/// Shorthand for [`Id::pair`].
#[must_use]
pub const fn pair(relation: Id, target: Id) -> Id {
    Id::pair(relation, target)
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pair() {
            write!(
                f,
                "Pair({}, {})",
                self.pair_relation().index(),
                self.pair_target().index()
            )
        } else if self.is_null() {
            write!(f, "Id(null)")
        } else {
            write!(f, "Id({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pair() {
            write!(
                f,
                "({} {})",
                self.pair_relation().index(),
                self.pair_target().index()
            )
        } else {
            write!(f, "#{}", self.index())
        }
    }
}
