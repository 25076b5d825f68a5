//! Well-known ids reserved at the bottom of every world's id space.
//!
//! Each world binds its own live copies of these ids at construction, so they
//! are valid entities in every world without any shared state.

use crate::id::Id;

/// Hook kind: fires after an id is added to an entity.
pub const ON_ADD: Id = Id::entity(1, 0);
/// Hook kind: fires before an id is removed from an entity.
pub const ON_REMOVE: Id = Id::entity(2, 0);
/// Hook kind: fires after a value is written to an entity.
pub const ON_SET: Id = Id::entity(3, 0);
/// Alias of [`ON_SET`].
pub const ON_CHANGE: Id = ON_SET;
/// Matches any id in the relation or target position of a pair.
pub const WILDCARD: Id = Id::entity(4, 0);
/// Hierarchy relation: `pair(CHILD_OF, parent)`.
pub const CHILD_OF: Id = Id::entity(5, 0);
/// Tag carried by every registered component.
pub const COMPONENT: Id = Id::entity(6, 0);
/// Cleanup policy relation applied when the id itself is deleted.
pub const ON_DELETE: Id = Id::entity(7, 0);
/// Cleanup policy relation applied when a pair's target is deleted.
pub const ON_DELETE_TARGET: Id = Id::entity(8, 0);
/// Cleanup action: delete the entities that hold the id.
pub const DELETE: Id = Id::entity(9, 0);
/// Cleanup action: strip the id from the entities that hold it.
pub const REMOVE: Id = Id::entity(10, 0);
/// Component holding a human-readable name.
pub const NAME: Id = Id::entity(11, 0);
/// Marks a component as carrying no data.
pub const TAG: Id = Id::entity(12, 0);

/// First index handed out to user components.
pub const FIRST_COMPONENT: u32 = 13;

/// Every well-known id, in index order.
pub const ALL: [Id; 12] = [
    ON_ADD,
    ON_REMOVE,
    ON_SET,
    WILDCARD,
    CHILD_OF,
    COMPONENT,
    ON_DELETE,
    ON_DELETE_TARGET,
    DELETE,
    REMOVE,
    NAME,
    TAG,
];

/// Well-known ids that store no data.
pub const TAGS: [Id; 11] = [
    ON_ADD,
    ON_REMOVE,
    ON_SET,
    WILDCARD,
    CHILD_OF,
    COMPONENT,
    ON_DELETE,
    ON_DELETE_TARGET,
    DELETE,
    REMOVE,
    TAG,
];

/// Returns the display name of a well-known id.
#[must_use]
pub fn name_of(id: Id) -> Option<&'static str> {
    let name = match id {
        ON_ADD => "OnAdd",
        ON_REMOVE => "OnRemove",
        ON_SET => "OnSet",
        WILDCARD => "Wildcard",
        CHILD_OF => "ChildOf",
        COMPONENT => "Component",
        ON_DELETE => "OnDelete",
        ON_DELETE_TARGET => "OnDeleteTarget",
        DELETE => "Delete",
        REMOVE => "Remove",
        NAME => "Name",
        TAG => "Tag",
        _ => return None,
    };
    Some(name)
}

/// Returns true if the id is a pair with a wildcard in either position.
#[must_use]
pub fn is_wildcard(id: Id) -> bool {
    if id.is_pair() {
        id.pair_relation() == WILDCARD || id.pair_target() == WILDCARD
    } else {
        id.without_generation() == WILDCARD
    }
}
