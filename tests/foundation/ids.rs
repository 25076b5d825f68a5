//! Integration tests for the id codec and built-in ids
//!
//! Tests entity/pair packing, generation handling, ordering, and well-known ids.

use proptest::prelude::*;
use stratum_foundation::builtin::{self, CHILD_OF, FIRST_COMPONENT, ON_CHANGE, ON_SET, WILDCARD};
use stratum_foundation::{Id, MAX_GENERATION, MAX_INDEX, pair};

// =============================================================================
// Entity Ids
// =============================================================================

#[test]
fn null_id() {
    assert!(Id::NULL.is_null());
    assert!(!Id::NULL.is_pair());
    assert_eq!(Id::default(), Id::NULL);
}

#[test]
fn entity_round_trip() {
    let id = Id::entity(1_000, 7);
    assert_eq!(id.index(), 1_000);
    assert_eq!(id.generation(), 7);
    assert_eq!(Id::from_raw(id.to_raw()), id);
}

#[test]
fn largest_entity_fits_53_bits() {
    let id = Id::entity(MAX_INDEX, MAX_GENERATION);
    assert!(id.to_raw() <= Id::MAX_RAW);
    assert!(!id.is_pair());
}

#[test]
fn without_generation_keeps_index() {
    let id = Id::entity(33, 12);
    assert_eq!(id.without_generation(), Id::entity(33, 0));
}

// =============================================================================
// Pairs
// =============================================================================

#[test]
fn pair_is_flagged() {
    let p = pair(CHILD_OF, Id::entity(500, 0));
    assert!(p.is_pair());
    assert!(p.to_raw() <= Id::MAX_RAW);
    assert_eq!(format!("{p:?}"), "Pair(5, 500)");
}

#[test]
fn distinct_pairs_differ() {
    let a = Id::entity(300, 0);
    let b = Id::entity(301, 0);
    assert_ne!(pair(a, b), pair(b, a));
    assert_ne!(pair(CHILD_OF, a), pair(CHILD_OF, b));
}

// =============================================================================
// Built-ins
// =============================================================================

#[test]
fn builtins_are_in_reserved_range() {
    for id in builtin::ALL {
        assert!(id.index() > 0);
        assert!(id.index() < FIRST_COMPONENT);
        assert_eq!(id.generation(), 0);
    }
}

#[test]
fn builtins_have_names() {
    for id in builtin::ALL {
        assert!(builtin::name_of(id).is_some(), "{id:?} has no name");
    }
    assert_eq!(builtin::name_of(Id::entity(400, 0)), None);
}

#[test]
fn on_change_is_on_set() {
    assert_eq!(ON_CHANGE, ON_SET);
}

#[test]
fn wildcard_detection() {
    let e = Id::entity(400, 0);
    assert!(builtin::is_wildcard(WILDCARD));
    assert!(builtin::is_wildcard(pair(CHILD_OF, WILDCARD)));
    assert!(builtin::is_wildcard(pair(WILDCARD, e)));
    assert!(!builtin::is_wildcard(pair(CHILD_OF, e)));
    assert!(!builtin::is_wildcard(e));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn pair_halves_round_trip(rel in 1..=MAX_INDEX, target in 1..=MAX_INDEX) {
        let relation = Id::entity(rel, 0);
        let tgt = Id::entity(target, 0);
        let p = pair(relation, tgt);
        prop_assert_eq!(p.pair_relation(), relation);
        prop_assert_eq!(p.pair_target(), tgt);
    }

    #[test]
    fn next_generation_never_equals(index in 0..=MAX_INDEX, generation in 0..MAX_GENERATION) {
        let id = Id::entity(index, generation);
        let next = id.with_next_generation();
        prop_assert_ne!(id, next);
        prop_assert_eq!(next.index(), index);
        prop_assert!(next.generation() > id.generation());
    }

    #[test]
    fn pairs_sort_after_entities(
        index in 0..=MAX_INDEX,
        generation in 0..=MAX_GENERATION,
        rel in 0..=MAX_INDEX,
        target in 0..=MAX_INDEX,
    ) {
        let entity = Id::entity(index, generation);
        let p = pair(Id::entity(rel, 0), Id::entity(target, 0));
        prop_assert!(entity < p);
    }
}
