//! Integration tests for relationships
//!
//! Tests pairs, targets, wildcard lookups, children, and delete cleanup
//! policies.

use std::collections::HashSet;

use stratum_foundation::builtin::{CHILD_OF, DELETE, ON_DELETE, ON_DELETE_TARGET, WILDCARD};
use stratum_foundation::{ErrorKind, Id, Value, pair};
use stratum_storage::World;

// =============================================================================
// Parent and Targets
// =============================================================================

#[test]
fn child_of_parent() {
    let mut world = World::new();
    let e1 = world.entity();
    let e2 = world.entity();
    world.set(e1, pair(CHILD_OF, e2), Value::Nil).unwrap();

    assert_eq!(world.parent(e1).unwrap(), Some(e2));
    assert_eq!(world.target(e1, CHILD_OF, 0).unwrap(), Some(e2));
    assert_eq!(world.target(e1, CHILD_OF, 1).unwrap(), None);
}

#[test]
fn target_without_relation_is_none() {
    let mut world = World::new();
    let e = world.entity();
    assert_eq!(world.parent(e).unwrap(), None);
    assert_eq!(world.targets(e, CHILD_OF).unwrap(), Vec::<Id>::new());
}

#[test]
fn target_on_dead_entity_fails() {
    let mut world = World::new();
    let e = world.entity();
    world.delete(e).unwrap();
    assert!(world.parent(e).unwrap_err().is_not_alive());
}

#[test]
fn pair_as_relation_is_invalid() {
    let mut world = World::new();
    let parent = world.entity();
    let child = world.entity();
    world.add(child, pair(CHILD_OF, parent)).unwrap();

    let nested = pair(CHILD_OF, parent);
    let err = world.target(child, nested, 0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidId(_)));
    assert!(world.targets(child, nested).is_err());
    assert_eq!(world.children(nested).count(), 0);
}

#[test]
fn targets_lists_every_pair() {
    let mut world = World::new();
    let likes = world.tag().unwrap();
    let e = world.entity();
    let friends: Vec<_> = (0..3).map(|_| world.entity()).collect();
    for &f in friends.iter().rev() {
        world.add(e, pair(likes, f)).unwrap();
    }
    world.add(e, pair(CHILD_OF, friends[0])).unwrap();

    assert_eq!(world.targets(e, likes).unwrap(), friends);
    assert_eq!(world.targets(e, CHILD_OF).unwrap(), vec![friends[0]]);
}

#[test]
fn target_restores_current_generation() {
    let mut world = World::new();
    let stale = world.entity();
    world.delete(stale).unwrap();
    let parent = world.entity();
    let child = world.entity();
    world.add(child, pair(CHILD_OF, parent)).unwrap();

    assert_eq!(parent.index(), stale.index());
    assert_eq!(world.parent(child).unwrap(), Some(parent));
}

// =============================================================================
// Wildcards and Traversal
// =============================================================================

#[test]
fn has_accepts_wildcard_pairs() {
    let mut world = World::new();
    let parent = world.entity();
    let child = world.entity();
    world.add(child, pair(CHILD_OF, parent)).unwrap();

    assert!(world.has(child, &[pair(CHILD_OF, WILDCARD)]).unwrap());
    assert!(world.has(child, &[pair(WILDCARD, parent)]).unwrap());
    assert!(!world.has(parent, &[pair(CHILD_OF, WILDCARD)]).unwrap());
}

#[test]
fn children_lists_direct_children() {
    let mut world = World::new();
    let parent = world.entity();
    let a = world.entity();
    let b = world.entity();
    let grandchild = world.entity();
    world.add(a, pair(CHILD_OF, parent)).unwrap();
    world.add(b, pair(CHILD_OF, parent)).unwrap();
    world.add(grandchild, pair(CHILD_OF, a)).unwrap();

    let children: HashSet<_> = world.children(parent).collect();
    assert_eq!(children, HashSet::from([a, b]));
}

#[test]
fn each_spans_archetypes() {
    let mut world = World::new();
    let position = world.component().unwrap();
    let velocity = world.component().unwrap();
    let a = world.entity();
    let b = world.entity();
    world.set(a, position, 1).unwrap();
    world.set(b, position, 2).unwrap();
    world.set(b, velocity, 3).unwrap();

    let holders: HashSet<_> = world.each(position).collect();
    assert_eq!(holders, HashSet::from([a, b]));
    assert_eq!(world.each(velocity).collect::<Vec<_>>(), vec![b]);
}

#[test]
fn relationship_index_finds_pairs_by_side() {
    let mut world = World::new();
    let likes = world.tag().unwrap();
    let alice = world.entity();
    let bob = world.entity();
    world.add(alice, pair(likes, bob)).unwrap();
    world.add(bob, pair(CHILD_OF, alice)).unwrap();

    let index = world.store().relationships();
    assert_eq!(
        index.pairs_with_relation(likes).collect::<Vec<_>>(),
        vec![pair(likes, bob)]
    );
    assert_eq!(
        index.pairs_with_target(alice).collect::<Vec<_>>(),
        vec![pair(CHILD_OF, alice)]
    );
}

#[test]
fn pair_first_and_second() {
    let mut world = World::new();
    let rel = world.component().unwrap();
    let target = world.entity();
    let p = pair(rel, target);

    assert_eq!(world.pair_first(p), Some(rel));
    assert_eq!(world.pair_second(p), Some(target));
}

// =============================================================================
// Delete Cleanup
// =============================================================================

#[test]
fn deleting_target_removes_pair() {
    let mut world = World::new();
    let likes = world.tag().unwrap();
    let position = world.component().unwrap();
    let alice = world.entity();
    let bob = world.entity();
    world.set(alice, position, 4).unwrap();
    world.add(alice, pair(likes, bob)).unwrap();

    world.delete(bob).unwrap();
    assert!(world.contains(alice));
    assert!(!world.has(alice, &[pair(likes, WILDCARD)]).unwrap());
    assert_eq!(world.get(alice, position).unwrap(), Some(&Value::from(4)));
}

#[test]
fn deleting_relation_removes_pairs() {
    let mut world = World::new();
    let likes = world.tag().unwrap();
    let alice = world.entity();
    let bob = world.entity();
    world.add(alice, pair(likes, bob)).unwrap();

    world.delete(likes).unwrap();
    assert!(world.contains(alice));
    assert!(world.archetype_of(alice).unwrap().types().is_empty());
}

#[test]
fn deleting_parent_deletes_descendants() {
    let mut world = World::new();
    let root = world.entity();
    let child = world.entity();
    let grandchild = world.entity();
    let bystander = world.entity();
    world.add(child, pair(CHILD_OF, root)).unwrap();
    world.add(grandchild, pair(CHILD_OF, child)).unwrap();

    world.delete(root).unwrap();
    assert!(!world.contains(child));
    assert!(!world.contains(grandchild));
    assert!(world.contains(bystander));
}

#[test]
fn custom_delete_target_policy() {
    let mut world = World::new();
    let owned_by = world.tag().unwrap();
    world.add(owned_by, pair(ON_DELETE_TARGET, DELETE)).unwrap();
    let owner = world.entity();
    let item = world.entity();
    world.add(item, pair(owned_by, owner)).unwrap();

    world.delete(owner).unwrap();
    assert!(!world.contains(item));
}

#[test]
fn on_delete_policy_on_relation() {
    let mut world = World::new();
    let grows_on = world.tag().unwrap();
    world.add(grows_on, pair(ON_DELETE, DELETE)).unwrap();
    let tree = world.entity();
    let apple = world.entity();
    world.add(apple, pair(grows_on, tree)).unwrap();

    world.delete(grows_on).unwrap();
    assert!(!world.contains(apple));
    assert!(world.contains(tree));
}

#[test]
fn recycled_index_does_not_inherit_pairs() {
    let mut world = World::new();
    let likes = world.tag().unwrap();
    let alice = world.entity();
    let bob = world.entity();
    world.add(alice, pair(likes, bob)).unwrap();
    world.delete(bob).unwrap();

    let carol = world.entity();
    assert_eq!(carol.index(), bob.index());
    assert_eq!(world.each(pair(likes, carol)).count(), 0);
    assert_eq!(world.target(alice, likes, 0).unwrap(), None);
}

#[test]
fn target_wildcard_reads_first_data_pair() {
    let mut world = World::new();
    let owes = world.component().unwrap();
    let bob = world.entity();
    let e = world.entity();
    world.add(e, pair(CHILD_OF, bob)).unwrap();
    world.set(e, pair(owes, bob), 7).unwrap();

    assert_eq!(
        world.get(e, pair(WILDCARD, bob)).unwrap(),
        Some(&Value::from(7))
    );
    let query = world.query(&[pair(WILDCARD, bob)]).unwrap();
    let values: Vec<_> = query.iter(&world).map(|row| row.get(0).cloned()).collect();
    assert_eq!(values, vec![Some(Value::from(7))]);
}
