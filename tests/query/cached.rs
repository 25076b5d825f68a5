//! Integration tests for cached queries

use stratum_foundation::{Id, Value};
use stratum_storage::World;

fn setup() -> (World, Id, Id) {
    let mut world = World::new();
    let position = world.component().unwrap();
    let velocity = world.component().unwrap();
    (world, position, velocity)
}

#[test]
fn cached_matches_live_query() {
    let (mut world, position, velocity) = setup();
    for i in 0..4 {
        let e = world.entity();
        world.set(e, position, i).unwrap();
        if i % 2 == 0 {
            world.set(e, velocity, i).unwrap();
        }
    }

    let query = world.query(&[position]).unwrap();
    let cached = query.cached(&world);
    assert_eq!(cached.iter(&world).count(), query.iter(&world).count());
    assert_eq!(cached.archetypes().collect::<Vec<_>>(), query.archetypes(&world));
}

#[test]
fn cached_sees_new_rows_in_known_archetypes() {
    let (mut world, position, _) = setup();
    let first = world.entity();
    world.set(first, position, 1).unwrap();
    let cached = world.query(&[position]).unwrap().cached(&world);

    let second = world.entity();
    world.set(second, position, 2).unwrap();
    assert_eq!(cached.iter(&world).count(), 2);
}

#[test]
fn cached_misses_new_archetypes_until_refreshed() {
    let (mut world, position, velocity) = setup();
    let first = world.entity();
    world.set(first, position, 1).unwrap();
    let mut cached = world.query(&[position]).unwrap().cached(&world);

    // Lands in the brand-new {position, velocity} archetype
    let second = world.entity();
    world.set(second, position, 2).unwrap();
    world.set(second, velocity, 3).unwrap();

    let seen: Vec<_> = cached.iter(&world).map(|row| row.entity()).collect();
    assert!(!seen.contains(&second));
    let live = world.query(&[position]).unwrap().entities(&world);
    assert!(live.contains(&second));

    cached.refresh(&world);
    let seen: Vec<_> = cached.iter(&world).map(|row| row.entity()).collect();
    assert!(seen.contains(&second));
    assert!(seen.contains(&first));
}

#[test]
fn cached_skips_destroyed_archetypes() {
    let (mut world, position, velocity) = setup();
    let e = world.entity();
    world.set(e, position, 1).unwrap();
    world.set(e, velocity, 2).unwrap();
    let both = world.archetype_of(e).unwrap().id();
    let cached = world.query(&[position]).unwrap().cached(&world);
    assert!(cached.archetypes().any(|aid| aid == both));

    world.remove(e, velocity).unwrap();
    world.cleanup();
    assert!(world.archetype(both).is_none());

    // Only the surviving {position} archetype yields rows
    let rows: Vec<_> = cached.iter(&world).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity(), e);
    assert_eq!(rows[0].get(0), Some(&Value::from(1)));
}

#[test]
fn cached_query_keeps_filters() {
    let (mut world, position, velocity) = setup();
    let query = world.query(&[position]).unwrap().without(&[velocity]).unwrap();
    let mut cached = query.cached(&world);

    let e = world.entity();
    world.set(e, position, 1).unwrap();
    world.set(e, velocity, 1).unwrap();
    cached.refresh(&world);

    assert_eq!(cached.query(), &query);
    assert_eq!(cached.iter(&world).count(), 0);
}
