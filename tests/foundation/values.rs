//! Integration tests for Value types
//!
//! Tests Value variants, conversions, equality, and display.

use std::sync::Arc;

use stratum_foundation::{Id, List, Map, Value};

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn scalar_conversions() {
    assert_eq!(Value::from(true).as_bool(), Some(true));
    assert_eq!(Value::from(42_i64).as_int(), Some(42));
    assert_eq!(Value::from(7_i32).as_int(), Some(7));
    assert_eq!(Value::from(1.5).as_float(), Some(1.5));
    assert_eq!(Value::from("hi").as_str(), Some("hi"));
    assert_eq!(Value::from(String::from("owned")).as_str(), Some("owned"));
}

#[test]
fn entity_conversion() {
    let id = Id::entity(300, 2);
    assert_eq!(Value::from(id).as_entity(), Some(id));
}

#[test]
fn option_conversion() {
    assert!(Value::from(None::<i64>).is_nil());
    assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
}

#[test]
fn vec_becomes_list() {
    let value = Value::from(vec![1_i64, 2, 3]);
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[1], Value::Int(2));
}

#[test]
fn as_number_widens_ints() {
    assert_eq!(Value::from(4_i64).as_number(), Some(4.0));
    assert_eq!(Value::from(0.5).as_number(), Some(0.5));
    assert_eq!(Value::from("x").as_number(), None);
}

// =============================================================================
// Collections
// =============================================================================

#[test]
fn list_clone_shares_structure() {
    let list: List = (0..100_i64).map(Value::from).collect();
    let original = Value::List(list);
    let copy = original.clone();
    assert_eq!(original, copy);
}

#[test]
fn map_values() {
    let mut map = Map::new();
    map.insert(Arc::from("x"), Value::from(1_i64));
    map.insert(Arc::from("y"), Value::from(2_i64));
    let value = Value::from(map);

    let map = value.as_map().unwrap();
    assert_eq!(map.get("x"), Some(&Value::Int(1)));
    assert_eq!(value.kind(), "map");
}

// =============================================================================
// Equality and Display
// =============================================================================

#[test]
fn different_variants_differ() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert_ne!(Value::Nil, Value::Bool(false));
}

#[test]
fn display_formats() {
    assert_eq!(Value::Nil.to_string(), "nil");
    assert_eq!(Value::from(5_i64).to_string(), "5");
    assert_eq!(Value::from("s").to_string(), "s");
    assert_eq!(Value::from(vec![1_i64, 2]).to_string(), "[1 2]");
}
