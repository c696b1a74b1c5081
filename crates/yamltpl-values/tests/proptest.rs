//! Property-based tests for the values store using proptest.

use proptest::prelude::*;
use yamltpl_values::{Mapping, Value, Values, ValuesError};

// ============================================================================
// Strategies
// ============================================================================

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Seq),
            prop::collection::btree_map(key_strategy(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

fn values_strategy() -> impl Strategy<Value = Values> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..5).prop_map(Values::from)
}

/// Collects every leaf path (a non-mapping value, or an empty mapping) of a tree.
fn leaves(prefix: &str, map: &Mapping, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Map(inner) if !inner.is_empty() => leaves(&path, inner, out),
            other => out.push((path, other.clone())),
        }
    }
}

/// Looks a dotted path up without the leaf-must-not-be-a-table rule.
fn lookup<'a>(map: &'a Mapping, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.').peekable();
    let mut table = map;
    while let Some(segment) = segments.next() {
        let value = table.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        table = value.as_map()?;
    }
    None
}

// ============================================================================
// Override properties
// ============================================================================

proptest! {
    /// Every leaf of the overriding store wins.
    #[test]
    fn override_takes_every_leaf_of_other(a in values_strategy(), b in values_strategy()) {
        let mut merged = a.clone();
        merged.override_with(&b);

        let mut b_leaves = Vec::new();
        leaves("", b.as_mapping(), &mut b_leaves);
        for (path, expected) in b_leaves {
            let actual = lookup(merged.as_mapping(), &path);
            match expected {
                // An empty mapping merged into a mapping keeps the existing keys.
                Value::Map(_) => prop_assert!(actual.is_some_and(Value::is_map)),
                other => prop_assert_eq!(actual, Some(&other)),
            }
        }
    }

    /// Leaves only present in the base store survive the merge.
    #[test]
    fn override_keeps_leaves_only_in_base(a in values_strategy(), b in values_strategy()) {
        let mut merged = a.clone();
        merged.override_with(&b);

        let mut a_leaves = Vec::new();
        leaves("", a.as_mapping(), &mut a_leaves);
        for (path, expected) in a_leaves {
            // Skip paths that b touches at any prefix.
            let mut prefix = String::new();
            let mut touched = false;
            for segment in path.split('.') {
                if !prefix.is_empty() {
                    prefix.push('.');
                }
                prefix.push_str(segment);
                if let Some(v) = lookup(b.as_mapping(), &prefix) {
                    if !v.is_map() || prefix == path {
                        touched = true;
                        break;
                    }
                }
            }
            if !touched {
                prop_assert_eq!(lookup(merged.as_mapping(), &path), Some(&expected));
            }
        }
    }

    /// Merging with an empty store is the identity in both directions.
    #[test]
    fn override_with_empty_is_identity(a in values_strategy()) {
        let mut left = a.clone();
        left.override_with(&Values::new());
        prop_assert_eq!(&left, &a);

        let mut right = Values::new();
        right.override_with(&a);
        prop_assert_eq!(&right, &a);
    }

    /// Merging a store into itself changes nothing.
    #[test]
    fn override_is_idempotent(a in values_strategy()) {
        let mut merged = a.clone();
        merged.override_with(&a);
        prop_assert_eq!(merged, a);
    }
}

// ============================================================================
// Path resolution properties
// ============================================================================

proptest! {
    /// `path_value` finds exactly the non-table leaves.
    #[test]
    fn path_value_matches_tree(a in values_strategy()) {
        let mut all = Vec::new();
        leaves("", a.as_mapping(), &mut all);
        for (path, expected) in all {
            let result = a.path_value(&path);
            if expected.is_map() {
                let is_no_value = matches!(result, Err(ValuesError::NoValue { .. }));
                prop_assert!(is_no_value);
            } else {
                prop_assert_eq!(result.ok(), Some(&expected));
            }
        }
    }

    /// `table` succeeds exactly for paths of mappings.
    #[test]
    fn table_succeeds_only_for_mappings(a in values_strategy(), key in key_strategy()) {
        match a.get(&key) {
            Some(Value::Map(inner)) => {
                let table = a.table(&key).unwrap();
                prop_assert_eq!(table.as_mapping(), inner);
            }
            _ => {
                let is_no_table = matches!(a.table(&key), Err(ValuesError::NoTable { .. }));
                prop_assert!(is_no_table);
            }
        }
    }

    /// YAML encoding round-trips structurally.
    #[test]
    fn yaml_round_trip(a in values_strategy()) {
        let encoded = a.to_yaml().unwrap();
        prop_assert_eq!(Values::from_yaml(encoded).unwrap(), a);
    }
}

// ============================================================================
// Examples
// ============================================================================

#[test]
fn override_documented_example() {
    let mut a = Values::from_yaml("x: {a: 1, b: 2}").unwrap();
    a.override_with(&Values::from_yaml("x: {b: 3}").unwrap());
    assert_eq!(a, Values::from_yaml("x: {a: 1, b: 3}").unwrap());
}
