//! 🪆 Nested key expansion — `"Owner.Email": "x"` becomes `{"Owner": {"Email": "x"}}`.
//!
//! Only top-level keys are split. Values that are already objects merge with their
//! dotted siblings, in either order. Anything that would need a scalar to double as
//! an object is a [`BulkError::ConflictingKeys`]; we refuse to guess which one the
//! user meant.

use serde_json::{Map, Value};

use crate::error::BulkError;

/// 🔄 Expand separator-delimited top-level keys into nested objects.
///
/// An empty separator disables expansion and returns the map untouched.
pub(crate) fn expand_nested_keys(
    flat: Map<String, Value>,
    separator: &str,
) -> Result<Map<String, Value>, BulkError> {
    if separator.is_empty() {
        return Ok(flat);
    }

    let mut nested = Map::with_capacity(flat.len());
    for (key, value) in flat {
        let path: Vec<&str> = key.split(separator).collect();
        insert_at_path(&mut nested, &key, &path, value, separator)?;
    }
    Ok(nested)
}

fn insert_at_path(
    target: &mut Map<String, Value>,
    key: &str,
    path: &[&str],
    value: Value,
    separator: &str,
) -> Result<(), BulkError> {
    // -- split() always yields at least one segment, so this never takes the else branch
    let Some((leaf, parents)) = path.split_last() else {
        return Ok(());
    };

    let mut cursor = target;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = cursor
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        cursor = match slot {
            Value::Object(children) => children,
            _ => return Err(conflict(key, &path[..=depth], separator)),
        };
    }

    match cursor.get_mut(*leaf) {
        None => {
            cursor.insert(leaf.to_string(), value);
            Ok(())
        }
        Some(existing) => merge_into(existing, value, key, path, separator),
    }
}

/// 🤝 Objects meet objects: merge. Anything else meeting anything: conflict.
fn merge_into(
    existing: &mut Value,
    incoming: Value,
    key: &str,
    path: &[&str],
    separator: &str,
) -> Result<(), BulkError> {
    match (existing, incoming) {
        (Value::Object(existing_children), Value::Object(incoming_children)) => {
            for (child_key, child_value) in incoming_children {
                let mut child_path = path.to_vec();
                child_path.push(child_key.as_str());
                match existing_children.get_mut(&child_key) {
                    None => {
                        existing_children.insert(child_key.clone(), child_value);
                    }
                    Some(slot) => merge_into(slot, child_value, key, &child_path, separator)?,
                }
            }
            Ok(())
        }
        _ => Err(conflict(key, path, separator)),
    }
}

fn conflict(key: &str, path: &[&str], separator: &str) -> BulkError {
    BulkError::ConflictingKeys {
        key: key.to_string(),
        path: path.join(separator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            other => panic!("💀 test fixture must be an object, got {other}"),
        }
    }

    #[test]
    fn the_one_where_siblings_share_a_parent() {
        let expanded = expand_nested_keys(map(json!({"a.b": 1, "a.c": 2})), ".").unwrap();
        assert_eq!(Value::Object(expanded), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn the_one_where_three_levels_deep_is_still_fine() {
        let expanded = expand_nested_keys(map(json!({"a.b.c": "v", "top": true})), ".").unwrap();
        assert_eq!(
            Value::Object(expanded),
            json!({"a": {"b": {"c": "v"}}, "top": true})
        );
    }

    #[test]
    fn the_one_where_flat_keys_walk_through_untouched() {
        let flat = map(json!({"Name": "Acme", "Industry": "Anvils"}));
        let expanded = expand_nested_keys(flat.clone(), ".").unwrap();
        assert_eq!(expanded, flat);
    }

    #[test]
    fn the_one_where_a_scalar_and_its_dotted_child_cannot_coexist() {
        let err = expand_nested_keys(map(json!({"a": 1, "a.b": 2})), ".").unwrap_err();
        match err {
            BulkError::ConflictingKeys { key, path } => {
                assert_eq!(key, "a.b");
                assert_eq!(path, "a");
            }
            other => panic!("💀 expected ConflictingKeys, got {other:?}"),
        }
    }

    #[test]
    fn the_one_where_the_conflict_is_caught_in_the_other_order_too() {
        let err = expand_nested_keys(map(json!({"a.b": 2, "a": 1})), ".").unwrap_err();
        assert!(matches!(err, BulkError::ConflictingKeys { ref key, .. } if key == "a"));
    }

    #[test]
    fn the_one_where_an_object_and_a_dotted_key_merge_regardless_of_order() {
        let forward = expand_nested_keys(map(json!({"a": {"x": 1}, "a.b": 2})), ".").unwrap();
        let backward = expand_nested_keys(map(json!({"a.b": 2, "a": {"x": 1}})), ".").unwrap();
        assert_eq!(forward.get("a"), Some(&json!({"x": 1, "b": 2})));
        assert_eq!(backward.get("a"), Some(&json!({"b": 2, "x": 1})));
    }

    #[test]
    fn the_one_where_merging_objects_still_refuses_to_clobber_leaves() {
        let err = expand_nested_keys(map(json!({"a.b": 2, "a": {"b": 3}})), ".").unwrap_err();
        assert!(matches!(err, BulkError::ConflictingKeys { ref path, .. } if path == "a.b"));
    }

    #[test]
    fn the_one_where_a_custom_separator_is_respected() {
        let expanded =
            expand_nested_keys(map(json!({"Owner__Email": "x", "a.b": 1})), "__").unwrap();
        assert_eq!(
            Value::Object(expanded),
            json!({"Owner": {"Email": "x"}, "a.b": 1})
        );
    }

    #[test]
    fn the_one_where_an_empty_separator_means_hands_off() {
        let flat = map(json!({"a.b": 1}));
        assert_eq!(expand_nested_keys(flat.clone(), "").unwrap(), flat);
    }
}
