// flowbot/src/matcher.rs

//! Structural subset matching over nested JSON-like values.
//!
//! Used for routing decisions (`next_step_patterns`) and for `data_check`
//! conditions.
//!
//! - mapping vs mapping: every pattern key must match the data value under the
//!   same key. Extra data keys are ignored. A key absent from the data is
//!   compared as `null`, so `{"k": null}` matches data without `k`.
//! - sequence vs sequence: every pattern element must match at least one data
//!   element. Order and multiplicity are not considered.
//! - anything else: exact equality. Mismatched shapes simply fail.

use serde_json::Value;

static NULL: Value = Value::Null;

/// Returns whether `data` satisfies `pattern`. Pure and total.
pub fn matches(data: &Value, pattern: &Value) -> bool {
  match (pattern, data) {
    (Value::Object(pattern_map), Value::Object(data_map)) => pattern_map
      .iter()
      .all(|(key, sub_pattern)| matches(data_map.get(key).unwrap_or(&NULL), sub_pattern)),
    (Value::Array(pattern_items), Value::Array(data_items)) => pattern_items
      .iter()
      .all(|sub_pattern| data_items.iter().any(|item| matches(item, sub_pattern))),
    _ => data == pattern,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn empty_patterns_match_any_container_of_their_shape() {
    assert!(matches(&json!({"a": 1}), &json!({})));
    assert!(matches(&json!({}), &json!({})));
    assert!(matches(&json!([1, 2]), &json!([])));
    assert!(matches(&json!([]), &json!([])));
  }

  #[test]
  fn mapping_match_is_a_subset_match() {
    assert!(matches(&json!({"a": 1, "b": 2}), &json!({"a": 1})));
    assert!(!matches(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    assert!(!matches(&json!({"a": 2}), &json!({"a": 1})));
  }

  #[test]
  fn sequence_match_is_existential() {
    assert!(matches(&json!([1, 2, 3]), &json!([2])));
    assert!(matches(&json!([1, 2, 3]), &json!([3, 1])));
    assert!(!matches(&json!([1, 2]), &json!([3])));
    // Duplicates in the pattern need only one satisfying element each.
    assert!(matches(&json!([7]), &json!([7, 7])));
  }

  #[test]
  fn nesting_recurses_through_both_rules() {
    assert!(matches(&json!([[1, 2]]), &json!([[1]])));
    assert!(matches(
      &json!({"data": {"items": [{"id": 1, "ok": true}, {"id": 2, "ok": false}]}}),
      &json!({"data": {"items": [{"ok": false}]}})
    ));
    assert!(!matches(
      &json!({"data": {"items": [{"id": 1, "ok": true}]}}),
      &json!({"data": {"items": [{"ok": false}]}})
    ));
  }

  #[test]
  fn mismatched_shapes_fail_without_panicking() {
    assert!(!matches(&json!(1), &json!({})));
    assert!(!matches(&json!("x"), &json!([])));
    assert!(!matches(&json!([1]), &json!({"a": 1})));
    assert!(!matches(&json!({"a": 1}), &json!([1])));
    assert!(!matches(&json!(null), &json!({"a": null})));
  }

  #[test]
  fn null_is_a_legitimate_match_target() {
    assert!(matches(&json!(null), &json!(null)));
    assert!(matches(&json!({"a": null}), &json!({"a": null})));
    assert!(matches(&json!({"b": 1}), &json!({"a": null})));
    assert!(!matches(&json!({"a": 0}), &json!({"a": null})));
  }

  #[test]
  fn scalars_compare_exactly() {
    assert!(matches(&json!("extraction"), &json!("extraction")));
    assert!(!matches(&json!(1), &json!("1")));
    assert!(!matches(&json!(true), &json!(1)));
  }
}
