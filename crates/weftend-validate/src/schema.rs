//! JSON-Schema boundary validation for externally sourced documents
//! (policy files, release manifests, plan snapshots) before any field is
//! read.
//!
//! Duck-typing at the boundary is forbidden: a document that parses as
//! JSON but does not conform to its schema must never reach a validator
//! that reads specific fields out of it.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use crate::issue::{collect_issues, Issue};

/// Validate `value` against the JSON Schema generated for `T`, returning
/// one `SCHEMA_INVALID` issue per schema violation.
///
/// `value` should already be the parsed JSON document; this does not parse
/// bytes itself. Each issue's `path` is the schema validator's JSON
/// Pointer into the document, with the leading `/` stripped so it matches
/// this crate's dotted-path convention elsewhere.
#[must_use]
pub fn validate_against_schema<T: JsonSchema>(value: &Value) -> Vec<Issue> {
    let schema = schemars::schema_for!(T);
    let schema_value = match serde_json::to_value(&schema) {
        Ok(v) => v,
        Err(e) => {
            return collect_issues(vec![Issue::new(
                "SCHEMA_INVALID",
                "",
                format!("could not build JSON Schema for boundary type: {e}"),
            )]);
        }
    };

    let validator = match jsonschema::validator_for(&schema_value) {
        Ok(v) => v,
        Err(e) => {
            return collect_issues(vec![Issue::new(
                "SCHEMA_INVALID",
                "",
                format!("generated schema is itself invalid: {e}"),
            )]);
        }
    };

    let mut buf = Vec::new();
    for error in validator.iter_errors(value) {
        let path = error.instance_path.to_string();
        let path = path.strip_prefix('/').unwrap_or(&path).replace('/', ".");
        buf.push(Issue::new("SCHEMA_INVALID", path, error.to_string()));
    }
    collect_issues(buf)
}

/// Convenience: serialize `value` to [`Value`] and validate it against its
/// own derived schema. Useful for a sanity check that a value this process
/// built itself still satisfies the schema boundary it will present to
/// other implementations.
#[must_use]
pub fn validate_self<T: JsonSchema + Serialize>(value: &T) -> Vec<Issue> {
    match serde_json::to_value(value) {
        Ok(v) => validate_against_schema::<T>(&v),
        Err(e) => collect_issues(vec![Issue::new(
            "SCHEMA_INVALID",
            "",
            format!("value could not be serialized for self-check: {e}"),
        )]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct Example {
        name: String,
        count: u32,
    }

    #[test]
    fn valid_document_has_no_issues() {
        let doc = json!({"name": "a", "count": 3});
        assert!(validate_against_schema::<Example>(&doc).is_empty());
    }

    #[test]
    fn missing_required_field_is_flagged() {
        let doc = json!({"count": 3});
        let issues = validate_against_schema::<Example>(&doc);
        assert!(!issues.is_empty());
        assert!(issues.iter().all(|i| i.code == "SCHEMA_INVALID"));
    }

    #[test]
    fn wrong_type_is_flagged() {
        let doc = json!({"name": 5, "count": "nope"});
        let issues = validate_against_schema::<Example>(&doc);
        assert!(issues.len() >= 2);
    }

    #[test]
    fn validate_self_round_trips_clean_value() {
        let e = Example { name: "ok".into(), count: 1 };
        assert!(validate_self(&e).is_empty());
    }
}
