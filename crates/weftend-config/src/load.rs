//! Limits/Policy file loading: parsed as TOML or JSON by extension, then
//! validated against their JSON-Schema boundary before any field is read.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;
use weftend_error::{ErrorCode, WeftError};
use weftend_examiner::{Limits, Policy};

fn read_value(path: &Path) -> Result<serde_json::Value, WeftError> {
    debug!(target: "weftend.config.load", path = %path.display(), "reading config file");
    let text = std::fs::read_to_string(path).map_err(|e| {
        WeftError::new(ErrorCode::CaptureInputMissing, format!("could not read config file {}", path.display()))
            .with_source(e)
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .map_err(|e| WeftError::new(ErrorCode::SchemaInvalid, "config file is not valid JSON").with_source(e)),
        _ => toml::from_str::<toml::Value>(&text)
            .map_err(|e| WeftError::new(ErrorCode::SchemaInvalid, "config file is not valid TOML").with_source(e))
            .and_then(|v| {
                serde_json::to_value(v).map_err(|e| {
                    WeftError::new(ErrorCode::SchemaInvalid, "TOML config could not be converted to JSON")
                        .with_source(e)
                })
            }),
    }
}

fn validate_and_parse<T: DeserializeOwned + schemars::JsonSchema>(
    value: serde_json::Value,
) -> Result<T, WeftError> {
    let issues = weftend_validate::validate_against_schema::<T>(&value);
    if !issues.is_empty() {
        let codes: Vec<String> = issues.iter().map(|i| format!("{}:{}", i.path, i.code)).collect();
        return Err(WeftError::new(ErrorCode::SchemaInvalid, "config file failed schema validation")
            .with_context("issues", codes));
    }
    serde_json::from_value(value).map_err(|e| {
        WeftError::new(ErrorCode::SchemaInvalid, "config document did not match its own schema after validation")
            .with_source(e)
    })
}

/// Load and validate a [`Limits`] document from `path` (TOML or JSON by
/// extension; any extension other than `.json` is parsed as TOML).
///
/// # Errors
///
/// Returns [`ErrorCode::SchemaInvalid`] if the file cannot be read, cannot
/// be parsed, or fails its JSON-Schema boundary check.
pub fn load_limits(path: &Path) -> Result<Limits, WeftError> {
    validate_and_parse(read_value(path)?)
}

/// Load and validate a [`Policy`] document from `path` (TOML or JSON by
/// extension; any extension other than `.json` is parsed as TOML).
///
/// # Errors
///
/// Returns [`ErrorCode::SchemaInvalid`] if the file cannot be read, cannot
/// be parsed, or fails its JSON-Schema boundary check.
pub fn load_policy(path: &Path) -> Result<Policy, WeftError> {
    validate_and_parse(read_value(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_limits_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.json");
        fs::write(&path, serde_json::to_vec(&Limits::default()).unwrap()).unwrap();
        let limits = load_limits(&path).unwrap();
        assert_eq!(limits.max_files, Limits::default().max_files);
    }

    #[test]
    fn loads_limits_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.toml");
        fs::write(&path, toml::to_string(&Limits::default()).unwrap()).unwrap();
        let limits = load_limits(&path).unwrap();
        assert_eq!(limits.max_total_bytes, Limits::default().max_total_bytes);
    }

    #[test]
    fn loads_policy_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        let policy = Policy::web_component_default();
        fs::write(&path, serde_json::to_vec(&policy).unwrap()).unwrap();
        let loaded = load_policy(&path).unwrap();
        assert_eq!(loaded.profile, "web");
    }

    #[test]
    fn malformed_json_fails_schema_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.json");
        fs::write(&path, b"{ not json").unwrap();
        let err = load_limits(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaInvalid);
    }

    #[test]
    fn missing_required_field_fails_schema_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        fs::write(&path, br#"{"schema": "weftend.policy/1"}"#).unwrap();
        let err = load_policy(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaInvalid);
    }

    #[test]
    fn missing_file_fails() {
        let path = Path::new("/no/such/config.json");
        assert!(load_limits(path).is_err());
    }
}
