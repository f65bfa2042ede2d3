//! The `WEFTEND_*` environment variable contract.
//!
//! Every variable here is read-only and never echoed raw into a receipt;
//! callers that need to record that a variable was consulted should record
//! its name, never its value.

use std::path::{Path, PathBuf};

use tracing::debug;
use weftend_error::{ErrorCode, WeftError};

const VAR_ADAPTER_DISABLE: &str = "WEFTEND_ADAPTER_DISABLE";
const VAR_ADAPTER_DISABLE_FILE: &str = "WEFTEND_ADAPTER_DISABLE_FILE";
const VAR_RELEASE_DIR: &str = "WEFTEND_RELEASE_DIR";
const VAR_LIBRARY_ROOT: &str = "WEFTEND_LIBRARY_ROOT";

/// The process environment's WeftEnd-relevant configuration, read once at
/// startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Whether `WEFTEND_ADAPTER_DISABLE` force-disables the adapter for
    /// this run.
    pub adapter_disable: bool,
    /// A flag file whose mere existence also disables the adapter.
    pub adapter_disable_file: Option<PathBuf>,
    /// The release directory artifacts are minted into.
    pub release_dir: PathBuf,
    /// The read-only library root artifacts are captured from.
    pub library_root: PathBuf,
}

impl EnvConfig {
    /// True if the adapter should be treated as disabled: either the
    /// boolean flag is set, or the flag file exists on disk right now.
    #[must_use]
    pub fn adapter_disabled(&self) -> bool {
        self.adapter_disable || self.adapter_disable_file.as_deref().is_some_and(Path::exists)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" => Some(true),
        "0" | "false" | "FALSE" | "no" => Some(false),
        _ => None,
    }
}

fn fail_closed(var: &str) -> WeftError {
    debug!(target: "weftend.config.env", var, "failing closed on environment variable");
    WeftError::new(ErrorCode::ConfigEnvInvalid, format!("missing or invalid {var}")).with_context("var", var)
}

/// Read the `WEFTEND_*` environment contract from the real process
/// environment.
///
/// # Errors
///
/// Returns [`ErrorCode::ConfigEnvInvalid`] (`ADAPTER_POLICY_INVALID`) if
/// `WEFTEND_RELEASE_DIR` or `WEFTEND_LIBRARY_ROOT` is absent or empty, or if
/// `WEFTEND_ADAPTER_DISABLE` is set to a value that is not a recognized
/// boolean.
pub fn load_env() -> Result<EnvConfig, WeftError> {
    load_env_from(|k| std::env::var(k).ok())
}

/// Same as [`load_env`] but sourced from an arbitrary lookup closure,
/// letting callers (tests included) avoid mutating the real process
/// environment.
///
/// # Errors
///
/// See [`load_env`].
pub fn load_env_from(lookup: impl Fn(&str) -> Option<String>) -> Result<EnvConfig, WeftError> {
    let adapter_disable = match lookup(VAR_ADAPTER_DISABLE) {
        None => false,
        Some(raw) => parse_bool(&raw).ok_or_else(|| fail_closed(VAR_ADAPTER_DISABLE))?,
    };
    let adapter_disable_file = lookup(VAR_ADAPTER_DISABLE_FILE).filter(|s| !s.is_empty()).map(PathBuf::from);
    let release_dir = lookup(VAR_RELEASE_DIR)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| fail_closed(VAR_RELEASE_DIR))?;
    let library_root = lookup(VAR_LIBRARY_ROOT)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| fail_closed(VAR_LIBRARY_ROOT))?;

    Ok(EnvConfig { adapter_disable, adapter_disable_file, release_dir, library_root })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(map: BTreeMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |k| map.get(k).map(|v| v.to_string())
    }

    #[test]
    fn missing_release_dir_fails_closed() {
        let map = BTreeMap::from([(VAR_LIBRARY_ROOT, "/lib")]);
        let err = load_env_from(lookup(map)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigEnvInvalid);
    }

    #[test]
    fn missing_library_root_fails_closed() {
        let map = BTreeMap::from([(VAR_RELEASE_DIR, "/rel")]);
        let err = load_env_from(lookup(map)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigEnvInvalid);
    }

    #[test]
    fn invalid_adapter_disable_value_fails_closed() {
        let map = BTreeMap::from([
            (VAR_RELEASE_DIR, "/rel"),
            (VAR_LIBRARY_ROOT, "/lib"),
            (VAR_ADAPTER_DISABLE, "maybe"),
        ]);
        let err = load_env_from(lookup(map)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigEnvInvalid);
    }

    #[test]
    fn well_formed_environment_loads() {
        let map = BTreeMap::from([
            (VAR_RELEASE_DIR, "/rel"),
            (VAR_LIBRARY_ROOT, "/lib"),
            (VAR_ADAPTER_DISABLE, "false"),
        ]);
        let cfg = load_env_from(lookup(map)).unwrap();
        assert!(!cfg.adapter_disable);
        assert_eq!(cfg.release_dir, PathBuf::from("/rel"));
        assert_eq!(cfg.library_root, PathBuf::from("/lib"));
    }

    #[test]
    fn absent_adapter_disable_defaults_to_false() {
        let map = BTreeMap::from([(VAR_RELEASE_DIR, "/rel"), (VAR_LIBRARY_ROOT, "/lib")]);
        let cfg = load_env_from(lookup(map)).unwrap();
        assert!(!cfg.adapter_disable);
        assert!(!cfg.adapter_disabled());
    }

    #[test]
    fn disable_file_presence_on_disk_disables_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("disabled");
        std::fs::write(&flag, b"").unwrap();
        let cfg = EnvConfig {
            adapter_disable: false,
            adapter_disable_file: Some(flag),
            release_dir: PathBuf::from("/rel"),
            library_root: PathBuf::from("/lib"),
        };
        assert!(cfg.adapter_disabled());
    }

    #[test]
    fn disable_file_absent_on_disk_does_not_disable() {
        let cfg = EnvConfig {
            adapter_disable: false,
            adapter_disable_file: Some(PathBuf::from("/no/such/flag")),
            release_dir: PathBuf::from("/rel"),
            library_root: PathBuf::from("/lib"),
        };
        assert!(!cfg.adapter_disabled());
    }
}
