// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Unified error taxonomy with stable error codes for WeftEnd.
//!
//! Every `WeftError` carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. This is the Rust-level error type for the
//! *fatal integrity errors* named in the core design's error taxonomy —
//! cycle detection, internal programmer bugs, and filesystem write failures
//! on staged finalize. Every other failure mode (a validation issue, a
//! reason code accumulating into a receipt) is modeled as data elsewhere
//! and never thrown as a `WeftError`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to, mirroring the five core
/// components plus the ambient configuration concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Canonicalization / digesting errors (C1).
    Canon,
    /// Schema and invariant validation errors (C2).
    Validate,
    /// Capture-stage filesystem and archive errors (C3).
    Capture,
    /// Strict membrane / capability kernel errors (C4).
    Membrane,
    /// Receipt assembly, privacy lint, and finalize errors (C5).
    Receipt,
    /// Configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Canon => "canon",
            Self::Validate => "validate",
            Self::Capture => "capture",
            Self::Membrane => "membrane",
            Self::Receipt => "receipt",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serializes to a `SCREAMING_SNAKE_CASE` string guaranteed not
/// to change across patch releases. These are Rust-level fatal errors, not
/// the reason-code vocabulary that flows into receipts (see
/// `weftend_examiner::reason` and `weftend_membrane::reason` for those).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Canon --
    /// A cycle was detected while canonicalizing a graph-shaped input.
    CycleInCanonicalJson,
    /// Canonical JSON serialization failed outright.
    CanonicalSerializationFailed,

    // -- Validate --
    /// An externally sourced document failed JSON-Schema validation.
    SchemaInvalid,
    /// A cross-field binding invariant (grant/producer/release/etc.) failed.
    BindingInvalid,

    // -- Capture --
    /// The capture input path does not exist.
    CaptureInputMissing,
    /// The capture input exists but is not a supported kind.
    CaptureInputInvalid,
    /// A filesystem `stat`/metadata read failed during capture.
    CaptureStatFailed,

    // -- Membrane --
    /// A message arrived on the untrusted side channel.
    UntrustedChannel,
    /// The sandbox worker failed to start or crashed.
    SandboxWorkerFailed,

    // -- Receipt --
    /// The staged-finalize rename step failed.
    FinalizeIoFailed,
    /// A `.stage` file was found with no corresponding finalized output.
    OrphanStageFile,

    // -- Config --
    /// A required environment variable was absent or malformed.
    ConfigEnvInvalid,

    // -- Internal --
    /// Catch-all for unexpected internal errors / programmer bugs.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CycleInCanonicalJson | Self::CanonicalSerializationFailed => {
                ErrorCategory::Canon
            }
            Self::SchemaInvalid | Self::BindingInvalid => ErrorCategory::Validate,
            Self::CaptureInputMissing | Self::CaptureInputInvalid | Self::CaptureStatFailed => {
                ErrorCategory::Capture
            }
            Self::UntrustedChannel | Self::SandboxWorkerFailed => ErrorCategory::Membrane,
            Self::FinalizeIoFailed | Self::OrphanStageFile => ErrorCategory::Receipt,
            Self::ConfigEnvInvalid => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation (e.g. `"CYCLE_IN_CANONICAL_JSON"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CycleInCanonicalJson => "CYCLE_IN_CANONICAL_JSON",
            Self::CanonicalSerializationFailed => "CANONICAL_SERIALIZATION_FAILED",
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::BindingInvalid => "BINDING_INVALID",
            Self::CaptureInputMissing => "CAPTURE_INPUT_MISSING",
            Self::CaptureInputInvalid => "CAPTURE_INPUT_INVALID",
            Self::CaptureStatFailed => "CAPTURE_STAT_FAILED",
            Self::UntrustedChannel => "UNTRUSTED_CHANNEL",
            Self::SandboxWorkerFailed => "SANDBOX_WORKER_ERROR",
            Self::FinalizeIoFailed => "FINALIZE_IO_FAILED",
            Self::OrphanStageFile => "VERIFY360_ORPHAN_OUTPUT",
            Self::ConfigEnvInvalid => "ADAPTER_POLICY_INVALID",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WeftError
// ---------------------------------------------------------------------------

/// Unified WeftEnd error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context. None
/// of these fields may contain non-deterministic content (a timestamp, an
/// absolute path, an OS error string) once this error's message is folded
/// into a receipt — callers at that boundary rewrite the message into a
/// bounded reason code instead (see the core design's propagation policy).
pub struct WeftError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl WeftError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialization
    /// fails, the entry is silently skipped.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for WeftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("WeftError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for WeftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for WeftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::CycleInCanonicalJson,
        ErrorCode::CanonicalSerializationFailed,
        ErrorCode::SchemaInvalid,
        ErrorCode::BindingInvalid,
        ErrorCode::CaptureInputMissing,
        ErrorCode::CaptureInputInvalid,
        ErrorCode::CaptureStatFailed,
        ErrorCode::UntrustedChannel,
        ErrorCode::SandboxWorkerFailed,
        ErrorCode::FinalizeIoFailed,
        ErrorCode::OrphanStageFile,
        ErrorCode::ConfigEnvInvalid,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = WeftError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = WeftError::new(ErrorCode::CaptureInputMissing, "no such input");
        assert_eq!(err.to_string(), "[CAPTURE_INPUT_MISSING] no such input");
    }

    #[test]
    fn display_with_context() {
        let err = WeftError::new(ErrorCode::CaptureStatFailed, "stat failed")
            .with_context("entries_seen", 12);
        let s = err.to_string();
        assert!(s.starts_with("[CAPTURE_STAT_FAILED] stat failed"));
        assert!(s.contains("entries_seen"));
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err = WeftError::new(ErrorCode::FinalizeIoFailed, "rename failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("source"));
        assert!(dbg.contains("file missing"));
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate: {}", code.as_str());
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn all_codes_display_matches_as_str() {
        for code in ALL_CODES {
            assert_eq!(code.to_string(), code.as_str());
        }
    }

    #[test]
    fn error_code_count() {
        assert_eq!(ALL_CODES.len(), 13);
    }

    #[test]
    fn all_codes_serialize_to_as_str() {
        for code in ALL_CODES {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = WeftError::new(ErrorCode::SandboxWorkerFailed, "worker died").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "not found");
    }

    #[test]
    fn category_shorthand_matches_table() {
        assert_eq!(ErrorCode::CycleInCanonicalJson.category(), ErrorCategory::Canon);
        assert_eq!(ErrorCode::SchemaInvalid.category(), ErrorCategory::Validate);
        assert_eq!(ErrorCode::CaptureInputMissing.category(), ErrorCategory::Capture);
        assert_eq!(ErrorCode::UntrustedChannel.category(), ErrorCategory::Membrane);
        assert_eq!(ErrorCode::FinalizeIoFailed.category(), ErrorCategory::Receipt);
        assert_eq!(ErrorCode::ConfigEnvInvalid.category(), ErrorCategory::Config);
        assert_eq!(ErrorCode::Internal.category(), ErrorCategory::Internal);
    }

    #[test]
    fn error_category_display() {
        assert_eq!(ErrorCategory::Canon.to_string(), "canon");
        assert_eq!(ErrorCategory::Membrane.to_string(), "membrane");
        assert_eq!(ErrorCategory::Internal.to_string(), "internal");
    }
}
