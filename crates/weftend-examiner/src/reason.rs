//! The closed reason-code vocabulary this pipeline produces.
//!
//! These are string constants, not a Rust enum, because reason codes flow
//! verbatim into receipts, policy tables keyed by string, and comparisons
//! against an external policy file — an implementer must be able to add a
//! new severity mapping for one of these strings without touching Rust
//! code, so the set stays data, not type.

/// Capture-stage reason codes.
pub mod capture {
    pub const INPUT_MISSING: &str = "CAPTURE_INPUT_MISSING";
    pub const INPUT_INVALID: &str = "CAPTURE_INPUT_INVALID";
    pub const LIMIT_FILES: &str = "CAPTURE_LIMIT_FILES";
    pub const LIMIT_BYTES: &str = "CAPTURE_LIMIT_BYTES";
    pub const PATH_INVALID: &str = "CAPTURE_PATH_INVALID";
    pub const PATH_TOO_LONG: &str = "CAPTURE_PATH_TOO_LONG";
    pub const SYMLINK_SKIPPED: &str = "CAPTURE_SYMLINK_SKIPPED";
    pub const STAT_FAILED: &str = "CAPTURE_STAT_FAILED";
    pub const TRUNCATED: &str = "CAPTURE_TRUNCATED";
}

/// ZIP-specific reason codes.
pub mod zip {
    pub const EOCD_MISSING: &str = "ZIP_EOCD_MISSING";
    pub const CD_CORRUPT: &str = "ZIP_CD_CORRUPT";
    pub const CD_EMPTY: &str = "ZIP_CD_EMPTY";
    pub const PATH_INVALID: &str = "ZIP_PATH_INVALID";
    pub const SCAN_PARTIAL: &str = "ZIP_SCAN_PARTIAL";
}

/// Detect-stage reason codes.
pub mod detect {
    pub const EXTERNAL_REFS_TRUNCATED: &str = "EXTERNAL_REFS_TRUNCATED";
}

/// Capability-denial reason codes.
pub mod cap {
    pub const DENY_NET: &str = "CAP_DENY_NET";
    pub const DENY_STORAGE: &str = "CAP_DENY_STORAGE";
    pub const DENY_COOKIE: &str = "CAP_DENY_COOKIE";
    pub const DENY_UI: &str = "CAP_DENY_UI";
}

/// Strict-probe reason codes.
pub mod probe {
    pub const NOT_APPLICABLE: &str = "PROBE_NOT_APPLICABLE";
    pub const INTERACTION_STEP_LIMIT: &str = "INTERACTION_STEP_LIMIT";
    pub const SCRIPT_TOO_LARGE: &str = "SCRIPT_TOO_LARGE";
    pub const SCRIPT_PARSE_ERROR: &str = "SCRIPT_PARSE_ERROR";
    pub const SCRIPT_NESTING_TOO_DEEP: &str = "SCRIPT_NESTING_TOO_DEEP";
    pub const SCRIPT_REPEAT_COUNT_INVALID: &str = "SCRIPT_REPEAT_COUNT_INVALID";
    pub const STRICT_COMPARTMENT_UNAVAILABLE: &str = "STRICT_COMPARTMENT_UNAVAILABLE";
}

/// Decision-stage reason codes.
pub mod decide {
    pub const APPEAL_OVERSIZE: &str = "APPEAL_OVERSIZE";
    pub const DISCLOSURE_REQUIRED: &str = "DISCLOSURE_REQUIRED";
}

/// Validation-binding reason codes this pipeline may fold into severity.
pub mod binding {
    pub const EVIDENCE_DIGEST_MISMATCH: &str = "EVIDENCE_DIGEST_MISMATCH";
    pub const RELEASE_SIGNATURE_BAD: &str = "RELEASE_SIGNATURE_BAD";
    pub const HISTORY_LINK_MISMATCH: &str = "HISTORY_LINK_MISMATCH";
}
