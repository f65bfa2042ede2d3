//! Session nonce generation and envelope matching.
//!
//! The session nonce generated here is the single source of randomness in
//! the entire core; nothing else in this workspace calls into an RNG.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fresh 128-bit nonce generated once per invocation and carried on
/// every message in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionNonce(Uuid);

impl SessionNonce {
    /// Generate a new session nonce. This is the only call to a random
    /// number generator anywhere in the core.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Render as a lowercase hyphenated string.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for SessionNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The envelope every message between host and worker must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Always `"strict"` in this version.
    pub execution_mode: String,
    /// The plan digest this session is bound to.
    pub plan_digest: String,
    /// The session nonce.
    pub session_nonce: SessionNonce,
}

/// Reason a message's envelope failed to match the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeMismatch {
    /// `session_nonce` differs.
    NonceMismatch,
    /// `plan_digest` differs.
    ContextMismatch,
    /// `execution_mode` differs.
    ModeMismatch,
}

impl EnvelopeMismatch {
    /// The reason code this mismatch produces.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NonceMismatch => "NONCE_MISMATCH",
            Self::ContextMismatch => "CONTEXT_MISMATCH",
            Self::ModeMismatch => "MODE_MISMATCH",
        }
    }
}

/// Verify `actual` matches `expected` using constant-time string equality
/// for every field, checked in the order mode, context, nonce (so the
/// first mismatch found is the one reported — an implementation detail
/// that does not affect which violations get recorded, since callers
/// should treat the whole envelope as a single pass/fail gate).
///
/// # Errors
///
/// Returns the first [`EnvelopeMismatch`] found.
pub fn verify_envelope(expected: &Envelope, actual: &Envelope) -> Result<(), EnvelopeMismatch> {
    if !constant_time_eq(&expected.execution_mode, &actual.execution_mode) {
        return Err(EnvelopeMismatch::ModeMismatch);
    }
    if !constant_time_eq(&expected.plan_digest, &actual.plan_digest) {
        return Err(EnvelopeMismatch::ContextMismatch);
    }
    if expected.session_nonce != actual.session_nonce {
        return Err(EnvelopeMismatch::NonceMismatch);
    }
    Ok(())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
