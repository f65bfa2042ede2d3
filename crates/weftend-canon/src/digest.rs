//! Tagged digests: `"<algo>:<hex>"`.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CanonError;
use crate::value::canonical_string;

/// A digest tagged with its algorithm: `"sha256:<64 hex>"` or
/// `"fnv1a32:<8 hex>"`.
///
/// `sha256` is used for anything touching signatures, release, operator, or
/// compare output. `fnv1a32` is a non-cryptographic 32-bit fingerprint used
/// only for internal identity (e.g. pulse subject keys) where collision
/// resistance is not required. The two are never interchangeable: there is
/// no conversion between variants, only construction from bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

/// The all-zero `sha256` digest sentinel used by every "seal a structure by
/// zeroing its own digest field, then hash, then fill it back in" construction
/// (mint packages, intake decisions, pulses, operator receipts).
pub const ZERO_SHA256: &str =
    "sha256:0000000000000000000000000000000000000000000000000000000000000000";

impl Digest {
    /// Compute the `sha256` digest of raw bytes.
    #[must_use]
    pub fn sha256_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("sha256:{:x}", hasher.finalize()))
    }

    /// Compute the `sha256` digest of the canonical JSON form of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if `value` cannot be canonicalized.
    pub fn sha256_of_canonical<T: Serialize>(value: &T) -> Result<Self, CanonError> {
        let json = canonical_string(value)?;
        Ok(Self::sha256_bytes(json.as_bytes()))
    }

    /// Compute the `fnv1a32` digest of a string's UTF-8 bytes.
    #[must_use]
    pub fn fnv1a32(s: &str) -> Self {
        const OFFSET_BASIS: u32 = 0x811c_9dc5;
        const PRIME: u32 = 0x0100_0193;
        let mut hash = OFFSET_BASIS;
        for byte in s.as_bytes() {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(PRIME);
        }
        Self(format!("fnv1a32:{hash:08x}"))
    }

    /// The algorithm tag (`"sha256"` or `"fnv1a32"`).
    #[must_use]
    pub fn algo(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(a, _)| a)
    }

    /// The hex payload after the `<algo>:` prefix.
    #[must_use]
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, h)| h)
    }

    /// The full tagged string, e.g. `"sha256:abcd…"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the all-zero `sha256` sentinel.
    #[must_use]
    pub fn is_zero_sentinel(&self) -> bool {
        self.0 == ZERO_SHA256
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error parsing a tagged digest string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid digest string: {0:?}")]
pub struct ParseDigestError(pub String);

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((algo, hex)) = s.split_once(':') else {
            return Err(ParseDigestError(s.to_string()));
        };
        let expected_len = match algo {
            "sha256" => 64,
            "fnv1a32" => 8,
            _ => return Err(ParseDigestError(s.to_string())),
        };
        if hex.len() != expected_len || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseDigestError(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}
