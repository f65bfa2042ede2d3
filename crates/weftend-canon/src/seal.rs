//! The "zero a digest field, canonicalize, hash, fill it back in" pattern
//! shared by every self-describing structure in the data model (mint
//! packages, intake decisions, pulses, the operator receipt).

use serde::Serialize;
use serde_json::Value;

use crate::digest::Digest;
use crate::error::CanonError;
use crate::value::{canonical_string, normalize};

/// Compute the `sha256` digest of `value`'s canonical form with `field` set
/// to the all-zero sentinel first.
///
/// This does not mutate a concrete Rust struct — it reserializes `value` to
/// a [`Value`], overwrites `field` there, canonicalizes, and hashes. Callers
/// own writing the resulting digest back into their own struct field.
///
/// # Errors
///
/// Returns [`CanonError`] if `value` cannot be serialized, or if `field`
/// does not name a top-level key of the serialized object.
pub fn seal<T: Serialize>(value: &T, field: &str) -> Result<Digest, CanonError> {
    let mut v = normalize(serde_json::to_value(value)?);
    let Value::Object(map) = &mut v else {
        return Err(CanonError::NotAnObject(field.to_string()));
    };
    map.insert(field.to_string(), Value::String(crate::digest::ZERO_SHA256.to_string()));
    let json = serde_json::to_string(&Value::Object(map.clone()))?;
    Ok(Digest::sha256_bytes(json.as_bytes()))
}

/// Verify that `value`'s stored `field` equals [`seal`] recomputed over the
/// rest of the structure.
///
/// # Errors
///
/// Returns [`CanonError`] under the same conditions as [`seal`].
pub fn verify_seal<T: Serialize>(value: &T, field: &str, stored: &Digest) -> Result<bool, CanonError> {
    Ok(&seal(value, field)? == stored)
}

/// Canonicalize `value` as a string, ignoring any digest-sealing concerns.
/// Convenience re-export so callers in this module's neighborhood do not
/// need a second `use` for the common case.
///
/// # Errors
///
/// Returns [`CanonError`] if `value` cannot be serialized.
pub fn canonical(value: &impl Serialize) -> Result<String, CanonError> {
    canonical_string(value)
}
