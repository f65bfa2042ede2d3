// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Canonical JSON encoding, stable ordering primitives, and digest helpers.
//!
//! This crate is the only admissible encoder for anything that becomes a
//! digest or flows into a signature anywhere in WeftEnd. Every other
//! component depends on it; it depends on nothing else in this workspace.

mod digest;
mod error;
mod graph;
mod seal;
mod sort;
mod value;

pub use digest::{Digest, ParseDigestError, ZERO_SHA256};
pub use error::CanonError;
pub use graph::CanonicalGraph;
pub use seal::{canonical, seal, verify_seal};
pub use sort::{
    sort_by_cap_params, sort_by_id, sort_by_id_role, sort_by_node_content, sort_by_node_id,
};
pub use value::{canonical_string, canonical_value, normalize};

/// Produce the canonical JSON string for any serializable value.
///
/// This is the top-level entry point described in the core design as
/// `canonical(v) -> string`: normalizes null/bool/number/string/array/object
/// recursively, sorts object keys by code-unit order, and emits no
/// insignificant whitespace.
///
/// # Errors
///
/// Returns [`CanonError`] if `value` cannot be serialized.
pub fn canonicalize<T: serde::Serialize>(value: &T) -> Result<String, CanonError> {
    canonical_string(value)
}
