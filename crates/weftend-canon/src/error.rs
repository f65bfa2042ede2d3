//! Errors produced by canonicalization.

/// Failure modes for [`crate::canonicalize`] and friends.
///
/// Per the core's error taxonomy, this is the *only* error a canonicalizer
/// may throw; every other caller (validators, in particular) wraps it and
/// reports `CANONICAL_INVALID` on the offending path rather than propagating
/// a raw [`CanonError`].
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// A cycle was detected while walking a graph-shaped input.
    ///
    /// Carries the identifier (node index or id string) where the cycle was
    /// first observed, i.e. the node that would have been visited twice.
    #[error("CYCLE_IN_CANONICAL_JSON at {0}")]
    Cycle(String),

    /// The value could not be serialized to JSON at all.
    #[error("failed to serialize value for canonicalization: {0}")]
    Json(#[from] serde_json::Error),

    /// [`crate::seal::seal`] was asked to zero a field on a value whose
    /// top-level JSON form is not an object.
    #[error("cannot seal a non-object value (field {0:?})")]
    NotAnObject(String),
}
