//! Stable sort helpers with explicit tie-breaking.
//!
//! The data model never relies on input order to settle a tie: every sort
//! used by a validator or the examiner pipeline goes through one of these
//! five named orders. All of them use [`slice::sort_by`] (or an equivalent
//! stable sort over a precomputed key), so equal keys keep their relative
//! input order rather than depending on an unstable tie-break.

use crate::value::canonical_string;
use serde::Serialize;

/// Sort by a single string id (code-unit / byte order).
pub fn sort_by_id<T>(items: &mut [T], id_of: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| id_of(a).cmp(id_of(b)));
}

/// Sort by `(id, role)`.
pub fn sort_by_id_role<T>(items: &mut [T], key_of: impl Fn(&T) -> (&str, &str)) {
    items.sort_by(|a, b| key_of(a).cmp(&key_of(b)));
}

/// Sort by a single node id (code-unit / byte order).
pub fn sort_by_node_id<T>(items: &mut [T], node_id_of: impl Fn(&T) -> &str) {
    sort_by_id(items, node_id_of);
}

/// Sort by `(nodeId, contentHash)`.
pub fn sort_by_node_content<T>(items: &mut [T], key_of: impl Fn(&T) -> (&str, &str)) {
    sort_by_id_role(items, key_of);
}

/// Sort a `Vec<T>` by `(capId, canonical(params))`.
///
/// Takes ownership of the vector (via `&mut Vec<T>` + [`std::mem::take`])
/// because the comparison key requires canonicalizing `params`, which is
/// too expensive to recompute on every comparator invocation and cannot be
/// cached against a borrowed `&mut [T]` without `T: Clone`.
///
/// # Errors
///
/// Returns the first [`crate::CanonError`] encountered while canonicalizing
/// a `params` value.
pub fn sort_by_cap_params<T, P: Serialize>(
    items: &mut Vec<T>,
    cap_id_of: impl Fn(&T) -> &str,
    params_of: impl Fn(&T) -> P,
) -> Result<(), crate::CanonError> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in std::mem::take(items) {
        let params_json = canonical_string(&params_of(&item))?;
        let cap_id = cap_id_of(&item).to_string();
        keyed.push((cap_id, params_json, item));
    }
    keyed.sort_by(|a, b| (a.0.as_str(), a.1.as_str()).cmp(&(b.0.as_str(), b.1.as_str())));
    *items = keyed.into_iter().map(|(_, _, item)| item).collect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_id() {
        let mut items = vec!["b", "a", "c"];
        sort_by_id(&mut items, |s| s);
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn sorts_by_id_role_tuple() {
        let mut items = vec![("b", "x"), ("a", "z"), ("a", "y")];
        sort_by_id_role(&mut items, |t| (t.0, t.1));
        assert_eq!(items, vec![("a", "y"), ("a", "z"), ("b", "x")]);
    }

    #[test]
    fn sorts_by_node_content() {
        let mut items = vec![("n2", "h1"), ("n1", "h2"), ("n1", "h1")];
        sort_by_node_content(&mut items, |t| (t.0, t.1));
        assert_eq!(items, vec![("n1", "h1"), ("n1", "h2"), ("n2", "h1")]);
    }

    #[test]
    fn stable_for_equal_keys() {
        let mut items = vec![(1, "first"), (1, "second"), (0, "third")];
        sort_by_id(&mut items, |_| "k");
        // All keys equal -> stable sort preserves original relative order.
        assert_eq!(items, vec![(1, "first"), (1, "second"), (0, "third")]);
    }

    #[test]
    fn sorts_by_cap_params() {
        let mut items = vec![
            ("net.fetch", serde_json::json!({"b": 1})),
            ("net.fetch", serde_json::json!({"a": 1})),
            ("cookie.read", serde_json::json!({})),
        ];
        sort_by_cap_params(&mut items, |t| t.0, |t| t.1.clone()).unwrap();
        assert_eq!(items[0].0, "cookie.read");
        assert_eq!(items[1].0, "net.fetch");
        assert_eq!(items[1].1, serde_json::json!({"a": 1}));
        assert_eq!(items[2].1, serde_json::json!({"b": 1}));
    }
}
