//! The `Issue` type every validator in this crate returns, plus the
//! deterministic ordering and `Typed<T>` wrapper contracts shared by all of
//! them.

use serde::{Deserialize, Serialize};

/// A single fail-closed validation finding.
///
/// `code` is a stable machine-readable tag (e.g. `"GRANTS_MISMATCH"`),
/// `path` is a field-path into the structure being validated (dotted,
/// JSON-Pointer-like but without the leading slash requirement), and
/// `message` is a human-readable explanation. `Issue` carries no timestamp,
/// no absolute path, and no other non-deterministic content — it is safe to
/// fold directly into a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Stable machine-readable issue code.
    pub code: &'static str,
    /// Field path the issue was found at.
    pub path: String,
    /// Human-readable explanation.
    pub message: String,
    /// Original discovery order, used only to break ties between otherwise
    /// identical `(code, path, message)` triples; dropped from equality and
    /// serialization is intentionally kept (index is still useful
    /// downstream for debugging double-reports) but never participates in
    /// sort beyond the tie-break role below.
    #[serde(skip)]
    discovery_index: usize,
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.path == other.path && self.message == other.message
    }
}

impl Eq for Issue {}

impl Issue {
    /// Construct a new issue. `discovery_index` should be the order in
    /// which the validator found it (simply the position it was pushed at).
    #[must_use]
    pub fn new(code: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
            discovery_index: 0,
        }
    }

    fn with_index(mut self, index: usize) -> Self {
        self.discovery_index = index;
        self
    }
}

/// Sort `issues` by `(code, path, message)`, breaking ties on the order
/// they were originally pushed so that repeated identical findings across
/// passes still produce a deterministic order.
///
/// Call this once per validator before returning, assigning discovery
/// indices from the push order — see [`collect_issues`] for the common
/// case of building a list incrementally.
pub fn sort_issues(mut issues: Vec<Issue>) -> Vec<Issue> {
    for (i, issue) in issues.iter_mut().enumerate() {
        if issue.discovery_index == 0 {
            issue.discovery_index = i;
        }
    }
    issues.sort_by(|a, b| {
        (a.code, &a.path, &a.message, a.discovery_index).cmp(&(
            b.code,
            &b.path,
            &b.message,
            b.discovery_index,
        ))
    });
    issues
}

/// Build a deterministically ordered issue list from a push-order buffer.
///
/// Every validator in this crate ends with `collect_issues(buf)` rather
/// than returning `buf` directly, so discovery order is preserved as the
/// stable tie-break even after the `(code, path, message)` sort.
#[must_use]
pub fn collect_issues(buf: Vec<Issue>) -> Vec<Issue> {
    let indexed: Vec<Issue> = buf
        .into_iter()
        .enumerate()
        .map(|(i, issue)| issue.with_index(i))
        .collect();
    sort_issues(indexed)
}

/// Wrap a value and its validation issues, returning `Ok(value)` only when
/// `issues` is empty.
///
/// Mirrors the contract `validate_receipt(&Receipt) -> Result<(), Vec<ValidationError>>`
/// has in the sibling error-accumulation design this crate is grounded on,
/// generalized to hand back the validated value rather than `()`.
///
/// # Errors
///
/// Returns `Err(issues)` when `issues` is non-empty.
pub fn typed<T>(value: T, issues: Vec<Issue>) -> Result<T, Vec<Issue>> {
    if issues.is_empty() {
        Ok(value)
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_code_then_path_then_message() {
        let issues = vec![
            Issue::new("B_CODE", "x", "m1"),
            Issue::new("A_CODE", "z", "m1"),
            Issue::new("A_CODE", "a", "m2"),
            Issue::new("A_CODE", "a", "m1"),
        ];
        let sorted = collect_issues(issues);
        let codes_paths: Vec<_> = sorted.iter().map(|i| (i.code, i.path.as_str())).collect();
        assert_eq!(
            codes_paths,
            vec![
                ("A_CODE", "a"),
                ("A_CODE", "a"),
                ("A_CODE", "z"),
                ("B_CODE", "x"),
            ]
        );
        // the two (A_CODE, a) entries break ties by message
        assert_eq!(sorted[0].message, "m1");
        assert_eq!(sorted[1].message, "m2");
    }

    #[test]
    fn stable_for_duplicate_triples() {
        let issues = vec![
            Issue::new("SAME", "p", "m"),
            Issue::new("SAME", "p", "m"),
            Issue::new("SAME", "p", "m"),
        ];
        let sorted = collect_issues(issues);
        assert_eq!(sorted.len(), 3);
        assert!(sorted.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn typed_ok_when_empty() {
        assert_eq!(typed(42, vec![]), Ok(42));
    }

    #[test]
    fn typed_err_when_nonempty() {
        let issues = vec![Issue::new("X", "p", "m")];
        assert_eq!(typed(42, issues.clone()), Err(issues));
    }
}
