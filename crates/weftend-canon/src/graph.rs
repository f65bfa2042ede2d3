//! Cycle-checked canonicalization for graph-shaped inputs.
//!
//! `serde_json::Value` is a tree by construction, so a plain `canonicalize`
//! call can never observe a cycle. The data model's graph-shaped entities
//! (trust nodes, evidence links) are expressed as flat sequences keyed by
//! id with ownership flowing parent → child (see the design notes on
//! preferring "arena-with-indices over heap cycles"), but a caller building
//! one of those arenas can still wire up a child reference that points back
//! at an ancestor. `CanonicalGraph` is the single place that walk is
//! performed and guarded.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::error::CanonError;
use crate::value::normalize;

/// An arena of nodes addressed by index, with an explicit child-index
/// function supplied at walk time.
pub struct CanonicalGraph<N> {
    nodes: Vec<N>,
}

impl<N: Serialize> CanonicalGraph<N> {
    /// Wrap an arena of nodes for cycle-checked canonicalization.
    #[must_use]
    pub fn new(nodes: Vec<N>) -> Self {
        Self { nodes }
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Canonicalize the subtree reachable from `root`, failing with
    /// [`CanonError::Cycle`] if a path from `root` revisits a node it has
    /// already visited along that same path (a back-edge). Nodes reachable
    /// via two different non-overlapping paths (a DAG diamond, not a cycle)
    /// are canonicalized once per path and are not an error.
    ///
    /// `children` maps a node to the indices of its children within this
    /// arena.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError::Cycle`] on a back-edge, or [`CanonError::Json`]
    /// if a node cannot be serialized.
    pub fn canonicalize_from(
        &self,
        root: usize,
        children: impl Fn(&N) -> Vec<usize>,
    ) -> Result<Value, CanonError> {
        let mut visiting = HashSet::new();
        self.walk(root, &children, &mut visiting)
    }

    fn walk(
        &self,
        idx: usize,
        children: &impl Fn(&N) -> Vec<usize>,
        visiting: &mut HashSet<usize>,
    ) -> Result<Value, CanonError> {
        if !visiting.insert(idx) {
            return Err(CanonError::Cycle(format!("node index {idx}")));
        }
        let node = self
            .nodes
            .get(idx)
            .ok_or_else(|| CanonError::Cycle(format!("dangling node index {idx}")))?;
        let mut value = normalize(serde_json::to_value(node)?);

        let child_indices = children(node);
        if !child_indices.is_empty() {
            let mut child_values = Vec::with_capacity(child_indices.len());
            for child_idx in child_indices {
                child_values.push(self.walk(child_idx, children, visiting)?);
            }
            if let Value::Object(map) = &mut value {
                map.insert(
                    "_canonicalChildren".to_string(),
                    Value::Array(child_values),
                );
            }
        }

        visiting.remove(&idx);
        Ok(value)
    }
}
