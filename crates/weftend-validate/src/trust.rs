//! Trust-graph invariants: grant binding, producer binding, root
//! reachability, and `NodeId` grammar.

use serde::{Deserialize, Serialize};

use crate::issue::{collect_issues, Issue};

/// Grammar-valid prefixes for a `NodeId`. A `NodeId` must begin with one of
/// these and contain no whitespace.
pub const NODE_ID_PREFIXES: &[&str] = &[
    "page:/", "block:", "svc:", "data:", "priv:", "sess:", "asset:",
];

/// A record of a package's declared capability grant digest, as produced
/// by the canon/digest step that precedes trust-graph validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRecord {
    /// Capabilities this digest record grants, pre-canonicalization.
    pub granted_caps: Vec<String>,
    /// Producer hash recorded at digesting time, if the producer is known.
    pub producer_hash: Option<String>,
}

/// One node in the trust graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustNode {
    /// This node's `NodeId`.
    pub id: String,
    /// Capabilities this node claims to grant.
    pub grants: Vec<String>,
    /// The digest record this node was minted from.
    pub digest: DigestRecord,
    /// The package hash attached to this node, if a producer package exists.
    pub package_hash: Option<String>,
}

/// The full trust graph validated as a unit: every node plus the
/// designated root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustGraph {
    /// The `NodeId` that must appear in `nodes`.
    pub root_page_id: String,
    /// Every node reachable in this graph.
    pub nodes: Vec<TrustNode>,
}

/// Returns `true` if `id` satisfies the `NodeId` grammar: non-empty,
/// whitespace-free, and starting with one of [`NODE_ID_PREFIXES`].
#[must_use]
pub fn is_valid_node_id(id: &str) -> bool {
    !id.is_empty()
        && !id.chars().any(char::is_whitespace)
        && NODE_ID_PREFIXES.iter().any(|p| id.starts_with(p))
}

fn canonicalize_caps(caps: &[String]) -> Vec<String> {
    let mut sorted = caps.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Validate every binding invariant over a [`TrustGraph`]: grant binding,
/// producer binding, root-reachability, and `NodeId` grammar for every
/// node, in that order per node.
#[must_use]
pub fn validate_trust_graph(graph: &TrustGraph) -> Vec<Issue> {
    let mut buf = Vec::new();

    if !graph
        .nodes
        .iter()
        .any(|n| n.id == graph.root_page_id)
    {
        buf.push(Issue::new(
            "ROOT_UNREACHABLE",
            "rootPageId",
            format!(
                "rootPageId {:?} does not appear in nodes[]",
                graph.root_page_id
            ),
        ));
    }

    for (i, node) in graph.nodes.iter().enumerate() {
        let path_prefix = format!("nodes[{i}]");

        if !is_valid_node_id(&node.id) {
            buf.push(Issue::new(
                "NODE_ID_INVALID",
                format!("{path_prefix}.id"),
                format!("{:?} does not match the NodeId grammar", node.id),
            ));
        }

        let expected_grants = canonicalize_caps(&node.digest.granted_caps);
        let actual_grants = canonicalize_caps(&node.grants);
        if actual_grants != expected_grants {
            buf.push(Issue::new(
                "GRANTS_MISMATCH",
                format!("{path_prefix}.grants"),
                format!(
                    "grants {actual_grants:?} do not equal digest.grantedCaps {expected_grants:?} after canonicalization"
                ),
            ));
        }

        if let (Some(package_hash), Some(producer_hash)) =
            (&node.package_hash, &node.digest.producer_hash)
        {
            if package_hash != producer_hash {
                buf.push(Issue::new(
                    "PRODUCER_HASH_MISMATCH",
                    format!("{path_prefix}.packageHash"),
                    format!(
                        "packageHash {package_hash:?} != digest.producerHash {producer_hash:?}"
                    ),
                ));
            }
        }
    }

    collect_issues(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, grants: &[&str], granted_caps: &[&str]) -> TrustNode {
        TrustNode {
            id: id.to_string(),
            grants: grants.iter().map(|s| s.to_string()).collect(),
            digest: DigestRecord {
                granted_caps: granted_caps.iter().map(|s| s.to_string()).collect(),
                producer_hash: None,
            },
            package_hash: None,
        }
    }

    #[test]
    fn node_id_grammar() {
        assert!(is_valid_node_id("page:/home"));
        assert!(is_valid_node_id("block:abc"));
        assert!(is_valid_node_id("asset:logo.png"));
        assert!(!is_valid_node_id(""));
        assert!(!is_valid_node_id("page:/home has space"));
        assert!(!is_valid_node_id("weird:foo"));
    }

    #[test]
    fn clean_graph_has_no_issues() {
        let graph = TrustGraph {
            root_page_id: "page:/home".into(),
            nodes: vec![node("page:/home", &["net:fetch"], &["net:fetch"])],
        };
        assert!(validate_trust_graph(&graph).is_empty());
    }

    #[test]
    fn root_unreachable_is_flagged() {
        let graph = TrustGraph {
            root_page_id: "page:/missing".into(),
            nodes: vec![node("page:/home", &[], &[])],
        };
        let issues = validate_trust_graph(&graph);
        assert!(issues.iter().any(|i| i.code == "ROOT_UNREACHABLE"));
    }

    #[test]
    fn grants_mismatch_is_flagged() {
        let graph = TrustGraph {
            root_page_id: "page:/home".into(),
            nodes: vec![node("page:/home", &["net:fetch"], &["net:fetch", "storage:read"])],
        };
        let issues = validate_trust_graph(&graph);
        assert!(issues.iter().any(|i| i.code == "GRANTS_MISMATCH"));
    }

    #[test]
    fn grants_mismatch_ignores_order_and_dupes() {
        let graph = TrustGraph {
            root_page_id: "page:/home".into(),
            nodes: vec![node(
                "page:/home",
                &["storage:read", "net:fetch", "net:fetch"],
                &["net:fetch", "storage:read"],
            )],
        };
        assert!(validate_trust_graph(&graph).is_empty());
    }

    #[test]
    fn producer_hash_mismatch_is_flagged() {
        let mut n = node("page:/home", &[], &[]);
        n.package_hash = Some("sha256:aaaa".into());
        n.digest.producer_hash = Some("sha256:bbbb".into());
        let graph = TrustGraph {
            root_page_id: "page:/home".into(),
            nodes: vec![n],
        };
        let issues = validate_trust_graph(&graph);
        assert!(issues.iter().any(|i| i.code == "PRODUCER_HASH_MISMATCH"));
    }

    #[test]
    fn producer_hash_absent_is_not_flagged() {
        let n = node("page:/home", &[], &[]);
        let graph = TrustGraph {
            root_page_id: "page:/home".into(),
            nodes: vec![n],
        };
        assert!(validate_trust_graph(&graph).is_empty());
    }

    #[test]
    fn invalid_node_id_is_flagged() {
        let graph = TrustGraph {
            root_page_id: "weird:home".into(),
            nodes: vec![node("weird:home", &[], &[])],
        };
        let issues = validate_trust_graph(&graph);
        assert!(issues.iter().any(|i| i.code == "NODE_ID_INVALID"));
    }
}
