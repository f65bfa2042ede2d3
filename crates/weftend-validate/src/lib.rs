// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Fail-closed schema and invariant validators over every externally
//! sourced WeftEnd structure.
//!
//! Every validator here returns a deterministically ordered `issues[]`
//! instead of throwing. The only exception, per the canon component's own
//! contract, is a cycle detected while canonicalizing — callers wrap that
//! and fold it into a `CANONICAL_INVALID` issue rather than letting it
//! propagate past this crate.

mod evidence;
mod issue;
mod privacy;
mod release;
mod schema;
mod trust;

pub use evidence::{validate_evidence_chain, validate_evidence_record, EvidenceRecord};
pub use issue::{collect_issues, sort_issues, typed, Issue};
pub use privacy::{scan, validate_privacy, PrivacyCategory, PrivacyMatch};
pub use release::{
    validate_release_binding, validate_release_manifest, CompilerRef, ManifestBody, ManifestRef,
    PlanRef, ReleaseManifest, TrustRef,
};
pub use schema::{validate_against_schema, validate_self};
pub use trust::{is_valid_node_id, validate_trust_graph, DigestRecord, TrustGraph, TrustNode, NODE_ID_PREFIXES};
