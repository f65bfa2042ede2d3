//! Release binding: the four-way trust/plan/compiler/manifest cross-check,
//! plus the release manifest's own body-binding (`releaseId` self-digest).

use serde::{Deserialize, Serialize};

use crate::issue::{collect_issues, Issue};
use weftend_canon::CanonError;

/// The trust side of the four-way release binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRef {
    /// The manifest this trust node was issued against.
    pub manifest_id: String,
    /// The policy this trust node was issued under.
    pub policy_id: String,
}

/// The plan side of the four-way release binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRef {
    /// The manifest this plan was built for.
    pub manifest_id: String,
    /// The policy this plan claims to honor.
    pub policy_id: String,
    /// This plan's own hash, as recomputed by the compiler.
    pub plan_hash: String,
}

/// The compiler side of the four-way release binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerRef {
    /// The plan hash the compiler actually built against.
    pub plan_hash: String,
}

/// The manifest identity the trust and plan refs must agree with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRef {
    /// The manifest's own id.
    pub id: String,
}

/// Validate the four-way release binding: `trust.manifestId == manifest.id`,
/// `plan.manifestId == manifest.id`, `plan.policyId == trust.policyId`,
/// `compiler.planHash == plan.planHash`. Any mismatch produces
/// `BINDING_INVALID` at the specific field path that disagreed.
#[must_use]
pub fn validate_release_binding(
    trust: &TrustRef,
    plan: &PlanRef,
    compiler: &CompilerRef,
    manifest: &ManifestRef,
) -> Vec<Issue> {
    let mut buf = Vec::new();

    if trust.manifest_id != manifest.id {
        buf.push(Issue::new(
            "BINDING_INVALID",
            "trust.manifestId",
            format!(
                "trust.manifestId {:?} != manifest.id {:?}",
                trust.manifest_id, manifest.id
            ),
        ));
    }
    if plan.manifest_id != manifest.id {
        buf.push(Issue::new(
            "BINDING_INVALID",
            "plan.manifestId",
            format!(
                "plan.manifestId {:?} != manifest.id {:?}",
                plan.manifest_id, manifest.id
            ),
        ));
    }
    if plan.policy_id != trust.policy_id {
        buf.push(Issue::new(
            "BINDING_INVALID",
            "plan.policyId",
            format!(
                "plan.policyId {:?} != trust.policyId {:?}",
                plan.policy_id, trust.policy_id
            ),
        ));
    }
    if compiler.plan_hash != plan.plan_hash {
        buf.push(Issue::new(
            "BINDING_INVALID",
            "compiler.planHash",
            format!(
                "compiler.planHash {:?} != plan.planHash {:?}",
                compiler.plan_hash, plan.plan_hash
            ),
        ));
    }

    collect_issues(buf)
}

/// A release manifest body: everything `releaseId` is computed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestBody {
    /// Digest of the plan this release was built from.
    pub plan_digest: String,
    /// Digest of the policy this release was built under.
    pub policy_digest: String,
    /// Sorted, unique list of content blocks included in the release.
    pub blocks: Vec<String>,
    /// Digest of the release's path summary.
    pub path_digest: String,
}

/// A release manifest as a whole: self-describing id plus signed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
    /// Schema tag, e.g. `"weftend.release/0"`.
    pub schema: String,
    /// This manifest's self-digest, expected to equal
    /// `sha256(canonical(manifest_body))`.
    pub release_id: String,
    /// The signed body.
    pub manifest_body: ManifestBody,
    /// Attached signatures, each `(sigKind, keyId, sigB64)`.
    pub signatures: Vec<(String, String, String)>,
}

/// Validate release body binding: `blocks` must be sorted and unique, and
/// `releaseId` must equal `sha256(canonical(manifestBody))`.
///
/// A canonicalization failure (only possible on programmer error, since
/// every field here is a plain string/vec) is folded into a
/// `RELEASE_MANIFEST_INVALID` issue rather than propagated, per the canon
/// component's contract that only it may fail outright.
#[must_use]
pub fn validate_release_manifest(manifest: &ReleaseManifest) -> Vec<Issue> {
    let mut buf = Vec::new();

    let mut sorted_blocks = manifest.manifest_body.blocks.clone();
    sorted_blocks.sort();
    sorted_blocks.dedup();
    if sorted_blocks != manifest.manifest_body.blocks {
        buf.push(Issue::new(
            "RELEASE_MANIFEST_INVALID",
            "manifestBody.blocks",
            "blocks must be sorted and unique",
        ));
    }

    match expected_release_id(&manifest.manifest_body) {
        Ok(expected) if expected == manifest.release_id => {}
        Ok(expected) => buf.push(Issue::new(
            "RELEASE_SIGNATURE_BAD",
            "releaseId",
            format!(
                "releaseId {:?} != sha256(canonical(manifestBody)) {:?}",
                manifest.release_id, expected
            ),
        )),
        Err(e) => buf.push(Issue::new(
            "RELEASE_MANIFEST_INVALID",
            "manifestBody",
            format!("manifestBody could not be canonicalized: {e}"),
        )),
    }

    if manifest.signatures.is_empty() {
        buf.push(Issue::new(
            "RELEASE_SIGNATURE_BAD",
            "signatures",
            "release manifest carries no signatures",
        ));
    }

    collect_issues(buf)
}

fn expected_release_id(body: &ManifestBody) -> Result<String, CanonError> {
    Ok(weftend_canon::Digest::sha256_of_canonical(body)?.to_string())
}
