//! The five-step ordered, fail-closed preflight gate that must pass
//! before a worker is ever spawned.

use serde_json::Value;

/// The artifact store: a process-private, read-mostly `digest -> bytes`
/// map populated by the host before a run and only ever read during it.
pub trait ArtifactStore {
    /// Look up `digest`, returning `None` if it is not present.
    fn get(&self, digest: &str) -> Option<&[u8]>;
}

/// Observed state of the shop stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampStatus {
    /// Stamp present and verified.
    Verified,
    /// Stamp present but failed verification.
    Invalid,
    /// No stamp present at all.
    Unstamped,
}

/// Cryptographic verification outcome for a release manifest signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// Signature verified against an allowlisted key.
    Ok,
    /// Signature present but could not be confirmed either way.
    Maybe,
    /// Signature verification failed outright.
    Bad,
}

/// Everything the preflight needs to evaluate one run.
pub struct PreflightInput<'a> {
    /// Expected source digest, if the caller configured one.
    pub expected_source_digest: Option<&'a str>,
    /// Digest the artifact store is expected to resolve
    /// `expected_source_digest` to, supplied independently so a mismatch
    /// can be detected without trusting the store's own bookkeeping.
    pub observed_source_digest: Option<&'a str>,
    /// Observed stamp status.
    pub stamp_status: StampStatus,
    /// The plan snapshot / path summary document, if present.
    pub plan_snapshot: Option<&'a Value>,
    /// Whether the strict policy requires a build attestation.
    pub attestation_required: bool,
    /// The build attestation's claimed plan hash, if present.
    pub attestation_plan_hash: Option<&'a str>,
    /// The expected plan hash attestation must match.
    pub expected_plan_hash: &'a str,
    /// Release manifest verification outcome.
    pub release_status: ReleaseStatus,
}

/// The outcome of running the preflight.
#[derive(Debug, Clone, Default)]
pub struct PreflightResult {
    /// Accumulated reason codes, in step order, deduplicated preserving
    /// first occurrence.
    pub reason_codes: Vec<String>,
    /// Whether the run must be denied before a worker is ever spawned.
    pub deny: bool,
}

fn push(result: &mut PreflightResult, code: &str) {
    if !result.reason_codes.iter().any(|c| c == code) {
        result.reason_codes.push(code.to_string());
    }
}

/// Run the five-step ordered preflight. Any non-empty reason-code set
/// denies the run before a worker is spawned, per the membrane's
/// contract that the union of preflight reasons becomes the `LOAD`
/// pulse's reason set.
#[must_use]
pub fn run_preflight(input: &PreflightInput<'_>) -> PreflightResult {
    let mut result = PreflightResult::default();

    // 1. Expected source digest vs artifact store.
    if let Some(expected) = input.expected_source_digest {
        match input.observed_source_digest {
            Some(observed) if observed == expected => {}
            _ => {
                push(&mut result, "ARTIFACT_DIGEST_MISMATCH");
                result.deny = true;
            }
        }
    }

    // 2. Shop stamp observation never denies on its own; only invalid is
    // surfaced for downstream severity mapping (unstamped is acceptable).
    if input.stamp_status == StampStatus::Invalid {
        push(&mut result, "STAMP_INVALID");
    }

    // 3. Plan snapshot presence, validity, and privacy.
    match input.plan_snapshot {
        None => {
            push(&mut result, "PATH_SUMMARY_MISSING");
            result.deny = true;
        }
        Some(snapshot) => {
            let privacy_issues = weftend_validate::validate_privacy(snapshot);
            if !privacy_issues.is_empty() {
                push(&mut result, "PRIVACY_FIELD_FORBIDDEN");
                result.deny = true;
            }
        }
    }

    // 4. Build attestation, only if required by the strict policy.
    if input.attestation_required {
        match input.attestation_plan_hash {
            None => {
                push(&mut result, "BUILD_ATTESTATION_MISSING");
                result.deny = true;
            }
            Some(plan_hash) if plan_hash != input.expected_plan_hash => {
                push(&mut result, "BUILD_ATTESTATION_PLAN_MISMATCH");
                result.deny = true;
            }
            Some(_) => {}
        }
    }

    // 5. Release manifest verification.
    match input.release_status {
        ReleaseStatus::Ok => {}
        ReleaseStatus::Maybe => {
            push(&mut result, "RELEASE_UNVERIFIED");
            result.deny = true;
        }
        ReleaseStatus::Bad => {
            push(&mut result, "RELEASE_UNVERIFIED");
            result.deny = true;
        }
    }

    result
}
