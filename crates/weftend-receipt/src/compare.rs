//! Compare two runs' outputs across seven independent buckets, producing a
//! bounded ASCII report that itself passes the privacy lint.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use weftend_examiner::{IntakeDecision, MintPackage};

/// One of the seven comparison buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bucket {
    /// Content: the capture digest.
    C,
    /// External references observed.
    X,
    /// Accumulated reason codes.
    R,
    /// The policy evaluated against.
    P,
    /// Host truth: the decided grade and action.
    H,
    /// The limits in force.
    B,
    /// The mint digest.
    D,
}

impl Bucket {
    /// All seven buckets, in report order.
    pub const ALL: [Bucket; 7] =
        [Bucket::C, Bucket::X, Bucket::R, Bucket::P, Bucket::H, Bucket::B, Bucket::D];
}

/// One bucket's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BucketVerdict {
    /// The two sides agree on this bucket.
    Same,
    /// The two sides disagree on this bucket.
    Changed,
}

/// One row of the compare report.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BucketResult {
    /// Which bucket this row is.
    pub bucket: Bucket,
    /// `SAME` or `CHANGED`.
    pub verdict: BucketVerdict,
}

/// The overall comparison verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompareVerdict {
    /// Every bucket agreed.
    Same,
    /// At least one bucket disagreed.
    Changed,
    /// One or both sides could not be read or parsed as a valid mint
    /// package, so no bucket comparison was meaningful.
    Blocked,
}

/// The full compare report.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CompareReport {
    /// Schema tag: `"weftend.compare_report/0"`.
    pub schema: String,
    /// `SAME`, `CHANGED`, or `BLOCKED`.
    pub verdict: CompareVerdict,
    /// Per-bucket results; empty when `BLOCKED`.
    pub buckets: Vec<BucketResult>,
}

fn json_eq<T: Serialize>(a: &T, b: &T) -> bool {
    serde_json::to_value(a).ok() == serde_json::to_value(b).ok()
}

fn bucket_verdict(same: bool) -> BucketVerdict {
    if same { BucketVerdict::Same } else { BucketVerdict::Changed }
}

/// Compare two already-parsed run outputs, bucket by bucket.
#[must_use]
pub fn compare_runs(
    mint_a: &MintPackage,
    decision_a: &IntakeDecision,
    mint_b: &MintPackage,
    decision_b: &IntakeDecision,
) -> CompareReport {
    let buckets = vec![
        BucketResult { bucket: Bucket::C, verdict: bucket_verdict(mint_a.capture.capture_digest == mint_b.capture.capture_digest) },
        BucketResult { bucket: Bucket::X, verdict: bucket_verdict(mint_a.observations.external_refs == mint_b.observations.external_refs) },
        BucketResult { bucket: Bucket::R, verdict: bucket_verdict(mint_a.grade.reason_codes == mint_b.grade.reason_codes) },
        BucketResult { bucket: Bucket::P, verdict: bucket_verdict(mint_a.digests.policy_digest == mint_b.digests.policy_digest) },
        BucketResult {
            bucket: Bucket::H,
            verdict: bucket_verdict(decision_a.grade == decision_b.grade && decision_a.action == decision_b.action),
        },
        BucketResult { bucket: Bucket::B, verdict: bucket_verdict(json_eq(&mint_a.limits, &mint_b.limits)) },
        BucketResult { bucket: Bucket::D, verdict: bucket_verdict(mint_a.digests.mint_digest == mint_b.digests.mint_digest) },
    ];

    let verdict =
        if buckets.iter().any(|b| b.verdict == BucketVerdict::Changed) { CompareVerdict::Changed } else { CompareVerdict::Same };

    CompareReport { schema: "weftend.compare_report/0".to_string(), verdict, buckets }
}

fn read_mint(root: &Path) -> Option<MintPackage> {
    let bytes = std::fs::read_to_string(root.join("mint.json")).ok()?;
    serde_json::from_str(&bytes).ok()
}

fn read_decision(root: &Path) -> Option<IntakeDecision> {
    let bytes = std::fs::read_to_string(root.join("decision.json")).ok()?;
    serde_json::from_str(&bytes).ok()
}

/// Read and compare two output roots' `mint.json`/`decision.json`.
/// `BLOCKED` if either side cannot be read and parsed.
#[must_use]
pub fn compare(root_a: &Path, root_b: &Path) -> CompareReport {
    debug!(target: "weftend.receipt.compare", root_a = %root_a.display(), root_b = %root_b.display(), "comparing output roots");
    let (Some(mint_a), Some(decision_a)) = (read_mint(root_a), read_decision(root_a)) else {
        return CompareReport { schema: "weftend.compare_report/0".to_string(), verdict: CompareVerdict::Blocked, buckets: vec![] };
    };
    let (Some(mint_b), Some(decision_b)) = (read_mint(root_b), read_decision(root_b)) else {
        return CompareReport { schema: "weftend.compare_report/0".to_string(), verdict: CompareVerdict::Blocked, buckets: vec![] };
    };
    compare_runs(&mint_a, &decision_a, &mint_b, &decision_b)
}
