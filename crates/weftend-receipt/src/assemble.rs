//! Operator receipt assembly: the run's top-level, sorted, self-sealed
//! summary.

use serde::{Deserialize, Serialize};
use tracing::debug;

use weftend_canon::seal;

/// One entry in an operator receipt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ReceiptEntry {
    /// What this entry is (`"mint"`, `"decision"`, `"disclosure"`,
    /// `"appeal"`, `"privacy_lint"`, …).
    pub kind: String,
    /// Path of the written artifact, relative to the output root.
    pub rel_path: String,
    /// The artifact's digest.
    pub digest: String,
}

/// The top-level per-run summary built last, once every sub-receipt exists.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OperatorReceipt {
    /// Schema tag: `"weftend.operator_receipt/0"`.
    pub schema: String,
    /// Identifies the build that produced this run.
    pub build_fingerprint: String,
    /// The command invoked, verbatim.
    pub command: String,
    /// Sorted, deduplicated `(kind, relPath, digest)` entries.
    pub entries: Vec<ReceiptEntry>,
    /// Stable-sorted, deduplicated warnings.
    pub warnings: Vec<String>,
    /// `sha256(canonical({"receipts": entries}))`.
    pub out_root_digest: String,
    /// Self-digest sealing this receipt sans this field.
    pub receipt_digest: String,
}

#[derive(Serialize)]
struct ReceiptsEnvelope<'a> {
    receipts: &'a [ReceiptEntry],
}

/// Build an [`OperatorReceipt`] from a run's accumulated entries and
/// warnings, sorting and deduplicating both, then sealing `out_root_digest`
/// and `receipt_digest`.
#[must_use]
pub fn assemble(
    build_fingerprint: &str,
    command: &str,
    mut entries: Vec<ReceiptEntry>,
    mut warnings: Vec<String>,
) -> OperatorReceipt {
    debug!(target: "weftend.receipt.assemble", command, entries = entries.len(), "assembling operator receipt");
    entries.sort();
    entries.dedup();
    warnings.sort();
    warnings.dedup();

    let out_root_digest =
        weftend_canon::Digest::sha256_of_canonical(&ReceiptsEnvelope { receipts: &entries })
            .map(|d| d.to_string())
            .unwrap_or_default();

    let mut receipt = OperatorReceipt {
        schema: "weftend.operator_receipt/0".to_string(),
        build_fingerprint: build_fingerprint.to_string(),
        command: command.to_string(),
        entries,
        warnings,
        out_root_digest,
        receipt_digest: String::new(),
    };
    if let Ok(digest) = seal(&receipt, "receipt_digest") {
        receipt.receipt_digest = digest.to_string();
    }
    receipt
}
