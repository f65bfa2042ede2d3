//! The tartarus ledger: an append-only record of every strict-mode
//! violation, visible to the portal projection but never an input to any
//! release-relevant digest.

use serde::{Deserialize, Serialize};

use weftend_canon::Digest;

/// The closed set of violation kinds tartarus records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// `stamp.missing`
    StampMissing,
    /// `stamp.invalid`
    StampInvalid,
    /// `tier.violation`
    TierViolation,
    /// `cap.replay`
    CapReplay,
    /// `membrane.selftest.failed`
    MembraneSelftestFailed,
    /// `secretzone.unavailable`
    SecretzoneUnavailable,
    /// `secret.leak.attempt`
    SecretLeakAttempt,
    /// `artifact.mismatch`
    ArtifactMismatch,
    /// `pkg.locator.mismatch`
    PkgLocatorMismatch,
    /// `evidence.digest.mismatch`
    EvidenceDigestMismatch,
    /// `release.manifest.invalid`
    ReleaseManifestInvalid,
    /// `release.signature.bad`
    ReleaseSignatureBad,
    /// `release.manifest.mismatch`
    ReleaseManifestMismatch,
}

/// Severity assigned to a violation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Denies the run.
    Deny,
    /// Quarantines the artifact pending review.
    Quarantine,
}

/// Remedy recommended for a violation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Remedy {
    /// No remedy is applicable.
    None,
    /// Contact the shop that issued the stamp.
    ContactShop,
    /// Move the artifact to a lower trust tier.
    MoveTierDown,
    /// Downgrade the execution mode.
    DowngradeMode,
    /// Rebuild the artifact from a trusted source.
    RebuildFromTrusted,
    /// Provide the missing evidence record.
    ProvideEvidence,
}

impl ViolationKind {
    /// Look up this kind's `(severity, remedy)` from the closed mapping
    /// table.
    #[must_use]
    pub fn severity_remedy(&self) -> (Severity, Remedy) {
        match self {
            Self::StampMissing => (Severity::Quarantine, Remedy::ContactShop),
            Self::StampInvalid => (Severity::Quarantine, Remedy::ContactShop),
            Self::TierViolation => (Severity::Quarantine, Remedy::MoveTierDown),
            Self::CapReplay => (Severity::Deny, Remedy::None),
            Self::MembraneSelftestFailed => (Severity::Deny, Remedy::DowngradeMode),
            Self::SecretzoneUnavailable => (Severity::Deny, Remedy::DowngradeMode),
            Self::SecretLeakAttempt => (Severity::Quarantine, Remedy::RebuildFromTrusted),
            Self::ArtifactMismatch => (Severity::Quarantine, Remedy::RebuildFromTrusted),
            Self::PkgLocatorMismatch => (Severity::Quarantine, Remedy::RebuildFromTrusted),
            Self::EvidenceDigestMismatch => (Severity::Deny, Remedy::ProvideEvidence),
            Self::ReleaseManifestInvalid => (Severity::Quarantine, Remedy::RebuildFromTrusted),
            Self::ReleaseSignatureBad => (Severity::Quarantine, Remedy::RebuildFromTrusted),
            Self::ReleaseManifestMismatch => (Severity::Deny, Remedy::DowngradeMode),
        }
    }
}

/// One append-only tartarus record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TartarusRecord {
    /// Schema tag.
    pub schema: String,
    /// Self-digest over the record sans this field.
    pub record_id: String,
    /// The plan digest in effect.
    pub plan_digest: String,
    /// The block hash this violation concerns.
    pub block_hash: String,
    /// What kind of violation this is.
    pub kind: ViolationKind,
    /// Severity, derived from `kind`.
    pub severity: Severity,
    /// Remedy, derived from `kind`.
    pub remedy: Remedy,
    /// Reason codes associated with this violation.
    pub reason_codes: Vec<String>,
    /// Stamp digest, if relevant.
    pub stamp_digest: Option<String>,
    /// Evidence digests, if relevant.
    pub evidence_digests: Vec<String>,
    /// Append order within this run.
    pub seq: u64,
}

fn fnv1a32_record_id(record: &TartarusRecord) -> String {
    let canonical = weftend_canon::canonical(record).unwrap_or_default();
    Digest::fnv1a32(&canonical).to_string()
}

/// The append-only, process-local tartarus ledger for one run.
#[derive(Debug, Default)]
pub struct TartarusLedger {
    records: Vec<TartarusRecord>,
}

impl TartarusLedger {
    /// Construct an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new violation record, computing its `severity`, `remedy`,
    /// and self-digest `record_id`.
    pub fn record(
        &mut self,
        plan_digest: impl Into<String>,
        block_hash: impl Into<String>,
        kind: ViolationKind,
        mut reason_codes: Vec<String>,
        stamp_digest: Option<String>,
        evidence_digests: Vec<String>,
    ) -> &TartarusRecord {
        reason_codes.sort();
        reason_codes.dedup();
        let (severity, remedy) = kind.severity_remedy();
        let seq = self.records.len() as u64 + 1;

        let mut record = TartarusRecord {
            schema: "weftend.tartarus/0".to_string(),
            record_id: String::new(),
            plan_digest: plan_digest.into(),
            block_hash: block_hash.into(),
            kind,
            severity,
            remedy,
            reason_codes,
            stamp_digest,
            evidence_digests,
            seq,
        };
        record.record_id = fnv1a32_record_id(&record);
        self.records.push(record);
        self.records.last().expect("just pushed")
    }

    /// All records appended so far, in append order.
    #[must_use]
    pub fn records(&self) -> &[TartarusRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_remedy_table_matches_spec() {
        assert_eq!(
            ViolationKind::StampMissing.severity_remedy(),
            (Severity::Quarantine, Remedy::ContactShop)
        );
        assert_eq!(
            ViolationKind::CapReplay.severity_remedy(),
            (Severity::Deny, Remedy::None)
        );
        assert_eq!(
            ViolationKind::EvidenceDigestMismatch.severity_remedy(),
            (Severity::Deny, Remedy::ProvideEvidence)
        );
    }

    #[test]
    fn records_append_with_increasing_seq() {
        let mut ledger = TartarusLedger::new();
        ledger.record("d1", "b1", ViolationKind::CapReplay, vec![], None, vec![]);
        ledger.record("d1", "b2", ViolationKind::StampInvalid, vec![], None, vec![]);
        let seqs: Vec<u64> = ledger.records().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn record_id_is_sealed() {
        let mut ledger = TartarusLedger::new();
        let rec = ledger.record("d1", "b1", ViolationKind::CapReplay, vec![], None, vec![]);
        assert!(rec.record_id.starts_with("fnv1a32:"));
    }
}
