//! Evidence record binding: `evidenceId` must equal the deterministic
//! digest of the record sans `evidenceId` itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::issue::{collect_issues, Issue};
use weftend_canon::CanonError;

/// An evidence record as stored in the evidence chain.
///
/// `fields` holds every attribute of the record *except* `evidenceId`
/// (kind, subject, digests, timestestamp-free counters, etc. — the shape
/// varies by record kind and is left open here, mirroring the distilled
/// spec's treatment of evidence records as an open-ended structure bound
/// only by the self-digest invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// The record's claimed self-digest.
    pub evidence_id: String,
    /// Every other field of the record, already canonical-ready (no
    /// `evidenceId` key present).
    pub fields: Value,
}

/// Validate one evidence record: `evidenceId` must equal the `sha256`
/// digest of `fields`'s canonical form.
#[must_use]
pub fn validate_evidence_record(record: &EvidenceRecord) -> Vec<Issue> {
    let mut buf = Vec::new();
    match expected_evidence_id(&record.fields) {
        Ok(expected) if expected == record.evidence_id => {}
        Ok(expected) => buf.push(Issue::new(
            "EVIDENCE_DIGEST_MISMATCH",
            "evidenceId",
            format!(
                "evidenceId {:?} != digest of record sans evidenceId {:?}",
                record.evidence_id, expected
            ),
        )),
        Err(e) => buf.push(Issue::new(
            "EVIDENCE_DIGEST_MISMATCH",
            "fields",
            format!("record fields could not be canonicalized: {e}"),
        )),
    }
    collect_issues(buf)
}

/// Validate a full ordered sequence of evidence records, prefixing each
/// issue's path with its index in the chain.
#[must_use]
pub fn validate_evidence_chain(records: &[EvidenceRecord]) -> Vec<Issue> {
    let mut buf = Vec::new();
    for (i, record) in records.iter().enumerate() {
        for issue in validate_evidence_record(record) {
            buf.push(Issue::new(
                issue.code,
                format!("records[{i}].{}", issue.path),
                issue.message,
            ));
        }
    }
    collect_issues(buf)
}

fn expected_evidence_id(fields: &Value) -> Result<String, CanonError> {
    Ok(weftend_canon::Digest::sha256_of_canonical(fields)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matching_digest_has_no_issues() {
        let fields = json!({"kind": "PUBLISH", "subjectId": "block:1"});
        let evidence_id = expected_evidence_id(&fields).unwrap();
        let record = EvidenceRecord {
            evidence_id,
            fields,
        };
        assert!(validate_evidence_record(&record).is_empty());
    }

    #[test]
    fn mismatched_digest_is_flagged() {
        let record = EvidenceRecord {
            evidence_id: "sha256:wrong".into(),
            fields: json!({"kind": "PUBLISH"}),
        };
        let issues = validate_evidence_record(&record);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "EVIDENCE_DIGEST_MISMATCH");
    }

    #[test]
    fn chain_prefixes_path_with_index() {
        let bad = EvidenceRecord {
            evidence_id: "sha256:wrong".into(),
            fields: json!({"k": 1}),
        };
        let good_fields = json!({"k": 2});
        let good = EvidenceRecord {
            evidence_id: expected_evidence_id(&good_fields).unwrap(),
            fields: good_fields,
        };
        let issues = validate_evidence_chain(&[good, bad]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "records[1].evidenceId");
    }
}
