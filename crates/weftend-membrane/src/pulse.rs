//! Pulse emission: deterministic, per-subject monotonically ordered
//! records of everything the membrane observes during a run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use weftend_canon::{seal, Digest};

/// What a pulse describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PulseKind {
    /// A release was published.
    Publish,
    /// A block/page was loaded.
    Load,
    /// A capability was requested.
    CapRequest,
    /// A capability request was denied.
    CapDeny,
    /// A capability request was allowed.
    CapAllow,
    /// The worker exited.
    Exit,
}

/// What kind of thing a pulse's subject is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    /// A release manifest.
    Release,
    /// A block/page within a release.
    Block,
}

/// The subject a pulse is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Kind of subject.
    pub kind: SubjectKind,
    /// Subject id.
    pub id: String,
}

/// The digest set every pulse carries, where known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseDigests {
    /// The release this pulse's subject belongs to, if known.
    pub release_id: Option<String>,
    /// The path digest in effect, if known.
    pub path_digest: Option<String>,
    /// The plan hash in effect, if known.
    pub plan_hash: Option<String>,
}

/// Running counts a pulse reports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PulseCounts {
    /// Capabilities requested by this pulse.
    pub caps_requested: u32,
    /// Capabilities denied by this pulse.
    pub caps_denied: u32,
}

/// One emitted pulse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse {
    /// Schema tag.
    pub schema: String,
    /// Schema version.
    pub v: u32,
    /// Monotonic sequence number per `(subject.kind, subject.id)`.
    pub pulse_seq: u64,
    /// What this pulse describes.
    pub kind: PulseKind,
    /// What this pulse is about.
    pub subject: Subject,
    /// The capability id, for `CapRequest`/`CapDeny`/`CapAllow` pulses.
    pub cap_id: Option<String>,
    /// Sorted, deduplicated reason codes.
    pub reason_codes: Vec<String>,
    /// Digest set in effect when this pulse was emitted.
    pub digests: PulseDigests,
    /// Running counts.
    pub counts: PulseCounts,
    /// Self-digest sealing this pulse sans the digest field itself.
    pub pulse_digest: String,
}

/// Assigns monotonic `pulseSeq` values per subject and seals each emitted
/// pulse's digest.
#[derive(Debug, Default)]
pub struct PulseEmitter {
    next_seq: HashMap<Subject, u64>,
    emitted: Vec<Pulse>,
}

impl PulseEmitter {
    /// Construct an empty emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one pulse, assigning its `pulseSeq` and `pulseDigest`.
    pub fn emit(
        &mut self,
        kind: PulseKind,
        subject: Subject,
        cap_id: Option<String>,
        mut reason_codes: Vec<String>,
        digests: PulseDigests,
        counts: PulseCounts,
    ) -> &Pulse {
        reason_codes.sort();
        reason_codes.dedup();

        let seq = self.next_seq.entry(subject.clone()).or_insert(0);
        *seq += 1;
        let pulse_seq = *seq;

        let mut pulse = Pulse {
            schema: "weftend.pulse/0".to_string(),
            v: 0,
            pulse_seq,
            kind,
            subject,
            cap_id,
            reason_codes,
            digests,
            counts,
            pulse_digest: Digest::sha256_bytes(b"").to_string(),
        };
        if let Ok(digest) = seal(&pulse, "pulse_digest") {
            pulse.pulse_digest = digest.to_string();
        }
        self.emitted.push(pulse);
        self.emitted.last().expect("just pushed")
    }

    /// All pulses emitted so far, in emission order.
    #[must_use]
    pub fn pulses(&self) -> &[Pulse] {
        &self.emitted
    }
}
