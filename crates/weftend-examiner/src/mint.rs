//! Mint stage: combine capture, detect, and probe outputs into a graded
//! `weftend.mint/1` package.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use weftend_canon::Digest;

use crate::capture::{CaptureTree, InputKind};
use crate::detect::Observations;
use crate::limits::Limits;
use crate::probe::ExecutionProbes;
use crate::reason::{capture as r_capture, zip as r_zip};

/// Which profile this mint was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Web component content: HTML/JS/CSS artifacts.
    Web,
    /// A game mod artifact.
    Mod,
    /// Anything not otherwise profiled.
    Generic,
}

impl Profile {
    /// The lowercase string form used for policy lookups (`"web"`,
    /// `"mod"`, `"generic"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Web => "web",
            Profile::Mod => "mod",
            Profile::Generic => "generic",
        }
    }
}

/// The `input` summary a mint package carries.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MintInput {
    /// What kind of input was captured.
    pub kind: InputKind,
    /// The capture's root digest.
    pub root_digest: String,
    /// Number of entries captured.
    pub file_count: usize,
    /// Total captured bytes.
    pub total_bytes: u64,
}

/// The `capture` summary a mint package carries.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MintCapture {
    /// The capture's digest over sorted `(path, size)`.
    pub capture_digest: String,
    /// A bounded sample of captured paths.
    pub paths: Vec<String>,
}

/// The overall grade a mint package carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GradeStatus {
    /// No reason codes accumulated.
    Ok,
    /// At least one non-fatal reason code accumulated.
    Warn,
    /// At least one fatal reason code accumulated.
    Deny,
    /// Reserved for decision-stage quarantine; never set by mint itself.
    Quarantine,
}

impl GradeStatus {
    /// The canonical uppercase string form (`"OK"`, `"WARN"`, `"DENY"`,
    /// `"QUARANTINE"`), matching the `rename_all = "UPPERCASE"` wire form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GradeStatus::Ok => "OK",
            GradeStatus::Warn => "WARN",
            GradeStatus::Deny => "DENY",
            GradeStatus::Quarantine => "QUARANTINE",
        }
    }
}

/// The grade a mint package carries, derived from its accumulated reason
/// codes.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Grade {
    /// `OK`/`WARN`/`DENY`/`QUARANTINE`.
    pub status: GradeStatus,
    /// Stable-sorted, deduplicated reason codes behind this grade.
    pub reason_codes: Vec<String>,
    /// Receipt digests this grade is bound to; empty until assembled by C5.
    pub receipts: Vec<String>,
    /// Non-fatal scars (e.g. truncation) that do not themselves deny.
    pub scars: Vec<String>,
}

/// The digest set a mint package carries.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MintDigests {
    /// `sha256(canonical(mint with mint_digest=zero))`.
    pub mint_digest: String,
    /// The capture's root digest, repeated here for convenience.
    pub input_digest: String,
    /// The policy this mint was evaluated against.
    pub policy_digest: String,
}

/// The examiner's canonical deterministic output describing an artifact.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MintPackage {
    /// Schema tag: `"weftend.mint/1"`.
    pub schema: String,
    /// Which profile this mint was produced under.
    pub profile: Profile,
    /// The `input` summary.
    pub input: MintInput,
    /// The `capture` summary.
    pub capture: MintCapture,
    /// Detect-stage observations.
    pub observations: Observations,
    /// Strict-probe outputs.
    pub execution_probes: ExecutionProbes,
    /// The derived grade.
    pub grade: Grade,
    /// The digest set.
    pub digests: MintDigests,
    /// The limits this mint was produced under.
    pub limits: Limits,
}

fn is_fatal(code: &str) -> bool {
    code.starts_with("CAPTURE_INPUT_") || code == r_zip::EOCD_MISSING || code == r_zip::CD_CORRUPT
}

/// Reason codes that accumulate into grading. `strictUnavailableReason`
/// (`PROBE_NOT_APPLICABLE`) is deliberately excluded: a non-HTML artifact
/// having no strict probe to run is an expected, unremarkable outcome for
/// `mod`/`generic` profiles, not a warning-worthy condition.
fn collect_reason_codes(tree: &CaptureTree, observations: &Observations, probes: &ExecutionProbes) -> Vec<String> {
    let mut codes = Vec::new();
    codes.extend(tree.issues.iter().cloned());
    codes.extend(observations.issues.iter().cloned());
    if let Some(p) = &probes.load_only {
        codes.extend(p.reason_codes.iter().cloned());
    }
    if let Some(p) = &probes.interaction_script {
        codes.extend(p.reason_codes.iter().cloned());
    }
    codes.sort();
    codes.dedup();
    codes
}

fn seal_mint_digest(mint: &MintPackage) -> String {
    let Ok(mut value) = serde_json::to_value(mint) else {
        return String::new();
    };
    if let Value::Object(ref mut top) = value {
        if let Some(Value::Object(digests)) = top.get_mut("digests") {
            digests.insert("mint_digest".to_string(), Value::String(weftend_canon::ZERO_SHA256.to_string()));
        }
    }
    let Ok(canonical) = weftend_canon::canonicalize(&value) else {
        return String::new();
    };
    Digest::sha256_bytes(canonical.as_bytes()).to_string()
}

/// Assemble and grade a mint package from one pipeline run's stage outputs.
#[must_use]
pub fn mint(
    profile: Profile,
    tree: &CaptureTree,
    observations: Observations,
    probes: ExecutionProbes,
    limits: Limits,
    policy_digest: &str,
) -> MintPackage {
    let reason_codes = collect_reason_codes(tree, &observations, &probes);
    debug!(target: "weftend.examiner.mint", profile = profile.as_str(), reasons = reason_codes.len(), "grading mint package");

    let status = if reason_codes.iter().any(|c| is_fatal(c)) {
        GradeStatus::Deny
    } else if reason_codes.is_empty() {
        GradeStatus::Ok
    } else {
        GradeStatus::Warn
    };

    let mut scars = Vec::new();
    if tree.truncated {
        scars.push(r_capture::TRUNCATED.to_string());
    }

    let mut mint = MintPackage {
        schema: "weftend.mint/1".to_string(),
        profile,
        input: MintInput {
            kind: tree.kind,
            root_digest: tree.root_digest.clone(),
            file_count: tree.totals.file_count,
            total_bytes: tree.totals.total_bytes,
        },
        capture: MintCapture {
            capture_digest: tree.capture_digest.clone(),
            paths: tree.paths_sample.clone(),
        },
        observations,
        execution_probes: probes,
        grade: Grade { status, reason_codes, receipts: Vec::new(), scars },
        digests: MintDigests {
            mint_digest: String::new(),
            input_digest: tree.root_digest.clone(),
            policy_digest: policy_digest.to_string(),
        },
        limits,
    };
    mint.digests.mint_digest = seal_mint_digest(&mint);
    mint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{capture, CaptureTotals};
    use crate::detect::detect;
    use crate::probe::probe;

    fn empty_tree(issues: Vec<String>, truncated: bool) -> CaptureTree {
        CaptureTree {
            kind: InputKind::Dir,
            base_path: "/tmp".into(),
            entries: vec![],
            root_digest: "sha256:aa".into(),
            capture_digest: "sha256:bb".into(),
            paths_sample: vec![],
            totals: CaptureTotals::default(),
            issues,
            truncated,
        }
    }

    fn empty_observations() -> Observations {
        Observations {
            histogram: Default::default(),
            html_entry: None,
            external_refs: vec![],
            scripts_detected: false,
            wasm_detected: false,
            issues: vec![],
        }
    }

    fn empty_probes() -> ExecutionProbes {
        ExecutionProbes {
            strict_available: false,
            strict_unavailable_reason: Some("PROBE_NOT_APPLICABLE".into()),
            load_only: None,
            interaction_script: None,
        }
    }

    #[test]
    fn clean_run_grades_ok() {
        let tree = empty_tree(vec![], false);
        let m = mint(Profile::Generic, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        assert_eq!(m.grade.status, GradeStatus::Ok);
        assert!(m.grade.reason_codes.is_empty());
        assert!(m.digests.mint_digest.starts_with("sha256:"));
    }

    #[test]
    fn fatal_capture_input_reason_denies() {
        let tree = empty_tree(vec![r_capture::INPUT_MISSING.to_string()], false);
        let m = mint(Profile::Generic, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        assert_eq!(m.grade.status, GradeStatus::Deny);
    }

    #[test]
    fn zip_eocd_missing_always_denies() {
        let tree = empty_tree(vec![r_zip::EOCD_MISSING.to_string()], false);
        let m = mint(Profile::Generic, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        assert_eq!(m.grade.status, GradeStatus::Deny);
    }

    #[test]
    fn truncated_capture_adds_scar_not_denial() {
        let tree = empty_tree(vec![], true);
        let m = mint(Profile::Generic, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        assert_eq!(m.grade.status, GradeStatus::Ok);
        assert!(m.grade.scars.contains(&r_capture::TRUNCATED.to_string()));
    }

    #[test]
    fn strict_unavailable_does_not_warn_on_its_own() {
        let tree = empty_tree(vec![], false);
        let m = mint(Profile::Mod, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        assert_eq!(m.grade.status, GradeStatus::Ok);
    }

    #[test]
    fn mint_digest_is_deterministic() {
        let tree = empty_tree(vec![], false);
        let a = mint(Profile::Web, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        let b = mint(Profile::Web, &tree, empty_observations(), empty_probes(), Limits::default(), "sha256:pp");
        assert_eq!(a.digests.mint_digest, b.digests.mint_digest);
    }

    #[test]
    fn net_attempt_pipeline_grades_warn() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            b"<html><script>fetch(\"https://x/\")</script></html>",
        )
        .unwrap();
        let tree = capture(dir.path(), &Limits::default());
        let obs = detect(&tree, dir.path(), &Limits::default());
        let probes = probe(&obs, dir.path(), None, &Limits::default());
        let m = mint(Profile::Web, &tree, obs, probes, Limits::default(), "sha256:pp");
        assert_eq!(m.grade.status, GradeStatus::Warn);
        assert!(m.grade.reason_codes.contains(&"CAP_DENY_NET".to_string()));
    }
}
