//! Decide stage: evaluate a mint package against a policy to produce the
//! final intake decision plus its bounded disclosure and appeal side
//! artifacts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use weftend_canon::{seal, Digest};

use crate::mint::{GradeStatus, MintPackage, Profile};
use crate::policy::{Action, Policy, Severity};
use crate::reason::decide as r_decide;

fn built_in_default_severity(code: &str) -> Severity {
    if code.starts_with("CAPTURE_INPUT_") {
        return Severity::Deny;
    }
    match code {
        "ZIP_EOCD_MISSING" | "ZIP_CD_CORRUPT" => Severity::Deny,
        "EVIDENCE_DIGEST_MISMATCH" | "RELEASE_SIGNATURE_BAD" | "HISTORY_LINK_MISMATCH" => Severity::Quarantine,
        "DISCLOSURE_REQUIRED" | "APPEAL_OVERSIZE" => Severity::Deny,
        "STRICT_COMPARTMENT_UNAVAILABLE" => Severity::Warn,
        other if other.starts_with("CAP_DENY_") => Severity::Warn,
        _ => Severity::Info,
    }
}

/// Resolve one reason code's severity: an exact-match policy override,
/// else the built-in default table, with `CAP_DENY_NET` additionally
/// escalated to `DENY` when `policy.capsPolicy.denyNetForProfiles` names
/// this mint's profile (the policy-data generalization of the spec's
/// built-in "`CAP_DENY_NET` -> WARN, DENY when profile=mod" rule).
fn severity_for(code: &str, profile: &str, policy: &Policy) -> Severity {
    if let Some(sev) = policy.reason_severity.get(code) {
        return *sev;
    }
    let mut severity = built_in_default_severity(code);
    if code == "CAP_DENY_NET" && policy.caps_policy.deny_net_for_profiles.iter().any(|p| p == profile) {
        severity = Severity::Deny;
    }
    severity
}

fn severity_to_grade(severity: Severity) -> GradeStatus {
    match severity {
        Severity::Info => GradeStatus::Ok,
        Severity::Warn => GradeStatus::Warn,
        Severity::Deny => GradeStatus::Deny,
        Severity::Quarantine => GradeStatus::Quarantine,
    }
}

fn cap_kind(cap_id: &str) -> String {
    cap_id.split(['.', ':']).next().unwrap_or("other").to_string()
}

/// Attempted/denied totals for one capability kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CapKindSummary {
    /// Attempts of any capability under this kind.
    pub attempted: u32,
    /// Denials of any capability under this kind.
    pub denied: u32,
}

/// The capability summary a decision carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CapSummary {
    /// Per-kind totals, bounded to `policy.bounds.maxCapsItems` kinds.
    pub by_kind: BTreeMap<String, CapKindSummary>,
    /// Whether kinds beyond the bound were absorbed rather than listed.
    pub truncated: bool,
    /// Attempts absorbed by truncation.
    pub absorbed_attempted: u32,
    /// Denials absorbed by truncation.
    pub absorbed_denied: u32,
    /// External references matching a policy-notable domain substring.
    pub notable_domains: Vec<String>,
}

fn build_cap_summary(mint: &MintPackage, policy: &Policy) -> CapSummary {
    let mut totals: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for probe in [&mint.execution_probes.load_only, &mint.execution_probes.interaction_script].into_iter().flatten() {
        for (cap_id, n) in &probe.attempted_caps {
            totals.entry(cap_kind(cap_id)).or_insert((0, 0)).0 += n;
        }
        for (cap_id, n) in &probe.denied_caps {
            totals.entry(cap_kind(cap_id)).or_insert((0, 0)).1 += n;
        }
    }

    let mut by_kind = BTreeMap::new();
    let mut truncated = false;
    let mut absorbed_attempted = 0;
    let mut absorbed_denied = 0;
    for (i, (kind, (attempted, denied))) in totals.into_iter().enumerate() {
        if i < policy.bounds.max_caps_items {
            by_kind.insert(kind, CapKindSummary { attempted, denied });
        } else {
            truncated = true;
            absorbed_attempted += attempted;
            absorbed_denied += denied;
        }
    }

    let mut notable_domains: Vec<String> = mint
        .observations
        .external_refs
        .iter()
        .filter(|r| policy.caps_policy.notable_domains.iter().any(|d| r.contains(d.as_str())))
        .cloned()
        .collect();
    notable_domains.sort();
    notable_domains.dedup();

    CapSummary { by_kind, truncated, absorbed_attempted, absorbed_denied, notable_domains }
}

fn severity_requires_disclosure(severity: Severity, policy: &Policy) -> bool {
    match severity {
        Severity::Warn => policy.disclosure.require_on_warn,
        Severity::Deny | Severity::Quarantine => policy.disclosure.require_on_deny,
        Severity::Info => false,
    }
}

/// Build the bounded ASCII disclosure text, returning `(text,
/// extra_reasons, possibly-overridden action)`.
fn build_disclosure(
    severity: Severity,
    action: Action,
    grade: GradeStatus,
    top_reasons: &[String],
    cap_summary: &CapSummary,
    policy: &Policy,
) -> (String, Vec<String>, Action) {
    if !severity_requires_disclosure(severity, policy) {
        return ("DISCLOSURE_NOT_REQUIRED".to_string(), Vec::new(), action);
    }
    if policy.bounds.max_disclosure_chars == 0 || policy.disclosure.max_lines == 0 {
        return (String::new(), vec![r_decide::DISCLOSURE_REQUIRED.to_string()], Action::Reject);
    }

    let mut lines = vec![
        format!("Action: {}", action.as_str()),
        format!("Top reasons: {}", if top_reasons.is_empty() { "none".to_string() } else { top_reasons.join(", ") }),
        format!("Grade: {}", grade.as_str()),
    ];
    let attempted_total: u32 =
        cap_summary.by_kind.values().map(|v| v.attempted).sum::<u32>() + cap_summary.absorbed_attempted;
    let denied_total: u32 =
        cap_summary.by_kind.values().map(|v| v.denied).sum::<u32>() + cap_summary.absorbed_denied;
    lines.push(format!("Caps attempted/denied: {attempted_total}/{denied_total}"));
    if !cap_summary.by_kind.is_empty() {
        let by_kind: Vec<String> =
            cap_summary.by_kind.iter().map(|(k, v)| format!("{k}={}/{}", v.attempted, v.denied)).collect();
        lines.push(format!("Caps by kind: {}", by_kind.join(", ")));
    }
    if !cap_summary.notable_domains.is_empty() {
        lines.push(format!("Notable: {}", cap_summary.notable_domains.join(", ")));
    }

    lines.truncate(policy.disclosure.max_lines);
    let mut text = lines.join("\n");
    if text.chars().count() > policy.bounds.max_disclosure_chars {
        text = text.chars().take(policy.bounds.max_disclosure_chars).collect();
    }
    (text, Vec::new(), action)
}

/// The appeal side artifact: either the full receipt-digest bundle or an
/// oversize sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum Appeal {
    /// The full bundle, under `policy.bounds.maxAppealBytes`.
    Bundle {
        /// Receipt digests this decision is bound to.
        receipts: Vec<String>,
    },
    /// The bundle exceeded its byte bound and was replaced.
    Oversize {
        /// Always `"OVERSIZE"`.
        status: String,
        /// The bundle's would-be size in bytes.
        bytes: usize,
    },
}

fn build_appeal(mint: &MintPackage, policy: &Policy) -> (Appeal, Vec<String>) {
    let bundle = Appeal::Bundle { receipts: mint.grade.receipts.clone() };
    let bytes = weftend_canon::canonicalize(&bundle).map(|s| s.len()).unwrap_or(usize::MAX);
    if bytes > policy.bounds.max_appeal_bytes {
        (Appeal::Oversize { status: "OVERSIZE".to_string(), bytes }, vec![r_decide::APPEAL_OVERSIZE.to_string()])
    } else {
        (bundle, Vec::new())
    }
}

/// The final, policy-evaluated intake decision.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IntakeDecision {
    /// The profile this decision was evaluated under.
    pub profile: Profile,
    /// `sha256(canonical(policy))`.
    pub policy_id: String,
    /// `input.rootDigest`.
    pub artifact_id: String,
    /// `mintDigest`.
    pub mint_id: String,
    /// The overall grade.
    pub grade: GradeStatus,
    /// The action this grade maps to.
    pub action: Action,
    /// Bounded, stable-sorted top reason codes.
    pub top_reason_codes: Vec<String>,
    /// The capability summary.
    pub cap_summary: CapSummary,
    /// Digest of the disclosure text.
    pub disclosure_digest: String,
    /// Digest of the appeal bundle.
    pub appeal_digest: String,
    /// Self-digest sealing this decision sans this field.
    pub decision_digest: String,
}

/// Evaluate `mint` against `policy`, returning the decision plus its
/// disclosure text and appeal bundle.
///
/// Implements the fixed-point evaluator from the decide stage: disclosure
/// and appeal generation can each add a reason code (`DISCLOSURE_REQUIRED`,
/// `APPEAL_OVERSIZE`), which can raise the computed severity, which can in
/// turn change whether disclosure is required — so severity, disclosure,
/// and appeal are recomputed until the reason set stops growing. This
/// always terminates because only those two reasons can ever be added.
#[must_use]
pub fn decide(mint: &MintPackage, policy: &Policy) -> (IntakeDecision, String, Appeal) {
    let profile_str = mint.profile.as_str();
    debug!(target: "weftend.examiner.decide", profile = profile_str, mint_id = %mint.digests.mint_digest, "deciding intake");
    let mut reasons = mint.grade.reason_codes.clone();
    reasons.sort();
    reasons.dedup();

    loop {
        let severity = reasons.iter().map(|c| severity_for(c, profile_str, policy)).max().unwrap_or(Severity::Info);
        let action = policy.action_for(severity);
        let grade = severity_to_grade(severity);

        let mut top_reasons = reasons.clone();
        top_reasons.truncate(policy.bounds.max_reason_codes);

        let cap_summary = build_cap_summary(mint, policy);
        let (disclosure_text, disclosure_reasons, action) =
            build_disclosure(severity, action, grade, &top_reasons, &cap_summary, policy);
        let (appeal, appeal_reasons) = build_appeal(mint, policy);

        let mut next_reasons = reasons.clone();
        for r in disclosure_reasons.iter().chain(appeal_reasons.iter()) {
            if !next_reasons.iter().any(|existing| existing == r) {
                next_reasons.push(r.clone());
            }
        }
        next_reasons.sort();
        next_reasons.dedup();

        if next_reasons == reasons {
            let disclosure_digest = Digest::sha256_bytes(disclosure_text.as_bytes()).to_string();
            let appeal_canonical = weftend_canon::canonicalize(&appeal).unwrap_or_default();
            let appeal_digest = Digest::sha256_bytes(appeal_canonical.as_bytes()).to_string();

            let mut decision = IntakeDecision {
                profile: mint.profile,
                policy_id: policy.policy_id(),
                artifact_id: mint.input.root_digest.clone(),
                mint_id: mint.digests.mint_digest.clone(),
                grade,
                action,
                top_reason_codes: top_reasons,
                cap_summary,
                disclosure_digest,
                appeal_digest,
                decision_digest: String::new(),
            };
            if let Ok(digest) = seal(&decision, "decision_digest") {
                decision.decision_digest = digest.to_string();
            }
            return (decision, disclosure_text, appeal);
        }

        reasons = next_reasons;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureTotals, InputKind};
    use crate::detect::Observations;
    use crate::limits::Limits;
    use crate::mint::{MintCapture, MintDigests, MintInput};
    use crate::probe::ExecutionProbes;
    use std::collections::BTreeMap as Map;

    fn mint_with(profile: Profile, reason_codes: Vec<String>, external_refs: Vec<String>) -> MintPackage {
        MintPackage {
            schema: "weftend.mint/1".into(),
            profile,
            input: MintInput { kind: InputKind::Dir, root_digest: "sha256:root".into(), file_count: 1, total_bytes: 1 },
            capture: MintCapture { capture_digest: "sha256:cap".into(), paths: vec![] },
            observations: Observations {
                histogram: Map::new(),
                html_entry: None,
                external_refs,
                scripts_detected: false,
                wasm_detected: false,
                issues: vec![],
            },
            execution_probes: ExecutionProbes {
                strict_available: false,
                strict_unavailable_reason: None,
                load_only: None,
                interaction_script: None,
            },
            grade: crate::mint::Grade {
                status: crate::mint::GradeStatus::Ok,
                reason_codes: reason_codes.clone(),
                receipts: vec!["sha256:receipt1".into()],
                scars: vec![],
            },
            digests: MintDigests {
                mint_digest: "sha256:mint".into(),
                input_digest: "sha256:root".into(),
                policy_digest: "sha256:policy".into(),
            },
            limits: Limits::default(),
        }
    }

    #[test]
    fn clean_mint_approves_with_no_disclosure() {
        let m = mint_with(Profile::Web, vec![], vec![]);
        let policy = Policy::web_component_default();
        let (decision, disclosure, _appeal) = decide(&m, &policy);
        assert_eq!(decision.grade, GradeStatus::Ok);
        assert_eq!(decision.action, Action::Approve);
        assert_eq!(disclosure, "DISCLOSURE_NOT_REQUIRED");
        assert!(decision.top_reason_codes.is_empty());
    }

    #[test]
    fn net_deny_web_profile_warns_and_queues() {
        let m = mint_with(Profile::Web, vec!["CAP_DENY_NET".to_string()], vec![]);
        let policy = Policy::web_component_default();
        let (decision, disclosure, _appeal) = decide(&m, &policy);
        assert_eq!(decision.grade, GradeStatus::Warn);
        assert_eq!(decision.action, Action::Queue);
        assert!(decision.top_reason_codes.contains(&"CAP_DENY_NET".to_string()));
        assert!(disclosure.contains("CAP_DENY_NET"));
    }

    #[test]
    fn net_deny_mod_profile_denies_and_rejects() {
        let m = mint_with(Profile::Mod, vec!["CAP_DENY_NET".to_string()], vec![]);
        let policy = Policy::mod_default();
        let (decision, _disclosure, _appeal) = decide(&m, &policy);
        assert_eq!(decision.grade, GradeStatus::Deny);
        assert_eq!(decision.action, Action::Reject);
    }

    #[test]
    fn zip_eocd_missing_always_denies_and_rejects() {
        let m = mint_with(Profile::Generic, vec!["ZIP_EOCD_MISSING".to_string()], vec![]);
        let policy = Policy::web_component_default();
        let (decision, _disclosure, _appeal) = decide(&m, &policy);
        assert_eq!(decision.grade, GradeStatus::Deny);
        assert_eq!(decision.action, Action::Reject);
    }

    #[test]
    fn oversize_appeal_adds_reason_and_denies() {
        let mut m = mint_with(Profile::Web, vec![], vec![]);
        m.grade.receipts = (0..10_000).map(|i| format!("sha256:{i:064}")).collect();
        let mut policy = Policy::web_component_default();
        policy.bounds.max_appeal_bytes = 10;
        let (decision, _disclosure, appeal) = decide(&m, &policy);
        assert!(decision.top_reason_codes.contains(&"APPEAL_OVERSIZE".to_string()));
        assert!(matches!(appeal, Appeal::Oversize { .. }));
        assert_eq!(decision.grade, GradeStatus::Deny);
    }

    #[test]
    fn unproducible_required_disclosure_forces_reject() {
        let m = mint_with(Profile::Web, vec!["CAP_DENY_NET".to_string()], vec![]);
        let mut policy = Policy::web_component_default();
        policy.bounds.max_disclosure_chars = 0;
        let (decision, _disclosure, _appeal) = decide(&m, &policy);
        assert!(decision.top_reason_codes.contains(&"DISCLOSURE_REQUIRED".to_string()));
        assert_eq!(decision.action, Action::Reject);
    }

    #[test]
    fn decision_digest_is_deterministic() {
        let m = mint_with(Profile::Web, vec![], vec![]);
        let policy = Policy::web_component_default();
        let (a, _, _) = decide(&m, &policy);
        let (b, _, _) = decide(&m, &policy);
        assert_eq!(a.decision_digest, b.decision_digest);
    }

    #[test]
    fn notable_domains_are_surfaced() {
        let m = mint_with(Profile::Web, vec![], vec!["https://tracker.example/x".to_string()]);
        let mut policy = Policy::web_component_default();
        policy.caps_policy.notable_domains = vec!["tracker.example".to_string()];
        let (decision, _disclosure, _appeal) = decide(&m, &policy);
        assert_eq!(decision.cap_summary.notable_domains, vec!["https://tracker.example/x".to_string()]);
    }
}
