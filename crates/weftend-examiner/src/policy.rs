//! Policy v1: the externally supplied severity/action/bounds table the
//! decide stage evaluates a mint package against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use weftend_canon::Digest;

/// Severity levels, ordered `INFO < WARN < DENY < QUARANTINE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// No action beyond recording.
    Info,
    /// Queue for review.
    Warn,
    /// Reject outright.
    Deny,
    /// Hold pending operator action.
    Quarantine,
}

impl Severity {
    fn as_key(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Deny => "DENY",
            Severity::Quarantine => "QUARANTINE",
        }
    }
}

/// The action an intake decision carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Admit the artifact.
    Approve,
    /// Queue the artifact for operator review.
    Queue,
    /// Reject the artifact.
    Reject,
    /// Hold the artifact pending operator action.
    Hold,
}

impl Action {
    /// The canonical uppercase string form (`"APPROVE"`, `"QUEUE"`,
    /// `"REJECT"`, `"HOLD"`), matching the `rename_all = "UPPERCASE"` wire
    /// form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Approve => "APPROVE",
            Action::Queue => "QUEUE",
            Action::Reject => "REJECT",
            Action::Hold => "HOLD",
        }
    }
}

impl Severity {
    /// The built-in `severityAction` default: `INFO->APPROVE,
    /// WARN->QUEUE, DENY->REJECT, QUARANTINE->HOLD`.
    #[must_use]
    pub fn default_action(self) -> Action {
        match self {
            Severity::Info => Action::Approve,
            Severity::Warn => Action::Queue,
            Severity::Deny => Action::Reject,
            Severity::Quarantine => Action::Hold,
        }
    }
}

/// Bounded disclosure generation policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DisclosurePolicy {
    /// Whether a `WARN` grade must produce a disclosure.
    pub require_on_warn: bool,
    /// Whether a `DENY` grade must produce a disclosure.
    pub require_on_deny: bool,
    /// Maximum number of lines in a generated disclosure.
    pub max_lines: usize,
}

/// Policy knobs governing the capability summary decide produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CapsPolicy {
    /// Profiles under which `CAP_DENY_NET` escalates from `WARN` to `DENY`.
    pub deny_net_for_profiles: Vec<String>,
    /// Substrings of external references considered notable enough to call
    /// out by name in the capability summary.
    pub notable_domains: Vec<String>,
}

/// Bounds enforced by the decide stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Bounds {
    /// Maximum reason codes carried into `topReasonCodes`.
    pub max_reason_codes: usize,
    /// Maximum distinct capability-kind entries in `capSummary`.
    pub max_caps_items: usize,
    /// Maximum characters in a generated disclosure.
    pub max_disclosure_chars: usize,
    /// Maximum bytes in the appeal bundle before it is replaced with an
    /// oversize sentinel.
    pub max_appeal_bytes: usize,
}

/// Policy v1: `{schema, profile, reasonSeverity, severityAction, capsPolicy,
/// disclosure, bounds}`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Policy {
    /// Schema tag.
    pub schema: String,
    /// The profile this policy applies to.
    pub profile: String,
    /// Per-reason-code severity overrides; exact-match only. Anything not
    /// named here falls back to the built-in default table.
    pub reason_severity: BTreeMap<String, Severity>,
    /// Severity-to-action overrides, keyed by `Severity::as_key()`. Unset
    /// severities fall back to [`Severity::default_action`].
    pub severity_action: BTreeMap<String, Action>,
    /// Capability-summary policy knobs.
    pub caps_policy: CapsPolicy,
    /// Disclosure generation policy.
    pub disclosure: DisclosurePolicy,
    /// Bounds on reason codes, caps items, disclosure size, and appeal size.
    pub bounds: Bounds,
}

impl Policy {
    /// Resolve the action for `severity`, consulting this policy's override
    /// map before falling back to the built-in default.
    #[must_use]
    pub fn action_for(&self, severity: Severity) -> Action {
        self.severity_action.get(severity.as_key()).copied().unwrap_or_else(|| severity.default_action())
    }

    /// `policyId = sha256(canonical(policy))`.
    #[must_use]
    pub fn policy_id(&self) -> String {
        Digest::sha256_of_canonical(self).map(|d| d.to_string()).unwrap_or_default()
    }

    /// The `web_component_default` policy used by the web profile's
    /// end-to-end scenarios: disclosure required on `WARN`, no per-code
    /// overrides, generous bounds.
    #[must_use]
    pub fn web_component_default() -> Self {
        Self {
            schema: "weftend.policy/1".to_string(),
            profile: "web".to_string(),
            reason_severity: BTreeMap::new(),
            severity_action: BTreeMap::new(),
            caps_policy: CapsPolicy::default(),
            disclosure: DisclosurePolicy { require_on_warn: true, require_on_deny: true, max_lines: 16 },
            bounds: Bounds {
                max_reason_codes: 32,
                max_caps_items: 16,
                max_disclosure_chars: 2048,
                max_appeal_bytes: 65536,
            },
        }
    }

    /// The `mod_default` policy: `CAP_DENY_NET` escalates to `DENY`.
    #[must_use]
    pub fn mod_default() -> Self {
        let mut policy = Self::web_component_default();
        policy.profile = "mod".to_string();
        policy.caps_policy.deny_net_for_profiles = vec!["mod".to_string()];
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_id_is_deterministic() {
        let a = Policy::web_component_default();
        let b = Policy::web_component_default();
        assert_eq!(a.policy_id(), b.policy_id());
    }

    #[test]
    fn different_policies_have_different_ids() {
        let web = Policy::web_component_default();
        let modp = Policy::mod_default();
        assert_ne!(web.policy_id(), modp.policy_id());
    }

    #[test]
    fn action_for_falls_back_to_default() {
        let policy = Policy::web_component_default();
        assert_eq!(policy.action_for(Severity::Warn), Action::Queue);
    }

    #[test]
    fn action_for_honors_override() {
        let mut policy = Policy::web_component_default();
        policy.severity_action.insert("WARN".to_string(), Action::Reject);
        assert_eq!(policy.action_for(Severity::Warn), Action::Reject);
    }

    #[test]
    fn severity_ordering_matches_spec() {
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Deny);
        assert!(Severity::Deny < Severity::Quarantine);
    }
}
