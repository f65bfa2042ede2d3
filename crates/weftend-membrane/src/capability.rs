//! The deny-by-default capability kernel: every capability request is
//! denied unless it is granted, clean, and not a replay.

use std::collections::HashSet;

use tracing::trace;
use weftend_canon::canonicalize;

/// Capabilities that always require operator consent through a
/// secret-zone host, regardless of grant state.
pub const SECRET_CAPS: &[&str] = &[
    "id.sign",
    "auth.password.submit",
    "payment.tokenize",
    "storage.writeSecret",
    "ui.input.capture",
    "ui.secret.read",
    "ui.secret.write",
    "storage.secret.write",
    "net.secret.send",
    "clipboard.read",
    "clipboard.write",
    "diag.raw",
];

/// Inputs the kernel needs to decide one capability request.
pub struct CapabilityRequest<'a> {
    /// The capability id being requested, e.g. `"net.fetch"`.
    pub cap_id: &'a str,
    /// The request's arguments, canonicalized for replay detection.
    pub args: &'a serde_json::Value,
    /// Capabilities granted to this session.
    pub granted_caps: &'a HashSet<String>,
    /// Whether the release manifest verified as `OK`.
    pub release_ok: bool,
    /// Whether the mandatory selftest round-trip succeeded.
    pub selftest_passed: bool,
    /// Whether market admission rules allow this capability.
    pub market_allows: bool,
    /// Whether a secret-zone host granted operator consent, if this
    /// request needed it.
    pub secret_consent: Option<bool>,
}

/// Outcome of one capability decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the capability is allowed.
    pub ok: bool,
    /// Reason codes explaining a denial; empty when `ok`.
    pub reason_codes: Vec<String>,
}

fn cap_kind_reason(cap_id: &str) -> &'static str {
    let kind = cap_id.split(['.', ':']).next().unwrap_or("");
    match kind {
        "net" => "CAP_DENY_NET",
        "storage" => "CAP_DENY_STORAGE",
        "cookie" => "CAP_DENY_COOKIE",
        "ui" => "CAP_DENY_UI",
        _ => "CAP_DENY_UI",
    }
}

/// Tracks replay state across a run: every `(capId, canonical(args))` pair
/// that has already been decided.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    seen: HashSet<(String, String)>,
}

impl ReplayGuard {
    /// Construct an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records the pair if this is the first time
    /// `(cap_id, canonical_args)` has been seen; returns `false` (a
    /// replay) otherwise.
    pub fn record_first_use(&mut self, cap_id: &str, canonical_args: &str) -> bool {
        self.seen.insert((cap_id.to_string(), canonical_args.to_string()))
    }
}

/// Decide one capability request, consulting `replay` for the
/// once-per-`(capId, args)` rule.
///
/// Decision rule in strict mode: deny unless `capId` is granted, the
/// release status is `OK`, the selftest passed, market admission allows
/// it, and no replay of the same `(capId, canonical(args))` tuple has
/// occurred. Secret capabilities additionally require explicit consent.
#[must_use]
pub fn decide(request: &CapabilityRequest<'_>, replay: &mut ReplayGuard) -> Decision {
    trace!(target: "weftend.membrane.capability", cap_id = request.cap_id, "deciding capability request");
    let mut reasons = Vec::new();

    if SECRET_CAPS.contains(&request.cap_id) && request.secret_consent != Some(true) {
        reasons.push(cap_kind_reason(request.cap_id).to_string());
        return Decision { ok: false, reason_codes: reasons };
    }

    let canonical_args = canonicalize(request.args).unwrap_or_else(|_| "null".to_string());
    let first_use = replay.record_first_use(request.cap_id, &canonical_args);

    let granted = request.granted_caps.contains(request.cap_id);
    let allow = granted
        && request.release_ok
        && request.selftest_passed
        && request.market_allows
        && first_use;

    if allow {
        Decision { ok: true, reason_codes: Vec::new() }
    } else {
        reasons.push(cap_kind_reason(request.cap_id).to_string());
        reasons.sort();
        reasons.dedup();
        Decision { ok: false, reason_codes: reasons }
    }
}
