//! Strict probe stage: load-only and interaction-script probes, both
//! routing capability attempts through the strict membrane's deny-by-default
//! kernel.
//!
//! There is no JS engine in this pipeline. Capability-triggering constructs
//! are recognized by static scanning of inline `<script>` source, and every
//! match is submitted to [`weftend_membrane::capability::decide`] as one
//! attempt — with no granted capabilities, since the examiner never grants
//! anything, every attempt is denied and the denial's reason code is what
//! actually matters to a grade.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use weftend_membrane::capability::{decide, CapabilityRequest, ReplayGuard};

use crate::detect::Observations;
use crate::limits::Limits;
use crate::reason::probe as r_probe;
use crate::script;

/// Overall status of one probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeStatus {
    /// No denials or parse failures.
    Ok,
    /// At least one capability was denied or a recoverable issue occurred.
    Warn,
}

/// The outcome of one strict-sandbox probe.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProbeResult {
    /// `OK` if no capability was denied and nothing else went wrong.
    pub status: ProbeStatus,
    /// Stable-sorted, deduplicated reason codes this probe accumulated.
    pub reason_codes: Vec<String>,
    /// Denied-capability counts, keyed by capability id.
    pub denied_caps: BTreeMap<String, u32>,
    /// Attempted-capability counts, keyed by capability id.
    pub attempted_caps: BTreeMap<String, u32>,
}

impl ProbeResult {
    fn empty() -> Self {
        Self {
            status: ProbeStatus::Ok,
            reason_codes: Vec::new(),
            denied_caps: BTreeMap::new(),
            attempted_caps: BTreeMap::new(),
        }
    }
}

/// Both probes the examiner may attempt over one capture, plus whether the
/// strict sandbox was available at all.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecutionProbes {
    /// Whether an HTML entry existed for the strict sandbox to load.
    pub strict_available: bool,
    /// Why the sandbox was unavailable, when it was.
    pub strict_unavailable_reason: Option<String>,
    /// The load-only probe's result, when the sandbox was available.
    pub load_only: Option<ProbeResult>,
    /// The interaction-script probe's result, when a script was supplied
    /// and the sandbox was available.
    pub interaction_script: Option<ProbeResult>,
}

const CAP_TRIGGERS: &[(&str, &str)] = &[
    ("fetch(", "net.fetch"),
    ("XMLHttpRequest", "net.fetch"),
    ("WebSocket(", "net.socket"),
    ("EventSource(", "net.socket"),
    ("localStorage", "storage.write"),
    ("sessionStorage", "storage.write"),
    ("indexedDB", "storage.write"),
    ("document.cookie", "cookie.write"),
    ("navigator.clipboard", "clipboard.read"),
];

fn scan_cap_attempts(text: &str) -> Vec<&'static str> {
    let mut hits = Vec::new();
    for (pattern, cap_id) in CAP_TRIGGERS {
        if text.contains(pattern) {
            hits.push(*cap_id);
        }
    }
    hits
}

fn extract_inline_scripts(html: &str) -> Vec<String> {
    let mut scripts = Vec::new();
    let mut rest = html;
    while let Some(open_rel) = rest.find("<script") {
        let after_open = &rest[open_rel..];
        let Some(tag_end_rel) = after_open.find('>') else {
            break;
        };
        let body_start = &after_open[tag_end_rel + 1..];
        let Some(close_rel) = body_start.find("</script>") else {
            break;
        };
        scripts.push(body_start[..close_rel].to_string());
        rest = &body_start[close_rel + "</script>".len()..];
    }
    scripts
}

fn merge_into(acc: &mut ProbeResult, other: ProbeResult) {
    for (k, v) in other.attempted_caps {
        *acc.attempted_caps.entry(k).or_insert(0) += v;
    }
    for (k, v) in other.denied_caps {
        *acc.denied_caps.entry(k).or_insert(0) += v;
    }
    acc.reason_codes.extend(other.reason_codes);
    acc.reason_codes.sort();
    acc.reason_codes.dedup();
    if !acc.reason_codes.is_empty() {
        acc.status = ProbeStatus::Warn;
    }
}

fn run_caps_against_source(source: &str, replay: &mut ReplayGuard) -> ProbeResult {
    let granted = HashSet::new();
    let mut result = ProbeResult::empty();

    for cap_id in scan_cap_attempts(source) {
        *result.attempted_caps.entry(cap_id.to_string()).or_insert(0) += 1;
        let request = CapabilityRequest {
            cap_id,
            args: &json!({}),
            granted_caps: &granted,
            release_ok: true,
            selftest_passed: true,
            market_allows: true,
            secret_consent: None,
        };
        let decision = decide(&request, replay);
        if !decision.ok {
            *result.denied_caps.entry(cap_id.to_string()).or_insert(0) += 1;
            result.reason_codes.extend(decision.reason_codes);
        }
    }

    result.reason_codes.sort();
    result.reason_codes.dedup();
    result.status = if result.reason_codes.is_empty() { ProbeStatus::Ok } else { ProbeStatus::Warn };
    result
}

fn probe_html_source(html: &str) -> ProbeResult {
    let mut replay = ReplayGuard::new();
    let mut acc = ProbeResult::empty();
    for script_src in extract_inline_scripts(html) {
        merge_into(&mut acc, run_caps_against_source(&script_src, &mut replay));
    }
    acc
}

/// Run the load-only probe: the HTML entry's inline scripts, replayed with
/// an implicit single "load" interaction. Fails with `PROBE_NOT_APPLICABLE`
/// when there is no HTML entry to load.
///
/// # Errors
///
/// Returns [`r_probe::NOT_APPLICABLE`] when `observations` has no HTML
/// entry, or when the entry's bytes could not be read.
pub fn load_only_probe(observations: &Observations, base_dir: &Path) -> Result<ProbeResult, &'static str> {
    let Some(html_path) = &observations.html_entry else {
        return Err(r_probe::NOT_APPLICABLE);
    };
    let full = base_dir.join(html_path);
    let html = fs::read_to_string(&full).map_err(|_| r_probe::NOT_APPLICABLE)?;
    Ok(probe_html_source(&html))
}

/// Run the interaction-script probe: parse `source` in the bounded
/// mini-language, then replay it against the same HTML entry's inline
/// scripts (there is no DOM, so `click`/`key`/`wait` steps do not
/// themselves trigger capabilities in this pipeline — only the bounded
/// step-count check and the HTML entry's static scan do).
///
/// # Errors
///
/// Returns the `SCRIPT_*` reason code on any parse failure.
pub fn interaction_probe(
    source: &str,
    observations: &Observations,
    base_dir: &Path,
    limits: &Limits,
) -> Result<ProbeResult, &'static str> {
    let parsed = script::parse(source, limits.max_script_bytes, limits.max_script_steps)?;
    let unrolled = script::unrolled_step_count(&parsed, limits.max_script_steps);

    let mut acc = match &observations.html_entry {
        Some(html_path) => {
            let full = base_dir.join(html_path);
            fs::read_to_string(&full).map(|html| probe_html_source(&html)).unwrap_or_else(|_| ProbeResult::empty())
        }
        None => ProbeResult::empty(),
    };

    if unrolled > limits.max_script_steps {
        acc.reason_codes.push(r_probe::INTERACTION_STEP_LIMIT.to_string());
        acc.reason_codes.sort();
        acc.reason_codes.dedup();
        acc.status = ProbeStatus::Warn;
    }

    Ok(acc)
}

/// Run both probes over one capture's observations. When no HTML entry
/// exists, the strict sandbox is unavailable and neither probe runs.
#[must_use]
pub fn probe(
    observations: &Observations,
    base_dir: &Path,
    interaction_source: Option<&str>,
    limits: &Limits,
) -> ExecutionProbes {
    debug!(target: "weftend.examiner.probe", has_interaction_source = interaction_source.is_some(), "running strict probes");
    match load_only_probe(observations, base_dir) {
        Ok(load_result) => {
            let interaction_script = interaction_source.map(|src| {
                match interaction_probe(src, observations, base_dir, limits) {
                    Ok(result) => result,
                    Err(code) => ProbeResult {
                        status: ProbeStatus::Warn,
                        reason_codes: vec![code.to_string()],
                        denied_caps: BTreeMap::new(),
                        attempted_caps: BTreeMap::new(),
                    },
                }
            });
            ExecutionProbes {
                strict_available: true,
                strict_unavailable_reason: None,
                load_only: Some(load_result),
                interaction_script,
            }
        }
        Err(reason) => ExecutionProbes {
            strict_available: false,
            strict_unavailable_reason: Some(reason.to_string()),
            load_only: None,
            interaction_script: None,
        },
    }
}
