//! Privacy lint: walk an output root, scanning only the allowlisted
//! artifact kinds for forbidden path/environment/email leakage, with one
//! narrow, line-scoped exception for a `WEFTEND_` token legitimately
//! carried as a reason code.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use weftend_canon::Digest;
use weftend_validate::{scan, PrivacyCategory};

/// File name allowed to be raw text rather than JSON.
const README_NAME: &str = "README.txt";

/// The `weftendBuild.reasonCodes=WEFTEND_...` exception line, verbatim
/// prefix.
const README_EXEMPT_PREFIX: &str = "weftendBuild.reasonCodes=WEFTEND_";

fn is_allowlisted(path: &Path) -> bool {
    if path.file_name().and_then(|n| n.to_str()) == Some(README_NAME) {
        return true;
    }
    matches!(path.extension().and_then(|e| e.to_str()), Some("json"))
}

fn exempt_json_key(path: &str) -> bool {
    let last = path.rsplit(['.', ']']).find(|s| !s.is_empty() && !s.chars().all(|c| c.is_ascii_digit()));
    matches!(last, Some("reason_codes" | "warnings" | "reasonCodes"))
}

/// One stable-sorted privacy violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PrivacyViolation {
    /// The forbidden-category reason code.
    pub code: String,
    /// Path of the offending file, relative to the output root.
    pub rel_path: String,
    /// `sha256` of the matched substring — never the raw sample itself.
    pub sample_hash: String,
}

/// Overall verdict of a privacy lint pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LintVerdict {
    /// No violation survived the allowlist exceptions.
    Pass,
    /// At least one violation was found; the caller must exit `40`.
    Fail,
}

/// The privacy lint's report, written to `weftend/privacy_lint_v0.json`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PrivacyLintReport {
    /// Schema tag: `"weftend.privacy_lint/0"`.
    pub schema: String,
    /// `PASS` or `FAIL`.
    pub verdict: LintVerdict,
    /// Stable-sorted violations, `(code, relPath, sampleHash)`.
    pub violations: Vec<PrivacyViolation>,
}

/// Relative path the lint report is written to under an output root.
pub const LINT_OUTPUT_PATH: &str = "weftend/privacy_lint_v0.json";

fn hash_sample(sample: &str) -> String {
    Digest::sha256_bytes(sample.as_bytes()).to_string()
}

fn lint_json_value(value: &Value, path: String, rel_path: &str, out: &mut Vec<PrivacyViolation>) {
    match value {
        Value::String(s) => {
            for m in scan(s) {
                if m.category == PrivacyCategory::WeftendToken && exempt_json_key(&path) {
                    continue;
                }
                out.push(PrivacyViolation {
                    code: m.category.reason_code().to_string(),
                    rel_path: rel_path.to_string(),
                    sample_hash: hash_sample(&m.sample),
                });
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                lint_json_value(item, format!("{path}[{i}]"), rel_path, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                lint_json_value(v, child, rel_path, out);
            }
        }
        _ => {}
    }
}

fn lint_readme_text(text: &str, rel_path: &str, out: &mut Vec<PrivacyViolation>) {
    for line in text.lines() {
        if line.trim_start().starts_with(README_EXEMPT_PREFIX) {
            continue;
        }
        for m in scan(line) {
            out.push(PrivacyViolation {
                code: m.category.reason_code().to_string(),
                rel_path: rel_path.to_string(),
                sample_hash: hash_sample(&m.sample),
            });
        }
    }
}

fn lint_file(contents: &str, rel_path: &str, out: &mut Vec<PrivacyViolation>) {
    if rel_path.ends_with(README_NAME) {
        lint_readme_text(contents, rel_path, out);
        return;
    }
    match serde_json::from_str::<Value>(contents) {
        Ok(value) => lint_json_value(&value, String::new(), rel_path, out),
        Err(_) => {
            for m in scan(contents) {
                out.push(PrivacyViolation {
                    code: m.category.reason_code().to_string(),
                    rel_path: rel_path.to_string(),
                    sample_hash: hash_sample(&m.sample),
                });
            }
        }
    }
}

/// Walk `root`, lint every allowlisted file, and return a stable-sorted
/// report. I/O errors reading a candidate file are skipped, not fatal — a
/// file the lint cannot read cannot leak through it either.
#[must_use]
pub fn lint(root: &Path) -> PrivacyLintReport {
    debug!(target: "weftend.receipt.privacy", root = %root.display(), "linting output root");
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_allowlisted(entry.path()) {
            continue;
        }
        let Ok(contents) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_string_lossy().replace('\\', "/");
        lint_file(&contents, &rel_path, &mut violations);
    }

    violations.sort();
    violations.dedup();
    let verdict = if violations.is_empty() { LintVerdict::Pass } else { LintVerdict::Fail };

    PrivacyLintReport { schema: "weftend.privacy_lint/0".to_string(), verdict, violations }
}
