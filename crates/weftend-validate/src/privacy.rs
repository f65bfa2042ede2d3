//! The canonical forbidden-pattern list for path-summary privacy.
//!
//! This module is depended on by both this crate's `PRIVACY_FIELD_FORBIDDEN`
//! binding invariant and `weftend-receipt`'s privacy lint, so the two can
//! never drift out of sync (Open Question 2: "the `PRIVACY_FIELD_FORBIDDEN`
//! set is narrower than the privacy lint; both must be kept in sync, and
//! the lint is the authoritative gate" — resolved here by having both
//! consumers call the same [`scan`] function; the validator only checks
//! whether any match exists, while the lint records every match with its
//! specific category).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::issue::{collect_issues, Issue};

/// One category of forbidden content, matching the closed reason-code
/// vocabulary for the privacy lint plus a general email-address category
/// that the validator invariant additionally forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyCategory {
    /// Windows drive-letter absolute path, e.g. `C:\Users\...`.
    AbsPathWin,
    /// UNC network path, e.g. `\\host\share`.
    AbsPathUnc,
    /// POSIX absolute path, e.g. `/root/...`, `/var/...`, `/etc/...`,
    /// `/opt/...`, `/private/...`, `/Volumes/...`.
    AbsPathPosix,
    /// Windows user-directory hint, e.g. `Users\<name>`.
    UserDirHintWin,
    /// POSIX user-directory hint, e.g. `/home/<name>`.
    UserDirHintPosix,
    /// `cmd.exe`-style environment marker, e.g. `%USERNAME%`.
    EnvMarkerCmd,
    /// PowerShell-style environment marker, e.g. `$env:USERNAME`.
    EnvMarkerPowershell,
    /// POSIX shell-style environment marker, e.g. `$HOME` or `${HOME}`.
    EnvMarkerShell,
    /// A literal `WEFTEND_`-prefixed internal token leaking into output.
    WeftendToken,
    /// An email address.
    EmailAddress,
}

impl PrivacyCategory {
    /// The closed reason-code string this category maps to in the privacy
    /// lint's output. `EmailAddress` has no dedicated code in the
    /// reason-code vocabulary and is folded into `WEFTEND_TOKEN`'s sibling
    /// slot — see `weftend-receipt`'s lint for how this is surfaced.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::AbsPathWin => "ABS_PATH_WIN",
            Self::AbsPathUnc => "ABS_PATH_UNC",
            Self::AbsPathPosix => "ABS_PATH_POSIX",
            Self::UserDirHintWin => "USER_DIR_HINT_WIN",
            Self::UserDirHintPosix => "USER_DIR_HINT_POSIX",
            Self::EnvMarkerCmd => "ENV_MARKER_CMD",
            Self::EnvMarkerPowershell => "ENV_MARKER_POWERSHELL",
            Self::EnvMarkerShell => "ENV_MARKER_SHELL",
            Self::WeftendToken => "WEFTEND_TOKEN",
            Self::EmailAddress => "EMAIL_ADDRESS",
        }
    }
}

/// One forbidden-pattern match found in a scanned string.
#[derive(Debug, Clone)]
pub struct PrivacyMatch {
    /// Which category matched.
    pub category: PrivacyCategory,
    /// The exact matched substring (never written into a receipt raw —
    /// callers hash it before persisting).
    pub sample: String,
}

fn is_user_dir_component(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "users" | "home"
    )
}

/// Scan `text` for every forbidden pattern, in category-declaration order,
/// left to right within each category.
#[must_use]
pub fn scan(text: &str) -> Vec<PrivacyMatch> {
    let mut matches = Vec::new();

    for (i, _) in text.match_indices(":\\") {
        if i >= 1 {
            let start = text[..i].rfind(|c: char| !c.is_ascii_alphanumeric()).map_or(0, |p| p + 1);
            if text[start..i].len() == 1 {
                let end = text[i..]
                    .find(|c: char| c == '"' || c == '\'' || c.is_whitespace())
                    .map_or(text.len(), |p| i + p);
                let sample = text[start..end].to_string();
                matches.push(PrivacyMatch {
                    category: PrivacyCategory::AbsPathWin,
                    sample,
                });
            }
        }
    }

    for (i, _) in text.match_indices("\\\\") {
        let end = text[i..]
            .find(|c: char| c == '"' || c == '\'' || c.is_whitespace())
            .map_or(text.len(), |p| i + p);
        matches.push(PrivacyMatch {
            category: PrivacyCategory::AbsPathUnc,
            sample: text[i..end].to_string(),
        });
    }

    for prefix in ["/home/", "/Users/", "/root/", "/var/", "/etc/", "/opt/", "/private/", "/Volumes/"] {
        for (i, _) in text.match_indices(prefix) {
            let end = text[i..]
                .find(|c: char| c == '"' || c == '\'' || c.is_whitespace())
                .map_or(text.len(), |p| i + p);
            let sample = text[i..end].to_string();
            let category = if prefix == "/home/" || prefix == "/Users/" {
                PrivacyCategory::UserDirHintPosix
            } else {
                PrivacyCategory::AbsPathPosix
            };
            matches.push(PrivacyMatch { category, sample });
        }
    }

    for (i, seg) in text.split('\\').enumerate() {
        if is_user_dir_component(seg) {
            let _ = i;
            matches.push(PrivacyMatch {
                category: PrivacyCategory::UserDirHintWin,
                sample: seg.to_string(),
            });
        }
    }

    for (i, _) in text.match_indices('%') {
        if let Some(rest) = text.get(i + 1..) {
            if let Some(close) = rest.find('%') {
                let name = &rest[..close];
                if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    matches.push(PrivacyMatch {
                        category: PrivacyCategory::EnvMarkerCmd,
                        sample: format!("%{name}%"),
                    });
                }
            }
        }
    }

    for (i, _) in text.match_indices("$env:") {
        let end = text[i + 5..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .map_or(text.len(), |p| i + 5 + p);
        matches.push(PrivacyMatch {
            category: PrivacyCategory::EnvMarkerPowershell,
            sample: text[i..end].to_string(),
        });
    }

    for (i, ch) in text.char_indices() {
        if ch == '$' && !text[i..].starts_with("$env:") {
            let rest = &text[i + 1..];
            if let Some(stripped) = rest.strip_prefix('{') {
                if let Some(close) = stripped.find('}') {
                    matches.push(PrivacyMatch {
                        category: PrivacyCategory::EnvMarkerShell,
                        sample: text[i..i + 2 + close + 1].to_string(),
                    });
                }
            } else {
                let end = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                if end > 0 {
                    matches.push(PrivacyMatch {
                        category: PrivacyCategory::EnvMarkerShell,
                        sample: text[i..i + 1 + end].to_string(),
                    });
                }
            }
        }
    }

    for (i, _) in text.match_indices("WEFTEND_") {
        let end = text[i..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .map_or(text.len(), |p| i + p);
        matches.push(PrivacyMatch {
            category: PrivacyCategory::WeftendToken,
            sample: text[i..end].to_string(),
        });
    }

    for token in text.split_whitespace() {
        let trimmed = token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '@' && c != '.');
        if let Some(at) = trimmed.find('@') {
            let (local, domain) = (&trimmed[..at], &trimmed[at + 1..]);
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') {
                matches.push(PrivacyMatch {
                    category: PrivacyCategory::EmailAddress,
                    sample: trimmed.to_string(),
                });
            }
        }
    }

    matches
}

/// Recursively collect every string leaf in `value` that contains at least
/// one forbidden pattern, producing one `PRIVACY_FIELD_FORBIDDEN` issue per
/// offending leaf (not per match — the narrower validator invariant only
/// needs to know a field is tainted).
#[must_use]
pub fn validate_privacy(value: &Value) -> Vec<Issue> {
    let mut buf = Vec::new();
    walk(value, String::new(), &mut buf);
    collect_issues(buf)
}

fn walk(value: &Value, path: String, buf: &mut Vec<Issue>) {
    match value {
        Value::String(s) => {
            if !scan(s).is_empty() {
                buf.push(Issue::new(
                    "PRIVACY_FIELD_FORBIDDEN",
                    path,
                    "field contains a forbidden path, user-directory hint, environment marker, or email address",
                ));
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, format!("{path}[{i}]"), buf);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                walk(v, child_path, buf);
            }
        }
        _ => {}
    }
}
