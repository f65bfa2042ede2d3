//! Detect stage: file-kind histogram, HTML entry selection, and bounded
//! external-reference scanning.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::{CaptureTree, InputKind};
use crate::limits::Limits;
use crate::reason::{detect as r_detect, zip as r_zip};

/// File-kind histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// `.html`/`.htm`
    Html,
    /// `.js`/`.mjs`/`.cjs`
    Js,
    /// `.css`
    Css,
    /// `.json`
    Json,
    /// `.wasm`
    Wasm,
    /// Media extensions (png/jpg/gif/svg/mp3/mp4/webp/etc).
    Media,
    /// Any other recognized-as-binary extension.
    Binary,
    /// Anything not otherwise classified.
    Other,
}

fn classify(path: &str) -> FileKind {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => FileKind::Html,
        "js" | "mjs" | "cjs" => FileKind::Js,
        "css" => FileKind::Css,
        "json" => FileKind::Json,
        "wasm" => FileKind::Wasm,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "mp3" | "mp4" | "ogg" | "wav" => {
            FileKind::Media
        }
        "exe" | "dll" | "so" | "dylib" | "bin" => FileKind::Binary,
        _ => FileKind::Other,
    }
}

/// The bounded set of observations detect produces over a capture.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Observations {
    /// Counts of each file kind present.
    pub histogram: BTreeMap<FileKind, usize>,
    /// The chosen entry HTML path, if any.
    pub html_entry: Option<String>,
    /// Sorted, deduplicated external `http(s)`/`ws(s)` references.
    pub external_refs: Vec<String>,
    /// Whether the histogram contains any JS entries.
    pub scripts_detected: bool,
    /// Whether the histogram contains any WASM entries.
    pub wasm_detected: bool,
    /// Reason codes accumulated during detection.
    pub issues: Vec<String>,
}

fn is_text_candidate(kind: FileKind) -> bool {
    matches!(kind, FileKind::Html | FileKind::Js | FileKind::Css | FileKind::Json)
}

fn scan_external_refs(text: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for scheme in ["https://", "http://", "wss://", "ws://"] {
        let mut start = 0;
        while let Some(rel) = text[start..].find(scheme) {
            let abs = start + rel;
            let word_boundary_ok = abs == 0
                || !text.as_bytes()[abs - 1].is_ascii_alphanumeric();
            let tail = &text[abs..];
            let end = tail
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '<' || c == '>')
                .unwrap_or(tail.len());
            if word_boundary_ok && end > scheme.len() {
                refs.push(tail[..end].to_string());
            }
            start = abs + scheme.len();
        }
    }
    refs
}

/// Run the detect stage over `tree`, reading entry bytes relative to
/// `base_dir` (the resolved filesystem root the capture was taken from).
/// ZIP captures never have their content scanned (`ZIP_SCAN_PARTIAL` is
/// already present on the capture tree's issues); `base_dir` is ignored in
/// that case.
#[must_use]
pub fn detect(tree: &CaptureTree, base_dir: &Path, limits: &Limits) -> Observations {
    debug!(target: "weftend.examiner.detect", entries = tree.entries.len(), "classifying capture tree");
    let mut histogram: BTreeMap<FileKind, usize> = BTreeMap::new();
    let mut html_candidates = Vec::new();
    let mut issues = Vec::new();

    for entry in &tree.entries {
        let kind = classify(&entry.path);
        *histogram.entry(kind).or_insert(0) += 1;
        if kind == FileKind::Html {
            html_candidates.push(entry.path.clone());
        }
    }
    html_candidates.sort();
    let html_entry = html_candidates.into_iter().find(|p| {
        Path::new(p)
            .file_name()
            .is_some_and(|n| n.eq_ignore_ascii_case("index.html"))
    }).or_else(|| {
        tree.entries
            .iter()
            .filter(|e| classify(&e.path) == FileKind::Html)
            .map(|e| e.path.clone())
            .min()
    });

    let mut external_refs = Vec::new();
    if tree.kind == InputKind::Zip {
        issues.push(r_zip::SCAN_PARTIAL.to_string());
    } else {
        'outer: for entry in &tree.entries {
            let kind = classify(&entry.path);
            if !is_text_candidate(kind) {
                continue;
            }
            let full = base_dir.join(&entry.path);
            let Ok(bytes) = fs::read(&full) else { continue };
            let take = (limits.max_file_bytes as usize).min(bytes.len());
            let Ok(text) = std::str::from_utf8(&bytes[..take]) else { continue };
            for r in scan_external_refs(text) {
                if external_refs.len() >= limits.max_external_refs {
                    issues.push(r_detect::EXTERNAL_REFS_TRUNCATED.to_string());
                    break 'outer;
                }
                external_refs.push(r);
            }
        }
    }
    external_refs.sort();
    external_refs.dedup();
    if external_refs.len() > limits.max_external_refs {
        external_refs.truncate(limits.max_external_refs);
        if !issues.contains(&r_detect::EXTERNAL_REFS_TRUNCATED.to_string()) {
            issues.push(r_detect::EXTERNAL_REFS_TRUNCATED.to_string());
        }
    }

    let scripts_detected = histogram.contains_key(&FileKind::Js);
    let wasm_detected = histogram.contains_key(&FileKind::Wasm);

    issues.sort();
    issues.dedup();

    Observations {
        histogram,
        html_entry,
        external_refs,
        scripts_detected,
        wasm_detected,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{capture, CaptureEntry, CaptureTotals};

    fn tree_with(entries: Vec<CaptureEntry>) -> CaptureTree {
        CaptureTree {
            kind: InputKind::Dir,
            base_path: "/tmp".into(),
            entries,
            root_digest: String::new(),
            capture_digest: String::new(),
            paths_sample: vec![],
            totals: CaptureTotals::default(),
            issues: vec![],
            truncated: false,
        }
    }

    #[test]
    fn classifies_extensions() {
        assert_eq!(classify("a.HTML"), FileKind::Html);
        assert_eq!(classify("a.js"), FileKind::Js);
        assert_eq!(classify("a.wasm"), FileKind::Wasm);
        assert_eq!(classify("a.unknown"), FileKind::Other);
    }

    #[test]
    fn prefers_index_html() {
        let tree = tree_with(vec![
            CaptureEntry { path: "b.html".into(), size: 1, digest: "x".into() },
            CaptureEntry { path: "index.html".into(), size: 1, digest: "y".into() },
        ]);
        let dir = tempfile::tempdir().unwrap();
        let obs = detect(&tree, dir.path(), &Limits::default());
        assert_eq!(obs.html_entry, Some("index.html".into()));
    }

    #[test]
    fn scans_external_refs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.js"),
            b"fetch('https://example.com/x'); ws://other.example/y",
        )
        .unwrap();
        let tree = capture(dir.path(), &Limits::default());
        let obs = detect(&tree, dir.path(), &Limits::default());
        assert_eq!(
            obs.external_refs,
            vec!["https://example.com/x", "ws://other.example/y"]
        );
        assert!(obs.scripts_detected);
    }

    #[test]
    fn zip_captures_skip_scanning() {
        let tree = CaptureTree { kind: InputKind::Zip, ..tree_with(vec![]) };
        let dir = tempfile::tempdir().unwrap();
        let obs = detect(&tree, dir.path(), &Limits::default());
        assert!(obs.issues.contains(&r_zip::SCAN_PARTIAL.to_string()));
    }
}
