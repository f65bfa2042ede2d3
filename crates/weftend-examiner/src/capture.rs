//! Capture stage: turn a file, directory, or ZIP archive into a bounded,
//! sorted `CaptureTree`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use weftend_canon::Digest;

use crate::limits::Limits;
use crate::reason::{capture as r_capture, zip as r_zip};

/// What kind of input was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// A single regular file.
    File,
    /// A directory, walked recursively.
    Dir,
    /// A ZIP archive, read via its central directory only.
    Zip,
}

/// One entry in a capture tree.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CaptureEntry {
    /// Forward-slash-normalized path, relative to the capture root.
    pub path: String,
    /// Entry size in bytes (compressed size for ZIP entries, since
    /// content is never extracted in v0).
    pub size: u64,
    /// Per-entry digest: `sha256` of streamed content for file/dir
    /// captures, `fnv1a32` identity digest for ZIP captures.
    pub digest: String,
}

/// Running totals over a capture.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CaptureTotals {
    /// Number of entries captured.
    pub file_count: usize,
    /// Sum of `entries[].size`.
    pub total_bytes: u64,
}

/// The bounded, sorted output of the capture stage.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CaptureTree {
    /// What kind of input this capture came from.
    pub kind: InputKind,
    /// The input path, as given (not persisted into any digest).
    pub base_path: String,
    /// Sorted-by-path entries.
    pub entries: Vec<CaptureEntry>,
    /// Digest of the sorted `(path, digest)` listing.
    pub root_digest: String,
    /// Digest of the sorted `(path, size)` listing.
    pub capture_digest: String,
    /// A bounded sample of captured paths, for display only.
    pub paths_sample: Vec<String>,
    /// Running totals.
    pub totals: CaptureTotals,
    /// Reason codes accumulated during capture.
    pub issues: Vec<String>,
    /// Whether enumeration halted early due to a limit.
    pub truncated: bool,
}

const PATHS_SAMPLE_LIMIT: usize = 32;

fn normalize_path(raw: &str) -> String {
    raw.replace('\\', "/")
}

fn is_traversal(path: &str) -> bool {
    path.split('/').any(|seg| seg == "..") || path.starts_with("..")
}

fn root_and_capture_digests(entries: &[CaptureEntry]) -> (String, String) {
    let mut by_path_digest: Vec<(&str, &str)> =
        entries.iter().map(|e| (e.path.as_str(), e.digest.as_str())).collect();
    by_path_digest.sort_unstable();
    let root_digest = Digest::sha256_of_canonical(&by_path_digest)
        .map(|d| d.to_string())
        .unwrap_or_default();

    let mut by_path_size: Vec<(&str, u64)> =
        entries.iter().map(|e| (e.path.as_str(), e.size)).collect();
    by_path_size.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let capture_digest = Digest::sha256_of_canonical(&by_path_size)
        .map(|d| d.to_string())
        .unwrap_or_default();

    (root_digest, capture_digest)
}

fn finish(
    kind: InputKind,
    base_path: &Path,
    mut entries: Vec<CaptureEntry>,
    mut issues: Vec<String>,
    truncated: bool,
) -> CaptureTree {
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    issues.sort();
    issues.dedup();
    let (root_digest, capture_digest) = root_and_capture_digests(&entries);
    let totals = CaptureTotals {
        file_count: entries.len(),
        total_bytes: entries.iter().map(|e| e.size).sum(),
    };
    let paths_sample = entries
        .iter()
        .take(PATHS_SAMPLE_LIMIT)
        .map(|e| e.path.clone())
        .collect();
    CaptureTree {
        kind,
        base_path: base_path.to_string_lossy().into_owned(),
        entries,
        root_digest,
        capture_digest,
        paths_sample,
        totals,
        issues,
        truncated,
    }
}

/// Capture `input` under `limits`, dispatching on whether it is a file,
/// directory, or ZIP archive (detected by the `.zip` extension, not
/// content sniffing, since v0 never opens an archive it wasn't told is
/// one).
#[must_use]
pub fn capture(input: &Path, limits: &Limits) -> CaptureTree {
    debug!(target: "weftend.examiner.capture", input = %input.display(), "capturing input");
    let meta = match fs::symlink_metadata(input) {
        Ok(m) => m,
        Err(_) => {
            return finish(
                InputKind::File,
                input,
                vec![],
                vec![r_capture::INPUT_MISSING.to_string()],
                false,
            )
        }
    };

    if meta.is_dir() {
        capture_dir(input, limits)
    } else if input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    {
        capture_zip(input, limits)
    } else if meta.is_file() {
        capture_file(input, limits)
    } else {
        finish(
            InputKind::File,
            input,
            vec![],
            vec![r_capture::INPUT_INVALID.to_string()],
            false,
        )
    }
}

fn capture_file(input: &Path, limits: &Limits) -> CaptureTree {
    let name = input
        .file_name()
        .map(|n| normalize_path(&n.to_string_lossy()))
        .unwrap_or_default();
    match stream_digest(input, limits.max_file_bytes) {
        Ok((digest, size)) => finish(
            InputKind::File,
            input,
            vec![CaptureEntry { path: name, size, digest: digest.to_string() }],
            vec![],
            false,
        ),
        Err(_) => finish(
            InputKind::File,
            input,
            vec![],
            vec![r_capture::STAT_FAILED.to_string()],
            false,
        ),
    }
}

fn stream_digest(path: &Path, cap: u64) -> std::io::Result<(Digest, u64)> {
    use std::io::Read;
    let mut file = fs::File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    let mut hasher_input = Vec::new();
    let mut total: u64 = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total <= cap {
            hasher_input.extend_from_slice(&buf[..n]);
        }
    }
    Ok((Digest::sha256_bytes(&hasher_input), total))
}

fn capture_dir(input: &Path, limits: &Limits) -> CaptureTree {
    let mut entries = Vec::new();
    let mut issues = Vec::new();
    let mut truncated = false;
    let mut total_bytes: u64 = 0;

    let walker = walkdir::WalkDir::new(input)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => {
                issues.push(r_capture::STAT_FAILED.to_string());
                continue;
            }
        };
        if entry.path() == input {
            continue;
        }
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            issues.push(r_capture::SYMLINK_SKIPPED.to_string());
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let rel = match entry.path().strip_prefix(input) {
            Ok(r) => normalize_path(&r.to_string_lossy()),
            Err(_) => continue,
        };
        if is_traversal(&rel) {
            issues.push(r_capture::PATH_INVALID.to_string());
            continue;
        }
        if rel.len() > limits.max_path_bytes {
            issues.push(r_capture::PATH_TOO_LONG.to_string());
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        if entries.len() + 1 > limits.max_files {
            issues.push(r_capture::LIMIT_FILES.to_string());
            truncated = true;
            break;
        }
        if total_bytes + size > limits.max_total_bytes {
            issues.push(r_capture::LIMIT_BYTES.to_string());
            truncated = true;
            break;
        }

        let digest = match stream_digest(entry.path(), limits.max_file_bytes) {
            Ok((d, _)) => d.to_string(),
            Err(_) => {
                issues.push(r_capture::STAT_FAILED.to_string());
                continue;
            }
        };

        total_bytes += size;
        entries.push(CaptureEntry { path: rel, size, digest });
    }

    if truncated {
        issues.push(r_capture::TRUNCATED.to_string());
    }

    finish(InputKind::Dir, input, entries, issues, truncated)
}

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const CD_FILE_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const EOCD_FIXED_LEN: usize = 22;

fn le_u16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}
fn le_u32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

struct Eocd {
    entry_count: u16,
    cd_size: u32,
    cd_offset: u32,
}

fn find_eocd(bytes: &[u8]) -> Option<Eocd> {
    let window_start = bytes.len().saturating_sub(64 * 1024 + EOCD_FIXED_LEN);
    let window = &bytes[window_start..];
    for i in (0..window.len().saturating_sub(EOCD_FIXED_LEN - 1)).rev() {
        if window[i..i + 4] == EOCD_SIGNATURE {
            let rec = &window[i..];
            if rec.len() < EOCD_FIXED_LEN {
                continue;
            }
            let comment_len = le_u16(rec, 20) as usize;
            if rec.len() == EOCD_FIXED_LEN + comment_len {
                return Some(Eocd {
                    entry_count: le_u16(rec, 10),
                    cd_size: le_u32(rec, 12),
                    cd_offset: le_u32(rec, 16),
                });
            }
        }
    }
    None
}

/// The identity digest for a single ZIP central-directory entry, isolated
/// in one function so the v0 "metadata only, never content" formula can be
/// swapped for a content-addressed digest in a future schema version
/// without touching any other capture code.
#[must_use]
pub fn identity_digest(path: &str, comp_size: u32, uncomp_size: u32) -> Digest {
    let mut buf = Vec::with_capacity(path.len() + 10);
    buf.extend_from_slice(path.as_bytes());
    buf.push(0);
    buf.extend_from_slice(comp_size.to_string().as_bytes());
    buf.push(0);
    buf.extend_from_slice(uncomp_size.to_string().as_bytes());
    Digest::fnv1a32(&String::from_utf8_lossy(&buf))
}

fn capture_zip(input: &Path, limits: &Limits) -> CaptureTree {
    let bytes = match fs::read(input) {
        Ok(b) => b,
        Err(_) => {
            return finish(
                InputKind::Zip,
                input,
                vec![],
                vec![r_capture::STAT_FAILED.to_string()],
                false,
            )
        }
    };

    let eocd = match find_eocd(&bytes) {
        Some(e) => e,
        None => {
            return finish(
                InputKind::Zip,
                input,
                vec![],
                vec![r_zip::EOCD_MISSING.to_string()],
                false,
            )
        }
    };

    if eocd.entry_count == 0 {
        return finish(
            InputKind::Zip,
            input,
            vec![],
            vec![r_zip::CD_EMPTY.to_string()],
            false,
        );
    }

    let cd_start = eocd.cd_offset as usize;
    let cd_end = cd_start.saturating_add(eocd.cd_size as usize);
    if cd_end > bytes.len() || cd_start >= bytes.len() {
        return finish(
            InputKind::Zip,
            input,
            vec![],
            vec![r_zip::CD_CORRUPT.to_string()],
            false,
        );
    }

    let mut entries = Vec::new();
    let mut issues = vec![r_zip::SCAN_PARTIAL.to_string()];
    let mut truncated = false;
    let mut total_bytes: u64 = 0;
    let mut cursor = cd_start;

    for _ in 0..eocd.entry_count {
        if cursor + 46 > bytes.len() || bytes[cursor..cursor + 4] != CD_FILE_HEADER_SIGNATURE {
            issues.push(r_zip::CD_CORRUPT.to_string());
            break;
        }
        let comp_size = le_u32(&bytes, cursor + 20);
        let uncomp_size = le_u32(&bytes, cursor + 24);
        let name_len = le_u16(&bytes, cursor + 28) as usize;
        let extra_len = le_u16(&bytes, cursor + 30) as usize;
        let comment_len = le_u16(&bytes, cursor + 32) as usize;

        let name_start = cursor + 46;
        let name_end = name_start + name_len;
        if name_end > bytes.len() {
            issues.push(r_zip::CD_CORRUPT.to_string());
            break;
        }
        let raw_name = String::from_utf8_lossy(&bytes[name_start..name_end]).into_owned();
        let path = normalize_path(&raw_name);

        cursor = name_end + extra_len + comment_len;

        if path.ends_with('/') {
            continue; // folder entry
        }
        if is_traversal(&path) {
            issues.push(r_zip::PATH_INVALID.to_string());
            continue;
        }
        if path.len() > limits.max_path_bytes {
            issues.push(r_capture::PATH_TOO_LONG.to_string());
            continue;
        }

        if entries.len() + 1 > limits.max_files {
            issues.push(r_capture::LIMIT_FILES.to_string());
            truncated = true;
            break;
        }
        if total_bytes + comp_size as u64 > limits.max_total_bytes {
            issues.push(r_capture::LIMIT_BYTES.to_string());
            truncated = true;
            break;
        }

        total_bytes += comp_size as u64;
        entries.push(CaptureEntry {
            path,
            size: comp_size as u64,
            digest: identity_digest(&raw_name, comp_size, uncomp_size).to_string(),
        });
    }

    if truncated {
        issues.push(r_capture::TRUNCATED.to_string());
    }

    finish(InputKind::Zip, input, entries, issues, truncated)
}
