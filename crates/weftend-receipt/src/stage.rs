//! Staged atomic finalize: every output file is written to `<path>.stage`
//! then atomically renamed to `<path>`. Receipts never overwrite in place.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use weftend_error::{ErrorCode, WeftError};

const STAGE_SUFFIX: &str = ".stage";

fn stage_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(STAGE_SUFFIX);
    PathBuf::from(s)
}

/// Write `bytes` to `path`'s staging file.
///
/// # Errors
///
/// Returns [`ErrorCode::FinalizeIoFailed`] if the staging write fails.
pub fn write_staged(path: &Path, bytes: &[u8]) -> Result<(), WeftError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| WeftError::new(ErrorCode::FinalizeIoFailed, "failed to create output directory").with_source(e))?;
    }
    fs::write(stage_path(path), bytes)
        .map_err(|e| WeftError::new(ErrorCode::FinalizeIoFailed, "failed to write staged output").with_source(e))
}

/// Atomically rename `path`'s staging file into place.
///
/// # Errors
///
/// Returns [`ErrorCode::FinalizeIoFailed`] if the rename fails.
pub fn finalize(path: &Path) -> Result<(), WeftError> {
    fs::rename(stage_path(path), path)
        .map_err(|e| WeftError::new(ErrorCode::FinalizeIoFailed, "failed to finalize staged output").with_source(e))
}

/// Write `bytes` to `path` via stage-then-rename in one call.
///
/// # Errors
///
/// Returns [`ErrorCode::FinalizeIoFailed`] if either step fails.
pub fn write_finalized(path: &Path, bytes: &[u8]) -> Result<(), WeftError> {
    write_staged(path, bytes)?;
    finalize(path)
}

/// Recursively collect every `.stage` file under `root` that has no
/// corresponding finalized sibling — the signature of a run that died
/// between `write_staged` and `finalize`.
#[must_use]
pub fn find_orphans(root: &Path) -> Vec<PathBuf> {
    let mut orphans = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("stage") {
            continue;
        }
        let Some(finalized) = path.to_str().and_then(|s| s.strip_suffix(STAGE_SUFFIX)) else {
            continue;
        };
        if !Path::new(finalized).exists() {
            orphans.push(path.to_path_buf());
        }
    }
    orphans.sort();
    orphans
}

/// Fail closed if any orphaned `.stage` file exists under `root`.
///
/// # Errors
///
/// Returns [`ErrorCode::OrphanStageFile`] (`VERIFY360_ORPHAN_OUTPUT`) naming
/// every orphan found in its context.
pub fn check_no_orphans(root: &Path) -> Result<(), WeftError> {
    let orphans = find_orphans(root);
    if orphans.is_empty() {
        return Ok(());
    }
    let paths: Vec<String> = orphans.iter().map(|p| p.display().to_string()).collect();
    warn!(target: "weftend.receipt.stage", orphans = paths.len(), "orphaned stage file found");
    Err(WeftError::new(ErrorCode::OrphanStageFile, "orphaned .stage file with no finalized output").with_context("paths", paths))
}
