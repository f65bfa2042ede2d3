//! Bounds every stage of the examiner pipeline enforces.

use serde::{Deserialize, Serialize};

/// Hard limits the capture/detect stages enforce. Exceeding any of these
/// halts enumeration with a `truncated=true` marker rather than failing
/// the run outright.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Limits {
    /// Maximum number of files a capture may contain.
    pub max_files: usize,
    /// Maximum total bytes a capture may contain.
    pub max_total_bytes: u64,
    /// Maximum bytes read from a single file (capture digest, text scan).
    pub max_file_bytes: u64,
    /// Maximum byte length of a single path.
    pub max_path_bytes: usize,
    /// Maximum number of distinct external references kept by detect.
    pub max_external_refs: usize,
    /// Maximum bytes an interaction script source may occupy.
    pub max_script_bytes: usize,
    /// Maximum number of steps an interaction script may execute.
    pub max_script_steps: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_files: 10_000,
            max_total_bytes: 256 * 1024 * 1024,
            max_file_bytes: 8 * 1024 * 1024,
            max_path_bytes: 4096,
            max_external_refs: 256,
            max_script_bytes: 64 * 1024,
            max_script_steps: 500,
        }
    }
}
