//! Scan progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Files enumerated between two progress updates.
pub(crate) const PROGRESS_INTERVAL: u64 = 1000;

/// Progress information during a scan.
///
/// Counters are a point-in-time view of a running scan and are only
/// meaningful as an indication of activity.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Non-directory entries enumerated so far.
    pub files_scanned: u64,
    /// Directories enumerated so far.
    pub dirs_scanned: u64,
    /// Bytes folded into the store so far.
    pub bytes_scanned: u64,
    /// Entries skipped because they could not be read.
    pub skipped: u64,
    /// Most recently enumerated path.
    pub current_path: PathBuf,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            skipped: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
