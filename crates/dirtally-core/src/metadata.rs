//! Run metadata attached to snapshots for diagnostics.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Process memory counters sampled during a run.
///
/// Zero means the counter could not be read for this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Resident set size in bytes at the last sample.
    pub resident_bytes: u64,
    /// Largest resident set size seen across samples.
    pub peak_resident_bytes: u64,
}

impl MemoryStats {
    /// Sample the resident memory of the current process.
    pub fn sample() -> Self {
        let resident = current_resident_bytes().unwrap_or(0);
        Self {
            resident_bytes: resident,
            peak_resident_bytes: resident,
        }
    }

    /// Fold a newer sample in, keeping the highest peak.
    pub fn merge(self, later: Self) -> Self {
        Self {
            resident_bytes: later.resident_bytes,
            peak_resident_bytes: self.peak_resident_bytes.max(later.peak_resident_bytes),
        }
    }
}

fn current_resident_bytes() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing().with_memory(),
    );
    system.process(pid).map(|process| process.memory())
}

/// Timing and counters for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the scan started.
    pub started_at: DateTime<Local>,
    /// When the scan finished.
    pub ended_at: DateTime<Local>,
    /// Directories enumerated, including the root.
    pub dirs_scanned: u64,
    /// Non-directory entries enumerated.
    pub files_scanned: u64,
    /// Memory counters at completion.
    pub memory: MemoryStats,
}

impl RunMetadata {
    /// Start a run now.
    pub fn start() -> Self {
        let now = Local::now();
        Self {
            started_at: now,
            ended_at: now,
            dirs_scanned: 0,
            files_scanned: 0,
            memory: MemoryStats::sample(),
        }
    }

    /// Stamp the end time, record counters and sample memory.
    pub fn finish(mut self, dirs_scanned: u64, files_scanned: u64) -> Self {
        self.ended_at = Local::now();
        self.dirs_scanned = dirs_scanned;
        self.files_scanned = files_scanned;
        self.memory = self.memory.merge(MemoryStats::sample());
        self
    }

    /// Wall-clock duration of the run.
    pub fn runtime(&self) -> Duration {
        (self.ended_at - self.started_at).to_std().unwrap_or_default()
    }

    /// Human readable runtime, e.g. `1.5s` or `250.3ms`.
    pub fn runtime_display(&self) -> String {
        format!("{:?}", self.runtime())
    }
}
