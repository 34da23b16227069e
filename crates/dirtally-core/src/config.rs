//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Number of stat workers (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub concurrency: usize,

    /// Work queue capacity as a multiple of the worker count.
    #[builder(default = "8")]
    #[serde(default = "default_queue_factor")]
    pub queue_factor: usize,
}

fn default_queue_factor() -> usize {
    8
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.queue_factor == Some(0) {
            return Err("Queue factor must be positive".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            concurrency: 0,
            queue_factor: default_queue_factor(),
        }
    }

    /// Worker count after resolving auto-detection.
    ///
    /// Auto-detect uses twice the available parallelism, since workers
    /// spend most of their time blocked in stat calls.
    pub fn worker_count(&self) -> usize {
        match self.concurrency {
            0 => std::thread::available_parallelism()
                .map(|n| n.get() * 2)
                .unwrap_or(2),
            n => n,
        }
    }

    /// Bounded work queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.worker_count() * self.queue_factor.max(1)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
