//! File system scanning engine for dirtally.
//!
//! This crate walks a directory tree and aggregates, for every directory,
//! the recursive byte size and file count, plus totals per owning user and
//! group.
//!
//! # Overview
//!
//! - **Single producer** enumerates the tree depth-first via jwalk
//! - **Bounded queue** applies backpressure when workers fall behind
//! - **Worker pool** re-stats each file and folds it into the store
//! - **Soft failures** (unreadable entries, vanished files) are skipped
//!
//! # Example
//!
//! ```rust,no_run
//! use dirtally_scan::{Scanner, ScanConfig, SystemResolver};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let outcome = Scanner::new().scan(&config, &SystemResolver::new()).unwrap();
//! let aggregates = outcome.store.snapshot();
//!
//! println!("Total size: {} bytes", aggregates.root().size);
//! println!("Total files: {}", aggregates.root().files);
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use dirtally_scan::Scanner;
//!
//! let scanner = Scanner::new();
//! let mut progress_rx = scanner.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         eprintln!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod progress;
mod resolver;
mod scanner;

pub use progress::ScanProgress;
pub use resolver::SystemResolver;
pub use scanner::{ScanOutcome, Scanner, scan};

// Re-export core types for convenience
pub use dirtally_core::{
    AggregationStore, Aggregates, Identity, NameResolver, RunMetadata, ScanConfig, ScanError,
    StaticResolver, Totals,
};
