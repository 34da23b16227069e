//! Snapshot persistence for dirtally aggregates.
//!
//! A snapshot is a pretty-printed JSON document holding the scanned root,
//! run statistics and three sorted sequences: directories, users and
//! groups. It can be gzip-framed; the decoder detects framing from the
//! first two bytes, so plain and compressed snapshots load the same way,
//! from files or from non-seekable pipes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use dirtally_core::{AggregationStore, RunMetadata, StaticResolver};
//! use dirtally_snapshot::{SnapshotDocument, SnapshotOptions, read_snapshot, to_vec};
//!
//! let aggregates = AggregationStore::new().snapshot();
//! let doc = SnapshotDocument::from_aggregates(
//!     Path::new("/data"),
//!     &aggregates,
//!     &RunMetadata::start(),
//!     &StaticResolver::new(),
//!     &SnapshotOptions::new("0.1.0"),
//! );
//!
//! let bytes = to_vec(&doc).unwrap();
//! let restored = read_snapshot(bytes.as_slice()).unwrap();
//! assert_eq!(restored.to_aggregates().dirs, aggregates.dirs);
//! ```

mod decode;
mod document;
mod encode;
mod error;
mod schema;

pub use decode::{GZIP_MAGIC, SnapshotSource, is_gzip, load_snapshot, read_snapshot};
pub use document::{SnapshotOptions, absolute_dir};
pub use encode::{SnapshotTarget, save_snapshot, to_vec, with_gz_extension, write_snapshot};
pub use error::SnapshotError;
pub use schema::{DirRecord, GroupRecord, SnapshotDocument, SnapshotStats, UserRecord};
