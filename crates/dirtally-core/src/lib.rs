//! Core types for dirtally.
//!
//! This crate holds the aggregate model shared by live scans and snapshot
//! replays: the concurrent [`AggregationStore`], its immutable
//! [`Aggregates`] snapshot with the [`ChildrenIndex`], size formatting,
//! column widths, run metadata and the name-resolution seam.

mod children;
mod config;
mod error;
mod format;
mod metadata;
mod resolve;
mod store;
mod widths;

pub use children::ChildrenIndex;
pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::ScanError;
pub use format::{format_size, format_size_column};
pub use metadata::{MemoryStats, RunMetadata};
pub use resolve::{DirOwnership, NameResolver, StaticResolver, owner_ids};
pub use store::{
    AggregationStore, Aggregates, Identity, IdentityTotals, ROOT_KEY, Totals, key_name, parent_key,
};
pub use widths::{ColumnWidths, MIN_FILES_WIDTH, MIN_SIZE_WIDTH, WidthOverrides, resolve_widths};
