//! Conversion between aggregates and snapshot documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use compact_str::CompactString;

use dirtally_core::{
    Aggregates, DirOwnership, IdentityTotals, NameResolver, ROOT_KEY, RunMetadata, Totals,
};

use crate::schema::{DirRecord, GroupRecord, SnapshotDocument, SnapshotStats, UserRecord};

/// Settings for producing snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    /// Program version recorded in the document.
    pub version: String,
    /// Wrap the document in gzip framing.
    pub compress: bool,
}

impl SnapshotOptions {
    /// Create options for the given program version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            compress: false,
        }
    }

    /// Enable or disable gzip framing.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Absolute path of a relative directory key.
pub fn absolute_dir(root: &Path, key: &str) -> PathBuf {
    if key == ROOT_KEY {
        root.to_path_buf()
    } else {
        root.join(key)
    }
}

impl SnapshotStats {
    /// Render run metadata for the wire.
    pub fn from_metadata(metadata: &RunMetadata, version: &str) -> Self {
        Self {
            started_at: metadata
                .started_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            ended_at: metadata.ended_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            runtime_seconds: metadata.runtime().as_secs_f64(),
            runtime: metadata.runtime_display(),
            dirs_scanned: i64::try_from(metadata.dirs_scanned).unwrap_or(i64::MAX),
            files_scanned: i64::try_from(metadata.files_scanned).unwrap_or(i64::MAX),
            version: version.to_string(),
            mem_alloc_bytes: metadata.memory.resident_bytes,
            peak_alloc_bytes: metadata.memory.peak_resident_bytes,
        }
    }
}

impl SnapshotDocument {
    /// Build a document in canonical order.
    ///
    /// Directory ownership comes from `aggregates.owners` when known,
    /// otherwise each directory is re-stat'ed without following links.
    /// Names that cannot be resolved are left empty.
    pub fn from_aggregates(
        root: &Path,
        aggregates: &Aggregates,
        metadata: &RunMetadata,
        resolver: &dyn NameResolver,
        options: &SnapshotOptions,
    ) -> Self {
        let mut dirs: Vec<DirRecord> = aggregates
            .dirs
            .iter()
            .map(|(key, totals)| {
                let abs = absolute_dir(root, key);
                let owner = aggregates
                    .owners
                    .get(key)
                    .cloned()
                    .or_else(|| DirOwnership::lstat(&abs, resolver))
                    .unwrap_or_default();
                DirRecord {
                    path: abs.to_string_lossy().into_owned(),
                    rel: key.to_string(),
                    size: totals.size,
                    files: totals.files,
                    uid: owner.uid,
                    gid: owner.gid,
                    user: owner.user.map(String::from).unwrap_or_default(),
                    group: owner.group.map(String::from).unwrap_or_default(),
                }
            })
            .collect();

        let mut users: Vec<UserRecord> = aggregates
            .users
            .iter()
            .map(|(name, entry)| UserRecord {
                name: name.to_string(),
                size: entry.totals.size,
                files: entry.totals.files,
                uid: entry.id,
            })
            .collect();

        let mut groups: Vec<GroupRecord> = aggregates
            .groups
            .iter()
            .map(|(name, entry)| GroupRecord {
                name: name.to_string(),
                size: entry.totals.size,
                files: entry.totals.files,
                gid: entry.id,
            })
            .collect();

        dirs.sort_by(|a, b| a.path.cmp(&b.path));
        users.sort_by(|a, b| a.name.cmp(&b.name));
        groups.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            root: root.to_string_lossy().into_owned(),
            stats: SnapshotStats::from_metadata(metadata, &options.version),
            dirs,
            users,
            groups,
        }
    }

    /// Re-derive the aggregate model, including directory ownership.
    ///
    /// The result drives the children index and width resolver exactly
    /// like a live scan.
    pub fn to_aggregates(&self) -> Aggregates {
        let mut dirs = HashMap::with_capacity(self.dirs.len());
        let mut owners = HashMap::with_capacity(self.dirs.len());
        for record in &self.dirs {
            let key = CompactString::new(&record.rel);
            dirs.insert(key.clone(), Totals::new(record.size, record.files));
            owners.insert(
                key,
                DirOwnership {
                    uid: record.uid,
                    gid: record.gid,
                    user: non_empty(&record.user),
                    group: non_empty(&record.group),
                },
            );
        }

        let users = self
            .users
            .iter()
            .map(|u| {
                (
                    CompactString::new(&u.name),
                    IdentityTotals {
                        id: u.uid,
                        totals: Totals::new(u.size, u.files),
                    },
                )
            })
            .collect();

        let groups = self
            .groups
            .iter()
            .map(|g| {
                (
                    CompactString::new(&g.name),
                    IdentityTotals {
                        id: g.gid,
                        totals: Totals::new(g.size, g.files),
                    },
                )
            })
            .collect();

        Aggregates::new(dirs, users, groups).with_owners(owners)
    }

    /// Root path as recorded in the document.
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }
}

fn non_empty(value: &str) -> Option<CompactString> {
    (!value.is_empty()).then(|| CompactString::new(value))
}
