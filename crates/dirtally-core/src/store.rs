//! Concurrent aggregation store and its immutable snapshot.

use std::collections::HashMap;

use compact_str::CompactString;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::children::ChildrenIndex;
use crate::resolve::DirOwnership;

/// Key of the scan root in the directory mapping.
pub const ROOT_KEY: &str = ".";

/// Cumulative byte size and file count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Total bytes.
    pub size: i64,
    /// Total number of files.
    pub files: i64,
}

impl Totals {
    /// Create totals from raw values.
    pub fn new(size: i64, files: i64) -> Self {
        Self { size, files }
    }

    /// Add one file of the given size.
    pub fn add_file(&mut self, size: i64) {
        self.size += size;
        self.files += 1;
    }
}

/// A resolved owner or group identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Numeric uid or gid.
    pub id: u32,
    /// Display name, or the decimal id when the lookup failed.
    pub name: CompactString,
}

impl Identity {
    /// Create an identity from an id and an already resolved name.
    pub fn new(id: u32, name: impl Into<CompactString>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Create an identity whose display name is its decimal id.
    pub fn numeric(id: u32) -> Self {
        Self {
            id,
            name: compact_str::format_compact!("{id}"),
        }
    }
}

/// Totals attributed to one owner or group.
///
/// `id` is the numeric id of the first file folded under this name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityTotals {
    pub id: u32,
    pub totals: Totals,
}

/// Parent key of a relative directory key, or `None` for the root.
///
/// Top-level directories have the root (`"."`) as their parent.
pub fn parent_key(key: &str) -> Option<&str> {
    if key == ROOT_KEY {
        return None;
    }
    match key.rfind('/') {
        Some(idx) => Some(&key[..idx]),
        None => Some(ROOT_KEY),
    }
}

/// Last path component of a relative directory key.
pub fn key_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Shared per-directory, per-user and per-group rollups.
///
/// Folding is safe from any number of threads. Each key is updated
/// atomically; the store only grows.
#[derive(Debug, Default)]
pub struct AggregationStore {
    dirs: DashMap<CompactString, Totals>,
    users: DashMap<CompactString, IdentityTotals>,
    groups: DashMap<CompactString, IdentityTotals>,
}

impl AggregationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file into its directory, every ancestor up to the root,
    /// its owner and its group.
    pub fn fold(&self, dir: &str, owner: &Identity, group: &Identity, size: i64) {
        let mut key = Some(dir);
        while let Some(current) = key {
            // Each guard is released at the end of the statement so no two
            // shard locks are ever held at once.
            self.dirs
                .entry(CompactString::new(current))
                .or_default()
                .add_file(size);
            key = parent_key(current);
        }

        Self::fold_identity(&self.users, owner, size);
        Self::fold_identity(&self.groups, group, size);
    }

    fn fold_identity(map: &DashMap<CompactString, IdentityTotals>, identity: &Identity, size: i64) {
        map.entry(identity.name.clone())
            .or_insert_with(|| IdentityTotals {
                id: identity.id,
                totals: Totals::default(),
            })
            .totals
            .add_file(size);
    }

    /// Number of directories with at least one attributed file.
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Totals of a single directory, if any file was attributed to it.
    pub fn dir_totals(&self, key: &str) -> Option<Totals> {
        self.dirs.get(key).map(|t| *t)
    }

    /// Deep copy of all mappings plus a freshly built children index.
    ///
    /// Must only be called once no further folds are in flight.
    pub fn snapshot(&self) -> Aggregates {
        let dirs = self
            .dirs
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        let users = self
            .users
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        let groups = self
            .groups
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();

        Aggregates::new(dirs, users, groups)
    }
}

/// Immutable aggregate state, from a live scan or a decoded snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    /// Directory totals keyed by path relative to the root.
    pub dirs: HashMap<CompactString, Totals>,
    /// Owner totals keyed by display name.
    pub users: HashMap<CompactString, IdentityTotals>,
    /// Group totals keyed by display name.
    pub groups: HashMap<CompactString, IdentityTotals>,
    /// Directory ownership known up front (snapshot replays only).
    pub owners: HashMap<CompactString, DirOwnership>,
    /// Direct child directories of every directory.
    pub children: ChildrenIndex,
}

impl Aggregates {
    /// Assemble aggregates and build the children index.
    ///
    /// The root key is always present, with zero totals for an empty tree.
    pub fn new(
        mut dirs: HashMap<CompactString, Totals>,
        users: HashMap<CompactString, IdentityTotals>,
        groups: HashMap<CompactString, IdentityTotals>,
    ) -> Self {
        dirs.entry(CompactString::const_new(ROOT_KEY)).or_default();
        let children = ChildrenIndex::build(dirs.keys().map(CompactString::as_str));

        Self {
            dirs,
            users,
            groups,
            owners: HashMap::new(),
            children,
        }
    }

    /// Attach known directory ownership.
    pub fn with_owners(mut self, owners: HashMap<CompactString, DirOwnership>) -> Self {
        self.owners = owners;
        self
    }

    /// Root directory totals.
    pub fn root(&self) -> Totals {
        self.dirs.get(ROOT_KEY).copied().unwrap_or_default()
    }

    /// Totals of a directory, zero if unknown.
    pub fn dir(&self, key: &str) -> Totals {
        self.dirs.get(key).copied().unwrap_or_default()
    }
}
