//! Owner and group name resolution.

use std::collections::HashMap;
use std::path::Path;

use compact_str::CompactString;

use crate::store::Identity;

/// Looks up display names for numeric user and group ids.
///
/// Implementations must be callable from many worker threads at once.
/// `None` means the id could not be resolved.
pub trait NameResolver: Send + Sync {
    /// Resolve a uid to a user name.
    fn user_name(&self, uid: u32) -> Option<CompactString>;

    /// Resolve a gid to a group name.
    fn group_name(&self, gid: u32) -> Option<CompactString>;

    /// Resolve a uid, falling back to its decimal form.
    fn user_identity(&self, uid: u32) -> Identity {
        match self.user_name(uid) {
            Some(name) => Identity::new(uid, name),
            None => Identity::numeric(uid),
        }
    }

    /// Resolve a gid, falling back to its decimal form.
    fn group_identity(&self, gid: u32) -> Identity {
        match self.group_name(gid) {
            Some(name) => Identity::new(gid, name),
            None => Identity::numeric(gid),
        }
    }
}

/// Resolver backed by fixed in-memory tables.
///
/// Useful when the host user database must not be consulted.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    users: HashMap<u32, CompactString>,
    groups: HashMap<u32, CompactString>,
}

impl StaticResolver {
    /// Create a resolver that resolves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user name.
    pub fn with_user(mut self, uid: u32, name: impl Into<CompactString>) -> Self {
        self.users.insert(uid, name.into());
        self
    }

    /// Add a group name.
    pub fn with_group(mut self, gid: u32, name: impl Into<CompactString>) -> Self {
        self.groups.insert(gid, name.into());
        self
    }
}

impl NameResolver for StaticResolver {
    fn user_name(&self, uid: u32) -> Option<CompactString> {
        self.users.get(&uid).cloned()
    }

    fn group_name(&self, gid: u32) -> Option<CompactString> {
        self.groups.get(&gid).cloned()
    }
}

/// Owner and group of a directory, as shown next to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirOwnership {
    pub uid: u32,
    pub gid: u32,
    /// Resolved user name, `None` when unresolvable.
    pub user: Option<CompactString>,
    /// Resolved group name, `None` when unresolvable.
    pub group: Option<CompactString>,
}

impl DirOwnership {
    /// Read ownership of `path` without following symlinks.
    ///
    /// Returns `None` if the path cannot be stat'ed.
    pub fn lstat(path: &Path, resolver: &dyn NameResolver) -> Option<Self> {
        let metadata = std::fs::symlink_metadata(path).ok()?;
        let (uid, gid) = owner_ids(&metadata);
        Some(Self {
            uid,
            gid,
            user: resolver.user_name(uid),
            group: resolver.group_name(gid),
        })
    }

    /// User name, or the decimal uid when unresolved.
    pub fn user_display(&self) -> CompactString {
        self.user
            .clone()
            .unwrap_or_else(|| compact_str::format_compact!("{}", self.uid))
    }

    /// Group name, or the decimal gid when unresolved.
    pub fn group_display(&self) -> CompactString {
        self.group
            .clone()
            .unwrap_or_else(|| compact_str::format_compact!("{}", self.gid))
    }
}

/// Get the owning uid and gid from metadata.
#[cfg(unix)]
pub fn owner_ids(metadata: &std::fs::Metadata) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (metadata.uid(), metadata.gid())
}

#[cfg(not(unix))]
pub fn owner_ids(_metadata: &std::fs::Metadata) -> (u32, u32) {
    (0, 0) // No numeric ownership outside unix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver_fallback() {
        let resolver = StaticResolver::new().with_user(1000, "alice").with_group(100, "staff");

        assert_eq!(resolver.user_identity(1000), Identity::new(1000, "alice"));
        assert_eq!(resolver.user_identity(1001).name, "1001");
        assert_eq!(resolver.group_identity(100).name, "staff");
        assert_eq!(resolver.group_identity(7).name, "7");
    }

    #[test]
    fn test_display_fallback() {
        let owner = DirOwnership {
            uid: 501,
            gid: 20,
            user: None,
            group: Some("staff".into()),
        };
        assert_eq!(owner.user_display(), "501");
        assert_eq!(owner.group_display(), "staff");
    }

    #[test]
    fn test_lstat_missing_path() {
        let resolver = StaticResolver::new();
        assert!(DirOwnership::lstat(Path::new("/definitely/not/here"), &resolver).is_none());
    }

    #[test]
    fn test_lstat_existing_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let resolver = StaticResolver::new();
        let owner = DirOwnership::lstat(temp.path(), &resolver).unwrap();
        assert!(owner.user.is_none());
    }
}
