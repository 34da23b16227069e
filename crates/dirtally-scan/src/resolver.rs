//! Host user database lookups.

use compact_str::CompactString;

use dirtally_core::NameResolver;

/// Resolves names through the system user and group databases.
///
/// No caching happens here; the pipeline keeps a small cache per worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a new system resolver.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl NameResolver for SystemResolver {
    fn user_name(&self, uid: u32) -> Option<CompactString> {
        uzers::get_user_by_uid(uid).map(|user| CompactString::from(user.name().to_string_lossy()))
    }

    fn group_name(&self, gid: u32) -> Option<CompactString> {
        uzers::get_group_by_gid(gid)
            .map(|group| CompactString::from(group.name().to_string_lossy()))
    }
}

#[cfg(not(unix))]
impl NameResolver for SystemResolver {
    fn user_name(&self, _uid: u32) -> Option<CompactString> {
        None
    }

    fn group_name(&self, _gid: u32) -> Option<CompactString> {
        None
    }
}
