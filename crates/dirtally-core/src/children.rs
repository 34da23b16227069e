//! Directory hierarchy derived from relative path keys.

use std::collections::HashMap;

use compact_str::CompactString;

use crate::store::{Totals, parent_key};

/// Maps every directory key to its direct child directory keys.
///
/// Built once after scanning completes, so the concurrent phase never
/// touches a tree structure. Child lists are sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenIndex {
    children: HashMap<CompactString, Vec<CompactString>>,
}

impl ChildrenIndex {
    /// Build the index from the full set of directory keys.
    ///
    /// Every key gets an entry, even when it has no children.
    pub fn build<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut children: HashMap<CompactString, Vec<CompactString>> = HashMap::new();

        for key in keys {
            children.entry(CompactString::new(key)).or_default();
            if let Some(parent) = parent_key(key) {
                children
                    .entry(CompactString::new(parent))
                    .or_default()
                    .push(CompactString::new(key));
            }
        }

        for list in children.values_mut() {
            list.sort();
        }

        Self { children }
    }

    /// Direct children of a directory.
    pub fn children(&self, key: &str) -> &[CompactString] {
        self.children.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if a directory is known to the index.
    pub fn contains(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    /// Number of directories in the index.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children ordered by size descending, ties broken by key.
    pub fn children_by_size<'a>(
        &'a self,
        key: &str,
        dirs: &HashMap<CompactString, Totals>,
    ) -> Vec<&'a str> {
        let size_of = |k: &str| dirs.get(k).map_or(0, |t| t.size);
        let mut kids: Vec<&str> = self.children(key).iter().map(CompactString::as_str).collect();
        kids.sort_by(|a, b| size_of(b).cmp(&size_of(a)).then_with(|| a.cmp(b)));
        kids
    }
}
