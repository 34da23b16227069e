//! Column widths shared by the directory tree and the owner summaries.

use std::collections::HashMap;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::format::format_size_column;
use crate::store::{Aggregates, IdentityTotals};

/// Narrowest size column.
pub const MIN_SIZE_WIDTH: usize = 4;
/// Narrowest files column.
pub const MIN_FILES_WIDTH: usize = 3;

/// Caller-supplied column widths. Zero means auto-fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthOverrides {
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub files: usize,
}

/// Formatted sizes plus the widths needed to right-align them.
#[derive(Debug, Clone, Default)]
pub struct ColumnWidths {
    /// Formatted size per directory key.
    pub dir_sizes: HashMap<CompactString, String>,
    /// Formatted size per user name.
    pub user_sizes: HashMap<CompactString, String>,
    /// Formatted size per group name.
    pub group_sizes: HashMap<CompactString, String>,
    /// Width of the size column.
    pub size_width: usize,
    /// Width of the files column.
    pub files_width: usize,
}

/// Format every size and compute one alignment for the whole report.
///
/// Widths span directories, users and groups together. A positive
/// override replaces the computed width, and either is then floored at
/// [`MIN_SIZE_WIDTH`] / [`MIN_FILES_WIDTH`].
pub fn resolve_widths(
    aggregates: &Aggregates,
    raw_bytes: bool,
    overrides: WidthOverrides,
) -> ColumnWidths {
    let mut size_width = 0;
    let mut files_width = 0;

    let mut dir_sizes = HashMap::with_capacity(aggregates.dirs.len());
    for (key, totals) in &aggregates.dirs {
        let formatted = format_size_column(totals.size, raw_bytes);
        size_width = size_width.max(formatted.len());
        files_width = files_width.max(digits(totals.files));
        dir_sizes.insert(key.clone(), formatted);
    }

    let mut format_identities = |map: &HashMap<CompactString, IdentityTotals>| {
        let mut out = HashMap::with_capacity(map.len());
        for (name, entry) in map {
            let formatted = format_size_column(entry.totals.size, raw_bytes);
            size_width = size_width.max(formatted.len());
            files_width = files_width.max(digits(entry.totals.files));
            out.insert(name.clone(), formatted);
        }
        out
    };
    let user_sizes = format_identities(&aggregates.users);
    let group_sizes = format_identities(&aggregates.groups);

    let size_width = pick_width(size_width, MIN_SIZE_WIDTH, overrides.size);
    let files_width = pick_width(files_width, MIN_FILES_WIDTH, overrides.files);

    ColumnWidths {
        dir_sizes,
        user_sizes,
        group_sizes,
        size_width,
        files_width,
    }
}

fn pick_width(computed: usize, minimum: usize, override_width: usize) -> usize {
    let width = if override_width > 0 {
        override_width
    } else {
        computed
    };
    width.max(minimum)
}

fn digits(value: i64) -> usize {
    value.to_string().len()
}

impl ColumnWidths {
    /// Formatted size of a directory, `"0"` if unknown.
    pub fn dir_size(&self, key: &str) -> &str {
        self.dir_sizes.get(key).map_or("0", String::as_str)
    }

    /// Formatted size of a user.
    pub fn user_size(&self, name: &str) -> &str {
        self.user_sizes.get(name).map_or("0", String::as_str)
    }

    /// Formatted size of a group.
    pub fn group_size(&self, name: &str) -> &str {
        self.group_sizes.get(name).map_or("0", String::as_str)
    }
}
