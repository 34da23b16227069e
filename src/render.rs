//! Terminal report: directory tree plus per-user and per-group summaries.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use compact_str::CompactString;
use itertools::Itertools;

use dirtally_core::{
    Aggregates, ColumnWidths, DirOwnership, IdentityTotals, NameResolver, ROOT_KEY, WidthOverrides,
    key_name, resolve_widths,
};
use dirtally_snapshot::absolute_dir;

const OWNER_WIDTH: usize = 15;
const SUMMARY_NAME_WIDTH: usize = 20;

/// What the report shows.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Directory levels below the root to print; 0 prints only the root.
    pub levels: usize,
    pub show_files: bool,
    pub show_user: bool,
    pub show_group: bool,
    /// Print sizes as raw byte counts.
    pub raw_bytes: bool,
    /// Limit each summary to the N largest entries; 0 shows all.
    pub top: usize,
    pub widths: WidthOverrides,
}

/// Writes a report for one aggregate, live or replayed.
pub struct Report<'a> {
    root: &'a Path,
    aggregates: &'a Aggregates,
    resolver: &'a dyn NameResolver,
    options: &'a RenderOptions,
    widths: ColumnWidths,
}

impl<'a> Report<'a> {
    pub fn new(
        root: &'a Path,
        aggregates: &'a Aggregates,
        resolver: &'a dyn NameResolver,
        options: &'a RenderOptions,
    ) -> Self {
        let widths = resolve_widths(aggregates, options.raw_bytes, options.widths);
        Self {
            root,
            aggregates,
            resolver,
            options,
            widths,
        }
    }

    /// Write the whole report.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.write_tree(out)?;

        writeln!(out)?;
        writeln!(out, "Per-user summary:")?;
        self.write_summary(out, &self.aggregates.users, &self.widths.user_sizes)?;

        writeln!(out)?;
        writeln!(out, "Per-group summary:")?;
        self.write_summary(out, &self.aggregates.groups, &self.widths.group_sizes)
    }

    fn write_tree<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut header = self.columns("Size", "Files", "User", "Group");
        header.push_str(" Path");
        writeln!(out, "{header}")?;

        self.write_dir(out, ROOT_KEY, 0, "", true)
    }

    fn write_dir<W: Write>(
        &self,
        out: &mut W,
        key: &str,
        level: usize,
        prefix: &str,
        is_last: bool,
    ) -> io::Result<()> {
        let totals = self.aggregates.dir(key);
        let (user, group) = self.ownership(key);
        let mut line = self.columns(
            self.widths.dir_size(key),
            &totals.files.to_string(),
            &user,
            &group,
        );

        line.push(' ');
        if level == 0 {
            line.push_str(&self.root.display().to_string());
        } else {
            line.push_str(prefix);
            line.push_str(if is_last { "└── " } else { "├── " });
            line.push_str(key_name(key));
        }
        writeln!(out, "{line}")?;

        if level >= self.options.levels {
            return Ok(());
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let kids = self
            .aggregates
            .children
            .children_by_size(key, &self.aggregates.dirs);
        let last = kids.len().saturating_sub(1);
        for (i, child) in kids.into_iter().enumerate() {
            self.write_dir(out, child, level + 1, &child_prefix, i == last)?;
        }
        Ok(())
    }

    /// Size, then the optional files, user and group columns.
    fn columns(&self, size: &str, files: &str, user: &str, group: &str) -> String {
        let mut line = format!("{size:>width$}", width = self.widths.size_width);
        if self.options.show_files {
            line.push_str(&format!(" {files:>width$}", width = self.widths.files_width));
        }
        if self.options.show_user {
            line.push_str(&format!(" {user:<OWNER_WIDTH$}"));
        }
        if self.options.show_group {
            line.push_str(&format!(" {group:<OWNER_WIDTH$}"));
        }
        line
    }

    /// Owner columns for a directory; blank when it cannot be stat'ed.
    fn ownership(&self, key: &str) -> (String, String) {
        if !self.options.show_user && !self.options.show_group {
            return (String::new(), String::new());
        }
        let owner = match self.aggregates.owners.get(key) {
            Some(owner) => Some(owner.clone()),
            None => DirOwnership::lstat(&absolute_dir(self.root, key), self.resolver),
        };
        owner.map_or_else(
            || (String::new(), String::new()),
            |o| (o.user_display().to_string(), o.group_display().to_string()),
        )
    }

    fn write_summary<W: Write>(
        &self,
        out: &mut W,
        entries: &HashMap<CompactString, IdentityTotals>,
        formatted: &HashMap<CompactString, String>,
    ) -> io::Result<()> {
        let limit = match self.options.top {
            0 => usize::MAX,
            n => n,
        };
        let ranked = entries
            .iter()
            .sorted_by(|(a_name, a), (b_name, b)| {
                b.totals.size.cmp(&a.totals.size).then_with(|| a_name.cmp(b_name))
            })
            .take(limit);

        for (name, entry) in ranked {
            writeln!(
                out,
                "{name:<SUMMARY_NAME_WIDTH$} {size:>sw$} {files:>fw$} files",
                size = formatted.get(name).map_or("0", String::as_str),
                files = entry.totals.files,
                sw = self.widths.size_width,
                fw = self.widths.files_width,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirtally_core::{AggregationStore, Identity, StaticResolver};

    fn sample() -> Aggregates {
        let store = AggregationStore::new();
        let alice = Identity::new(1000, "alice");
        let bob = Identity::new(1001, "bob");
        let staff = Identity::new(50, "staff");

        store.fold(".", &alice, &staff, 400);
        store.fold(".", &bob, &staff, 600);
        store.fold("sub", &alice, &staff, 500);
        store.fold("big", &bob, &staff, 2048);
        store.fold("big/inner", &bob, &staff, 10);
        store.snapshot()
    }

    fn render(aggs: &Aggregates, options: &RenderOptions) -> String {
        let mut out = Vec::new();
        Report::new(Path::new("/data"), aggs, &StaticResolver::new(), options)
            .write_to(&mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_tree_layout() {
        let options = RenderOptions {
            levels: 2,
            ..RenderOptions::default()
        };
        let text = render(&sample(), &options);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], " Size Path");
        assert_eq!(lines[1], "3.5KB /data");
        assert_eq!(lines[2], "2.0KB     ├── big");
        assert_eq!(lines[3], "  10B     │   └── inner");
        assert_eq!(lines[4], " 500B     └── sub");
    }

    #[test]
    fn test_levels_limit_depth() {
        let options = RenderOptions {
            levels: 0,
            ..RenderOptions::default()
        };
        let text = render(&sample(), &options);
        let tree: Vec<&str> = text.lines().take_while(|l| !l.is_empty()).collect();

        assert_eq!(tree.len(), 2);
        assert!(tree[1].ends_with("/data"));
    }

    #[test]
    fn test_summaries_ranked_and_truncated() {
        let options = RenderOptions {
            top: 1,
            raw_bytes: true,
            ..RenderOptions::default()
        };
        let text = render(&sample(), &options);

        let users: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != "Per-user summary:")
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(users, [format!("{:<20} 2658   3 files", "bob")]);
        assert!(text.contains(&format!("{:<20} 3558   5 files", "staff")));
    }

    #[test]
    fn test_owner_columns_from_known_ownership() {
        let owner = DirOwnership {
            uid: 7,
            gid: 8,
            user: Some("seven".into()),
            group: None,
        };
        let aggs = sample().with_owners(HashMap::from([(".".into(), owner)]));
        let options = RenderOptions {
            show_files: true,
            show_user: true,
            show_group: true,
            ..RenderOptions::default()
        };
        let text = render(&aggs, &options);
        let root_line = text.lines().nth(1).unwrap();

        assert_eq!(
            root_line,
            format!("3.5KB   5 {:<15} {:<15} /data", "seven", "8")
        );
    }
}
