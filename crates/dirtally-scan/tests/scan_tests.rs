use std::collections::HashMap;
use std::fs;
use std::path::Path;

use dirtally_core::{Aggregates, ROOT_KEY, parent_key};
use dirtally_scan::{ScanConfig, Scanner, StaticResolver, Totals};
use tempfile::TempDir;

fn scan_with(root: &Path, concurrency: usize) -> Aggregates {
    let config = ScanConfig::builder()
        .root(root)
        .concurrency(concurrency)
        .build()
        .unwrap();
    Scanner::new()
        .scan(&config, &StaticResolver::new())
        .unwrap()
        .store
        .snapshot()
}

fn write_sized(path: &Path, size: usize) {
    fs::write(path, vec![b'x'; size]).unwrap();
}

/// A wider tree with uneven depth and file sizes.
fn create_wide_tree() -> (TempDir, i64, i64) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let mut total_size = 0i64;
    let mut total_files = 0i64;

    for d in 0..6 {
        let dir = root.join(format!("d{d}"));
        fs::create_dir_all(dir.join("inner/deeper")).unwrap();
        for f in 0..(d + 2) {
            let size = 100 * (f + 1) + d;
            write_sized(&dir.join(format!("f{f}.bin")), size);
            total_size += size as i64;
            total_files += 1;
        }
        write_sized(&dir.join("inner/deeper/leaf"), 7);
        total_size += 7;
        total_files += 1;
    }
    write_sized(&root.join(".hidden"), 11);
    total_size += 11;
    total_files += 1;

    (temp, total_size, total_files)
}

#[test]
fn test_root_equals_sum_of_files() {
    let (temp, total_size, total_files) = create_wide_tree();
    let aggs = scan_with(temp.path(), 4);

    assert_eq!(aggs.root(), Totals::new(total_size, total_files));
}

#[test]
fn test_rollup_is_monotonic() {
    let (temp, _, _) = create_wide_tree();
    let aggs = scan_with(temp.path(), 4);

    for (key, totals) in &aggs.dirs {
        if let Some(parent) = parent_key(key) {
            let parent_totals = aggs.dir(parent);
            assert!(parent_totals.size >= totals.size, "{parent} < {key}");
            assert!(parent_totals.files >= totals.files, "{parent} < {key}");
        }
    }
}

#[test]
fn test_owner_and_group_partition_root() {
    let (temp, _, _) = create_wide_tree();
    let aggs = scan_with(temp.path(), 4);
    let root = aggs.root();

    let user_size: i64 = aggs.users.values().map(|u| u.totals.size).sum();
    let user_files: i64 = aggs.users.values().map(|u| u.totals.files).sum();
    let group_size: i64 = aggs.groups.values().map(|g| g.totals.size).sum();

    assert_eq!(user_size, root.size);
    assert_eq!(user_files, root.files);
    assert_eq!(group_size, root.size);
}

#[test]
fn test_sub_directory_scenario() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("sub")).unwrap();
    write_sized(&root.join("sub/one"), 500);
    write_sized(&root.join("a"), 400);
    write_sized(&root.join("b"), 600);

    let aggs = scan_with(root, 2);

    assert_eq!(aggs.dir(ROOT_KEY), Totals::new(1500, 3));
    assert_eq!(aggs.dir("sub"), Totals::new(500, 1));
    assert_eq!(aggs.children.children(ROOT_KEY), ["sub"]);
}

#[test]
fn test_result_independent_of_concurrency() {
    let (temp, _, _) = create_wide_tree();

    let single = scan_with(temp.path(), 1);
    let many = scan_with(temp.path(), 16);

    assert_eq!(single.dirs, many.dirs);
    assert_eq!(single.users, many.users);
    assert_eq!(single.groups, many.groups);
}

#[test]
fn test_unresolved_ids_use_numbers() {
    let temp = TempDir::new().unwrap();
    write_sized(&temp.path().join("f"), 10);

    let aggs = scan_with(temp.path(), 1);

    let (name, entry) = aggs.users.iter().next().unwrap();
    assert_eq!(name.as_str(), entry.id.to_string());
}

#[test]
fn test_resolved_names_key_aggregates() {
    let temp = TempDir::new().unwrap();
    write_sized(&temp.path().join("f"), 10);
    let meta = fs::metadata(temp.path().join("f")).unwrap();
    let (uid, gid) = dirtally_core::owner_ids(&meta);

    let resolver = StaticResolver::new()
        .with_user(uid, "owner")
        .with_group(gid, "crew");
    let outcome = Scanner::new()
        .scan(&ScanConfig::new(temp.path()), &resolver)
        .unwrap();
    let aggs = outcome.store.snapshot();

    assert_eq!(aggs.users["owner"].totals, Totals::new(10, 1));
    assert_eq!(aggs.users["owner"].id, uid);
    assert_eq!(aggs.groups["crew"].totals, Totals::new(10, 1));
}

#[test]
fn test_empty_tree_has_zero_root() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("empty")).unwrap();

    let outcome = Scanner::new()
        .scan(&ScanConfig::new(temp.path()), &StaticResolver::new())
        .unwrap();
    let aggs = outcome.store.snapshot();

    assert_eq!(outcome.metadata.dirs_scanned, 2);
    assert_eq!(aggs.root(), Totals::default());
    // Directories without files never get an aggregate.
    assert!(!aggs.dirs.contains_key("empty"));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_files_not_traversed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("sub")).unwrap();
    write_sized(&root.join("sub/data"), 1000);
    std::os::unix::fs::symlink("sub", root.join("link")).unwrap();

    let outcome = Scanner::new()
        .scan(&ScanConfig::new(root), &StaticResolver::new())
        .unwrap();
    let aggs = outcome.store.snapshot();

    let link_size = fs::symlink_metadata(root.join("link")).unwrap().len() as i64;
    assert_eq!(outcome.metadata.files_scanned, 2);
    assert_eq!(aggs.root(), Totals::new(1000 + link_size, 2));
    assert!(!aggs.dirs.contains_key("link"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("locked")).unwrap();
    write_sized(&root.join("locked/hidden"), 1000);
    write_sized(&root.join("a"), 20);
    write_sized(&root.join("b"), 40);
    fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through the mode bits; nothing to observe then.
    if fs::read_dir(root.join("locked")).is_ok() {
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = Scanner::new().scan(&ScanConfig::new(root), &StaticResolver::new());
    fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

    let outcome = result.unwrap();
    let aggs = outcome.store.snapshot();
    assert!(outcome.skipped >= 1);
    assert_eq!(aggs.root(), Totals::new(60, 2));
    assert!(!aggs.dirs.contains_key("locked"));
}

#[test]
fn test_progress_updates_published() {
    let temp = TempDir::new().unwrap();
    for i in 0..1500 {
        write_sized(&temp.path().join(format!("f{i}")), 1);
    }

    let scanner = Scanner::new();
    let mut rx = scanner.subscribe();
    scanner
        .scan(&ScanConfig::new(temp.path()), &StaticResolver::new())
        .unwrap();

    let progress = rx.try_recv().unwrap();
    assert_eq!(progress.files_scanned, 1000);
}

#[test]
fn test_dirs_match_children_index() {
    let (temp, _, _) = create_wide_tree();
    let aggs = scan_with(temp.path(), 3);

    let mut parents: HashMap<&str, usize> = HashMap::new();
    for key in aggs.dirs.keys() {
        if let Some(parent) = parent_key(key) {
            *parents.entry(parent).or_default() += 1;
        }
    }
    for (parent, count) in parents {
        assert_eq!(aggs.children.children(parent).len(), count);
    }
}
