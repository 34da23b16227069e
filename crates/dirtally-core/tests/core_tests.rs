use dirtally_core::{
    AggregationStore, Aggregates, Identity, ROOT_KEY, ScanConfig, Totals, WidthOverrides,
    format_size, parent_key, resolve_widths,
};

#[test]
fn test_concurrent_folds_are_not_lost() {
    let store = AggregationStore::new();
    let owners = [Identity::new(1, "one"), Identity::new(2, "two")];
    let group = Identity::new(10, "crew");

    std::thread::scope(|scope| {
        for t in 0..8 {
            let store = &store;
            let owner = &owners[t % 2];
            let group = &group;
            scope.spawn(move || {
                for i in 0..500 {
                    let dir = if i % 2 == 0 { "a/b" } else { "a/c/d" };
                    store.fold(dir, owner, group, 3);
                }
            });
        }
    });

    let aggs = store.snapshot();
    assert_eq!(aggs.root(), Totals::new(8 * 500 * 3, 8 * 500));
    assert_eq!(aggs.dir("a"), aggs.root());
    assert_eq!(aggs.dir("a/b"), Totals::new(4 * 500 * 3, 4 * 500));
    assert_eq!(aggs.dir("a/c"), aggs.dir("a/c/d"));
    assert_eq!(aggs.users["one"].totals, aggs.users["two"].totals);
    assert_eq!(aggs.groups["crew"].totals, aggs.root());
}

#[test]
fn test_every_ancestor_present() {
    let store = AggregationStore::new();
    let who = Identity::numeric(0);
    store.fold("x/y/z", &who, &who, 1);
    let aggs = store.snapshot();

    let mut key = "x/y/z";
    while let Some(parent) = parent_key(key) {
        assert!(aggs.dirs.contains_key(parent), "missing {parent}");
        assert!(aggs.children.children(parent).iter().any(|c| c == key));
        key = parent;
    }
    assert_eq!(key, ROOT_KEY);
}

#[test]
fn test_first_identity_id_wins_on_name_collision() {
    let store = AggregationStore::new();
    let group = Identity::new(5, "g");
    store.fold(".", &Identity::new(100, "shared"), &group, 1);
    store.fold(".", &Identity::new(200, "shared"), &group, 1);

    let aggs = store.snapshot();
    assert_eq!(aggs.users.len(), 1);
    assert_eq!(aggs.users["shared"].id, 100);
    assert_eq!(aggs.users["shared"].totals, Totals::new(2, 2));
}

#[test]
fn test_empty_aggregates_still_have_root() {
    let aggs = Aggregates::default();
    assert_eq!(aggs.root(), Totals::default());

    let aggs = AggregationStore::new().snapshot();
    assert!(aggs.dirs.contains_key(ROOT_KEY));
    assert!(aggs.children.contains(ROOT_KEY));
}

#[test]
fn test_scan_config_builder() {
    let config = ScanConfig::builder()
        .root("/test/path")
        .concurrency(4usize)
        .queue_factor(2usize)
        .build()
        .unwrap();

    assert_eq!(config.root.to_str().unwrap(), "/test/path");
    assert_eq!(config.worker_count(), 4);
    assert_eq!(config.queue_capacity(), 8);

    let default_config = ScanConfig::new("/default");
    assert_eq!(default_config.concurrency, 0);
    assert_eq!(default_config.queue_factor, 8);
    assert!(default_config.worker_count() >= 2);

    assert!(ScanConfig::builder().root("").build().is_err());
    assert!(ScanConfig::builder().concurrency(1usize).build().is_err());
    assert!(
        ScanConfig::builder()
            .root("/x")
            .queue_factor(0usize)
            .build()
            .is_err()
    );
}

#[test]
fn test_widths_cover_whole_report() {
    let store = AggregationStore::new();
    let user = Identity::new(1, "u");
    let group = Identity::new(2, "g");
    store.fold("small", &user, &group, 10);
    store.fold("big", &user, &group, 5 * 1024 * 1024 * 1024);
    let aggs = store.snapshot();

    let widths = resolve_widths(&aggs, false, WidthOverrides::default());
    assert_eq!(widths.dir_size("big"), "5.0GB");
    assert_eq!(widths.dir_size("small"), "10B");
    assert_eq!(widths.size_width, format_size(aggs.root().size).len());
    assert_eq!(widths.files_width, 3);

    let raw = resolve_widths(&aggs, true, WidthOverrides { size: 0, files: 1 });
    assert_eq!(raw.size_width, "5368709130".len());
    assert_eq!(raw.files_width, 3);

    let wide = resolve_widths(&aggs, true, WidthOverrides { size: 12, files: 5 });
    assert_eq!(wide.size_width, 12);
    assert_eq!(wide.files_width, 5);
}
