//! Producer/worker scan pipeline.
//!
//! One thread enumerates the tree with jwalk and pushes every non-directory
//! path into a bounded queue. A fixed pool of workers re-stats each path
//! and folds it into the shared [`AggregationStore`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use compact_str::CompactString;
use crossbeam_channel::{Receiver, Sender, bounded};
use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use dirtally_core::{
    AggregationStore, Identity, NameResolver, ROOT_KEY, RunMetadata, ScanConfig, ScanError,
    owner_ids,
};

use crate::progress::{PROGRESS_INTERVAL, ScanProgress};
use crate::resolver::SystemResolver;

/// Result of a completed scan.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Canonical absolute root that was scanned.
    pub root: PathBuf,
    /// Aggregates. No folds are in flight once this is returned.
    pub store: AggregationStore,
    /// Timing and counters.
    pub metadata: RunMetadata,
    /// Entries dropped because they could not be read or stat'ed.
    pub skipped: u64,
}

/// Counters shared between the producer and the workers.
#[derive(Debug, Default)]
struct SharedCounters {
    bytes: AtomicU64,
    skipped: AtomicU64,
}

/// Concurrent scan-and-aggregate engine.
pub struct Scanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: Arc<AtomicBool>,
}

impl Scanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Flag that stops a running scan when set.
    ///
    /// The producer stops enumerating and workers drain the queue without
    /// folding. Folds already in progress complete.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Scan `config.root` and aggregate every file below it.
    ///
    /// Only failure to access the root is fatal. Entries that cannot be
    /// read are skipped.
    pub fn scan(
        &self,
        config: &ScanConfig,
        resolver: &dyn NameResolver,
    ) -> Result<ScanOutcome, ScanError> {
        if config.queue_factor == 0 {
            return Err(ScanError::InvalidConfig {
                message: "queue factor must be positive".to_string(),
            });
        }

        let root = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        let root_metadata = std::fs::metadata(&root).map_err(|e| ScanError::io(&root, e))?;
        if !root_metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }
        // Surface an unreadable root up front instead of silently producing
        // an empty tree.
        std::fs::read_dir(&root).map_err(|e| ScanError::io(&root, e))?;

        let workers = config.worker_count();
        let capacity = config.queue_capacity();
        debug!(root = %root.display(), workers, capacity, "starting scan");

        let metadata = RunMetadata::start();
        let started = Instant::now();
        let store = AggregationStore::new();
        let counters = SharedCounters::default();
        let (tx, rx) = bounded::<PathBuf>(capacity);

        let (dirs_scanned, files_scanned) = std::thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let root = root.as_path();
                let store = &store;
                let counters = &counters;
                let cancel = self.cancel.as_ref();
                scope.spawn(move || run_worker(rx, root, store, resolver, counters, cancel));
            }
            drop(rx);

            // Dropping the sender at the end of enumeration closes the queue.
            self.enumerate(&root, tx, &counters, started)
        });

        if self.cancel.load(Ordering::Relaxed) {
            debug!("scan interrupted");
            return Err(ScanError::Interrupted);
        }

        let skipped = counters.skipped.load(Ordering::Relaxed);
        debug!(
            dirs_scanned,
            files_scanned,
            skipped,
            directories = store.dir_count(),
            "scan complete"
        );

        Ok(ScanOutcome {
            root,
            store,
            metadata: metadata.finish(dirs_scanned, files_scanned),
            skipped,
        })
    }

    /// Depth-first enumeration. Returns (directories, files) visited.
    fn enumerate(
        &self,
        root: &Path,
        tx: Sender<PathBuf>,
        counters: &SharedCounters,
        started: Instant,
    ) -> (u64, u64) {
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(0);

        let mut dirs_scanned = 0u64;
        let mut files_scanned = 0u64;

        for entry_result in walker {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    trace!(path = ?err.path(), error = %err, "skipping unreadable entry");
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                dirs_scanned += 1;
                continue;
            }

            // Symlinks land here too and are attributed by their own size.
            files_scanned += 1;
            let path = entry.path();

            if files_scanned % PROGRESS_INTERVAL == 0 {
                let _ = self.progress_tx.send(ScanProgress {
                    files_scanned,
                    dirs_scanned,
                    bytes_scanned: counters.bytes.load(Ordering::Relaxed),
                    skipped: counters.skipped.load(Ordering::Relaxed),
                    current_path: path.clone(),
                    elapsed: started.elapsed(),
                });
            }

            if tx.send(path).is_err() {
                // Every worker is gone; nothing left to feed.
                break;
            }
        }

        (dirs_scanned, files_scanned)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan `root` with `concurrency` workers (0 = auto) using the system
/// user and group databases.
pub fn scan(root: impl Into<PathBuf>, concurrency: usize) -> Result<ScanOutcome, ScanError> {
    let config = ScanConfig {
        concurrency,
        ..ScanConfig::new(root)
    };
    Scanner::new().scan(&config, &SystemResolver::new())
}

fn run_worker(
    rx: Receiver<PathBuf>,
    root: &Path,
    store: &AggregationStore,
    resolver: &dyn NameResolver,
    counters: &SharedCounters,
    cancel: &AtomicBool,
) {
    let mut names = IdentityCache::default();

    for path in rx.iter() {
        if cancel.load(Ordering::Relaxed) {
            // Keep draining so the producer never blocks on a full queue.
            continue;
        }

        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "skipping file");
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
        let (uid, gid) = owner_ids(&metadata);
        let owner = names.user(uid, resolver);
        let group = names.group(gid, resolver);
        let dir = relative_dir(root, &path);

        store.fold(&dir, &owner, &group, size);
        counters.bytes.fetch_add(metadata.len(), Ordering::Relaxed);
    }
}

/// Per-worker memo of resolved identities.
#[derive(Default)]
struct IdentityCache {
    users: HashMap<u32, Identity>,
    groups: HashMap<u32, Identity>,
}

impl IdentityCache {
    fn user(&mut self, uid: u32, resolver: &dyn NameResolver) -> Identity {
        self.users
            .entry(uid)
            .or_insert_with(|| resolver.user_identity(uid))
            .clone()
    }

    fn group(&mut self, gid: u32, resolver: &dyn NameResolver) -> Identity {
        self.groups
            .entry(gid)
            .or_insert_with(|| resolver.group_identity(gid))
            .clone()
    }
}

/// Key of the directory containing `path`, relative to `root`.
///
/// Components are joined with `/` regardless of platform; files directly
/// in the root map to `"."`. Names that are not valid UTF-8 are converted
/// lossily, so two such siblings differing only in their invalid bytes
/// share one key, and ownership lookups on that key find no directory.
pub(crate) fn relative_dir(root: &Path, path: &Path) -> CompactString {
    let Some(parent) = path.parent() else {
        return CompactString::const_new(ROOT_KEY);
    };
    let Ok(rel) = parent.strip_prefix(root) else {
        return CompactString::const_new(ROOT_KEY);
    };

    let mut key = CompactString::default();
    for component in rel.components() {
        if let Component::Normal(name) = component {
            if !key.is_empty() {
                key.push('/');
            }
            let text = name.to_string_lossy();
            if matches!(text, Cow::Owned(_)) {
                trace!(path = %path.display(), "directory name is not UTF-8, key is lossy");
            }
            key.push_str(&text);
        }
    }

    if key.is_empty() {
        CompactString::const_new(ROOT_KEY)
    } else {
        key
    }
}
