//! dirtally - per-directory, per-user and per-group disk usage.
//!
//! Usage:
//!   dirtally [PATH]                      Scan and print the tree and summaries
//!   dirtally --json out.json [PATH]      Scan and write a snapshot
//!   dirtally --json out --gzip [PATH]    Write a gzip snapshot (out.gz)
//!   dirtally --load out.gz               Render a saved snapshot
//!   dirtally --help                      Show help

mod render;

use std::path::PathBuf;
use std::thread;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dirtally_core::{ScanConfig, WidthOverrides};
use dirtally_scan::{ScanOutcome, Scanner, SystemResolver};
use dirtally_snapshot::{
    SnapshotDocument, SnapshotOptions, SnapshotSource, SnapshotTarget, load_snapshot,
    save_snapshot,
};

use crate::render::{RenderOptions, Report};

#[derive(Parser)]
#[command(
    name = "dirtally",
    version,
    about = "Per-directory, per-user and per-group disk usage",
    long_about = "dirtally walks a directory tree with concurrent workers and totals the \
                  size and file count of every directory, plus totals per owning user and \
                  group.\n\nResults can be saved as a JSON snapshot (optionally gzip \
                  compressed) and rendered later with --load without re-scanning."
)]
struct Cli {
    /// Root directory to analyze
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Directory levels to display (0 shows only the root)
    #[arg(short = 'L', long, default_value_t = 2)]
    levels: usize,

    /// Show the number of files per directory
    #[arg(short, long)]
    files: bool,

    /// Show the owning user of each directory
    #[arg(short, long)]
    user: bool,

    /// Show the owning group of each directory
    #[arg(short, long)]
    group: bool,

    /// Print sizes in bytes instead of human-readable units
    #[arg(short, long)]
    bytes: bool,

    /// Override the size column width (0 = auto-fit)
    #[arg(long, default_value_t = 0)]
    size_width: usize,

    /// Override the files column width (0 = auto-fit)
    #[arg(long, default_value_t = 0)]
    files_width: usize,

    /// Limit per-user and per-group summaries to the N largest (0 = all)
    #[arg(short = 'n', long, default_value_t = 0)]
    top: usize,

    /// Number of stat workers (0 = twice the available parallelism)
    #[arg(short, long, default_value_t = 0)]
    concurrency: usize,

    /// Write a JSON snapshot to FILE, or '-' for stdout, instead of rendering
    #[arg(long, value_name = "FILE|-")]
    json: Option<SnapshotTarget>,

    /// Gzip the snapshot, appending .gz to the file name if missing
    #[arg(short = 'z', long, requires = "json")]
    gzip: bool,

    /// Read a snapshot from FILE, or '-' for stdin, instead of scanning
    #[arg(long, value_name = "FILE|-")]
    load: Option<SnapshotSource>,

    /// Print scan progress to stderr
    #[arg(short, long)]
    progress: bool,

    /// Enable debug logging
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Where the aggregates came from.
enum Source {
    Scanned(ScanOutcome),
    Loaded(SnapshotDocument),
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let resolver = SystemResolver::new();
    let options = SnapshotOptions::new(env!("CARGO_PKG_VERSION")).with_compression(cli.gzip);

    let source = match &cli.load {
        Some(input) => Source::Loaded(
            load_snapshot(input).wrap_err_with(|| format!("Failed to load snapshot {input}"))?,
        ),
        None => Source::Scanned(run_scan(&cli, &resolver)?),
    };

    let (root, aggregates) = match &source {
        Source::Scanned(outcome) => (outcome.root.clone(), outcome.store.snapshot()),
        Source::Loaded(doc) => (doc.root_path(), doc.to_aggregates()),
    };

    if let Some(target) = &cli.json {
        let target = if cli.gzip {
            target.clone().with_gz_extension()
        } else {
            target.clone()
        };
        let doc = match source {
            Source::Loaded(doc) => doc,
            Source::Scanned(outcome) => SnapshotDocument::from_aggregates(
                &outcome.root,
                &aggregates,
                &outcome.metadata,
                &resolver,
                &options,
            ),
        };
        save_snapshot(&doc, &target, &options)
            .wrap_err_with(|| format!("Failed to write snapshot to {target}"))?;
        if target != SnapshotTarget::Stdout {
            eprintln!("Snapshot written to {target}");
        }
        return Ok(());
    }

    let render_options = RenderOptions {
        levels: cli.levels,
        show_files: cli.files,
        show_user: cli.user,
        show_group: cli.group,
        raw_bytes: cli.bytes,
        top: cli.top,
        widths: WidthOverrides {
            size: cli.size_width,
            files: cli.files_width,
        },
    };

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    Report::new(&root, &aggregates, &resolver, &render_options)
        .write_to(&mut out)
        .context("Failed to write report")?;

    Ok(())
}

/// Run a scan of `cli.root`, optionally printing progress.
fn run_scan(cli: &Cli, resolver: &SystemResolver) -> Result<ScanOutcome> {
    let config = ScanConfig::builder()
        .root(cli.root.clone())
        .concurrency(cli.concurrency)
        .build()
        .context("Invalid scan configuration")?;

    let scanner = Scanner::new();
    let progress = cli.progress.then(|| {
        let mut rx = scanner.subscribe();
        thread::spawn(move || {
            loop {
                match rx.blocking_recv() {
                    Ok(p) => eprint!(
                        "\rScanned {} files in {} directories, {} ({:.0} files/s)",
                        p.files_scanned,
                        p.dirs_scanned,
                        humansize::format_size(p.bytes_scanned, humansize::BINARY),
                        p.files_per_second()
                    ),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let outcome = scanner
        .scan(&config, resolver)
        .wrap_err_with(|| format!("Scan of {} failed", cli.root.display()))?;

    // Dropping the scanner closes the progress channel.
    drop(scanner);
    if let Some(handle) = progress {
        let _ = handle.join();
        eprintln!();
    }

    let root = outcome.store.dir_totals(dirtally_core::ROOT_KEY).unwrap_or_default();
    eprintln!(
        "Scanned {} - {} in {} files, {} directories ({})",
        outcome.root.display(),
        humansize::format_size(root.size.max(0) as u64, humansize::BINARY),
        outcome.metadata.files_scanned,
        outcome.metadata.dirs_scanned,
        outcome.metadata.runtime_display(),
    );
    if outcome.skipped > 0 {
        eprintln!("{} entries could not be read and were skipped", outcome.skipped);
    }
    debug!(skipped = outcome.skipped, "scan finished");

    Ok(outcome)
}

fn setup_logging(verbose: u8) {
    let default = if verbose > 0 {
        "dirtally=debug,warn"
    } else {
        "dirtally=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
