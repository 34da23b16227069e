//! Streaming snapshot encoder.
//!
//! The document header is written first, then each array element is
//! serialized on its own, so peak memory stays at one entry regardless of
//! tree size. The bytes produced are identical to pretty-printing the whole
//! document at once, followed by a newline.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::info;

use crate::document::SnapshotOptions;
use crate::error::SnapshotError;
use crate::schema::SnapshotDocument;

const GZ_SUFFIX: &str = ".gz";

/// Where a snapshot is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotTarget {
    Stdout,
    File(PathBuf),
}

impl SnapshotTarget {
    /// Append `.gz` to file targets that lack it. Stdout is unchanged.
    pub fn with_gz_extension(self) -> Self {
        match self {
            Self::Stdout => Self::Stdout,
            Self::File(path) => Self::File(with_gz_extension(&path)),
        }
    }
}

impl FromStr for SnapshotTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(s))
        })
    }
}

impl fmt::Display for SnapshotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("<stdout>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Append `.gz` unless the file name already ends with it, ignoring case.
pub fn with_gz_extension(path: &Path) -> PathBuf {
    let already = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase().ends_with(GZ_SUFFIX))
        .unwrap_or(false);
    if already {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(GZ_SUFFIX);
    PathBuf::from(name)
}

/// Stream `doc` as indented JSON into `writer`.
///
/// The writer is not flushed; wrap unbuffered sinks in a `BufWriter`.
pub fn write_snapshot<W: Write>(doc: &SnapshotDocument, mut writer: W) -> io::Result<()> {
    writer.write_all(b"{\n  \"root\": ")?;
    serde_json::to_writer(&mut writer, &doc.root)?;
    writer.write_all(b",\n  \"stats\": ")?;
    serde_json::to_writer_pretty(Indented::new(&mut writer, "  "), &doc.stats)?;
    writer.write_all(b",\n")?;
    write_array(&mut writer, "dirs", &doc.dirs)?;
    writer.write_all(b",\n")?;
    write_array(&mut writer, "users", &doc.users)?;
    writer.write_all(b",\n")?;
    write_array(&mut writer, "groups", &doc.groups)?;
    writer.write_all(b"\n}\n")
}

/// Encode into an in-memory buffer.
pub fn to_vec(doc: &SnapshotDocument) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_snapshot(doc, &mut buf)?;
    Ok(buf)
}

/// Write `doc` to `target`, gzip-framed when `options.compress` is set.
///
/// The caller decides whether to add the `.gz` suffix to file targets.
/// File targets are staged in a temporary file next to the destination and
/// renamed into place only once fully written, so a failed write leaves any
/// existing file untouched and no partial file behind. Bytes already sent to
/// stdout cannot be taken back.
pub fn save_snapshot(
    doc: &SnapshotDocument,
    target: &SnapshotTarget,
    options: &SnapshotOptions,
) -> Result<(), SnapshotError> {
    let compress = options.compress;

    match target {
        SnapshotTarget::Stdout => {
            let stdout = io::stdout().lock();
            encode_into(doc, BufWriter::new(stdout), compress).map_err(|source| {
                SnapshotError::Write {
                    target: target.to_string(),
                    source,
                }
            })?;
        }
        SnapshotTarget::File(path) => {
            commit_to_file(path, |file| encode_into(doc, BufWriter::new(file), compress))?;
        }
    }

    info!(
        dest = %target,
        compress,
        dirs = doc.dirs.len(),
        users = doc.users.len(),
        groups = doc.groups.len(),
        "snapshot written"
    );
    Ok(())
}

/// Run `write` against a staged file in `path`'s directory, then rename it
/// over `path`. The staged file is removed if `write` or the rename fails.
fn commit_to_file(
    path: &Path,
    write: impl FnOnce(&File) -> io::Result<()>,
) -> Result<(), SnapshotError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".dirtally-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let staged = builder
        .tempfile_in(dir)
        .map_err(|source| SnapshotError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let write_err = |source: io::Error| SnapshotError::Write {
        target: path.display().to_string(),
        source,
    };
    write(staged.as_file()).map_err(write_err)?;
    staged.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn encode_into<W: Write>(doc: &SnapshotDocument, sink: W, compress: bool) -> io::Result<()> {
    if compress {
        let mut encoder = GzEncoder::new(sink, Compression::default());
        write_snapshot(doc, &mut encoder)?;
        encoder.finish()?.flush()
    } else {
        let mut sink = sink;
        write_snapshot(doc, &mut sink)?;
        sink.flush()
    }
}

fn write_array<W: Write, T: Serialize>(writer: &mut W, key: &str, items: &[T]) -> io::Result<()> {
    write!(writer, "  \"{key}\": ")?;
    if items.is_empty() {
        return writer.write_all(b"[]");
    }

    writer.write_all(b"[\n")?;
    let last = items.len() - 1;
    for (i, item) in items.iter().enumerate() {
        writer.write_all(b"    ")?;
        serde_json::to_writer_pretty(Indented::new(&mut *writer, "    "), item)?;
        if i != last {
            writer.write_all(b",")?;
        }
        writer.write_all(b"\n")?;
    }
    writer.write_all(b"  ]")
}

/// Inserts `pad` after every newline written through it.
///
/// Nested values are pretty-printed at depth zero and shifted right to the
/// depth they occupy in the document.
struct Indented<'a, W> {
    inner: &'a mut W,
    pad: &'static str,
    at_line_start: bool,
}

impl<'a, W: Write> Indented<'a, W> {
    fn new(inner: &'a mut W, pad: &'static str) -> Self {
        Self {
            inner,
            pad,
            at_line_start: false,
        }
    }
}

impl<W: Write> Write for Indented<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in buf.split_inclusive(|&b| b == b'\n') {
            if self.at_line_start {
                self.inner.write_all(self.pad.as_bytes())?;
                self.at_line_start = false;
            }
            self.inner.write_all(line)?;
            if line.ends_with(b"\n") {
                self.at_line_start = true;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
