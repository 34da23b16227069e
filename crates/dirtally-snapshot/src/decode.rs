//! Sniffing snapshot decoder.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::PathBuf;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use tracing::info;

use crate::error::SnapshotError;
use crate::schema::SnapshotDocument;

/// Leading bytes of a gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where a snapshot is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    Stdin,
    File(PathBuf),
}

impl FromStr for SnapshotSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(s))
        })
    }
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// True when `prefix` starts with the gzip magic number.
pub fn is_gzip(prefix: &[u8]) -> bool {
    prefix.starts_with(&GZIP_MAGIC)
}

/// Decode a snapshot from any byte stream, decompressing when the stream
/// starts with gzip framing.
///
/// The reader is never seeked. The sniffed bytes are replayed ahead of the
/// rest of the stream.
pub fn read_snapshot<R: Read>(mut reader: R) -> Result<SnapshotDocument, SnapshotError> {
    let prefix = sniff_prefix(&mut reader).map_err(|source| SnapshotError::Read { source })?;
    let compressed = is_gzip(&prefix);
    let replay = Cursor::new(prefix).chain(reader);

    let result = if compressed {
        serde_json::from_reader(BufReader::new(MultiGzDecoder::new(replay)))
    } else {
        serde_json::from_reader(BufReader::new(replay))
    };
    result.map_err(|err| SnapshotError::from_decode(err, compressed))
}

/// Open and decode a snapshot.
pub fn load_snapshot(source: &SnapshotSource) -> Result<SnapshotDocument, SnapshotError> {
    let doc = match source {
        SnapshotSource::Stdin => read_snapshot(io::stdin().lock())?,
        SnapshotSource::File(path) => {
            let file = File::open(path).map_err(|source| SnapshotError::Open {
                path: path.clone(),
                source,
            })?;
            read_snapshot(file)?
        }
    };

    info!(
        source = %source,
        root = %doc.root,
        dirs = doc.dirs.len(),
        "snapshot loaded"
    );
    Ok(doc)
}

/// Read up to two bytes, tolerating short reads from pipes.
fn sniff_prefix<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; GZIP_MAGIC.len()];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(prefix[..filled].to_vec())
}
