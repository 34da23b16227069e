//! Error types for snapshot encoding and decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while writing or reading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be opened or created.
    #[error("Cannot open snapshot {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The byte source failed while reading.
    #[error("Failed to read snapshot: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// Gzip framing was detected but the stream could not be inflated.
    #[error("Failed to decompress snapshot: {source}")]
    Decompress {
        #[source]
        source: std::io::Error,
    },

    /// The payload is not valid JSON or violates the document schema.
    #[error("Malformed snapshot: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    /// The sink failed while writing.
    #[error("Failed to write snapshot to {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    /// Classify a decoder error. I/O failures inside a gzip stream are
    /// decompression errors; everything serde rejects is malformed.
    pub(crate) fn from_decode(err: serde_json::Error, compressed: bool) -> Self {
        if !err.is_io() {
            return Self::Malformed { source: err };
        }
        let source = std::io::Error::from(err);
        if compressed {
            Self::Decompress { source }
        } else {
            Self::Read { source }
        }
    }
}
