//! Error types for the extraction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading corpora, building tables or exporting results
#[derive(Debug, Error)]
pub enum CollocError {
    #[error("failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid TSV row at line {line}: {message}")]
    InvalidRow { line: u64, message: String },
}

/// Reasons a cache artifact is refused
///
/// Every variant except `Io`/`Encode` means "recompute"; none of them is
/// ever turned into a partially trusted payload.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache artifact {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("cache artifact {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("cache artifact {} has schema version {found}, expected {expected}", path.display())]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("cache artifact {} holds {found}, expected {expected}", path.display())]
    KindMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("cache artifact {} was built from a different corpus snapshot", path.display())]
    SnapshotMismatch { path: PathBuf },

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode cache artifact: {0}")]
    Encode(#[source] bincode::Error),
}

pub type Result<T, E = CollocError> = std::result::Result<T, E>;
