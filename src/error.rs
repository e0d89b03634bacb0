// Error types for alio
// Engine failures are recoverable and get logged; sequence errors are caller bugs

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning the music directory into albums.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read music directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("no albums found under {0}")]
    NoAlbums(PathBuf),
}

/// Anything the playback engine reports back.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("engine query failed: {0}")]
    Query(String),

    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("track index {index} out of range (sequence has {len} tracks)")]
    OutOfRange { index: usize, len: usize },

    #[error("track index {found} breaks the sequence, expected {expected}")]
    NonContiguous { expected: usize, found: usize },
}

/// Contract violations on transport commands. Engine trouble never shows up here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("album has no tracks to play")]
    EmptySequence,

    #[error("player is shutting down")]
    ShutDown,
}
