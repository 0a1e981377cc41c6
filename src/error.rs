//! Error types for the playback session and the state store.

use thiserror::Error;

/// Failures surfaced by catalog and session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the catalog is empty")]
    EmptyCatalog,

    #[error("track index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("a track with id {0:?} already exists")]
    DuplicateId(String),
}

/// Failures while reading or writing the state file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode state: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("could not decode state: {0}")]
    Decode(#[from] toml::de::Error),
}
