//! Error types for cari-core

use std::io;
use std::path::PathBuf;

use crate::DocId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read document {}: {reason}", .path.display())]
    DocumentRead { path: PathBuf, reason: String },

    #[error("Document is empty: {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("Unsupported document format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Duplicate document id: {0}")]
    DuplicateDocument(DocId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Corrupt snapshot at {}: {reason}", .path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
