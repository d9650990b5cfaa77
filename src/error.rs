use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

// Unified error type for collate-io

#[derive(Error, Debug)]
pub enum CollateError {
    #[error("formatting failed: {0}")]
    Format(#[from] FormatError),
    #[error("size negotiation failed on rank {rank}: {reason}")]
    Negotiation { rank: usize, reason: String },
    #[error("cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record of {len} bytes does not fit a record type of width {width}")]
    RecordOverflow { len: usize, width: usize },
    #[error("view for rank {rank} already holds its record")]
    ViewExhausted { rank: usize },
    #[error("another rank failed during {stage}; collated file is not usable")]
    PeerWriteFailed { stage: &'static str },
    #[error("parallel backend error: {0}")]
    Backend(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CollateError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollateError::FileAccess { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, CollateError>;
