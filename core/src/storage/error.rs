//! Error types for durable storage

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the activity/stat/roster store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create data directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reading or writing the stat checkpoint file
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write checkpoint {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint {path} has no bookmark line")]
    MissingBookmark { path: PathBuf },
}
