//! Error types for context operations

use thiserror::Error;

use crate::client_log::ReaderError;
use crate::storage::{CheckpointError, StoreError};

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),
}

/// Errors that stop the tracking pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("log reader failed")]
    Reader(#[from] ReaderError),

    #[error("store unavailable")]
    Store(#[from] StoreError),

    #[error("stat checkpoint failed")]
    Checkpoint(#[from] CheckpointError),

    #[error("tracking worker panicked or was cancelled")]
    Join(#[from] tokio::task::JoinError),

    #[error("log file {0} does not exist")]
    MissingLogFile(String),
}
