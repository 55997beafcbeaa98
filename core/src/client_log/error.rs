//! Error types for Client.txt parsing and reading

use std::path::PathBuf;
use thiserror::Error;

/// Errors while extracting a positional field from a classified line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid timestamp at line {line_number}: {segment}")]
    InvalidTimestamp { line_number: u64, segment: String },

    #[error("missing field '{field}' in line: {line}")]
    MissingField { field: &'static str, line: String },

    #[error("invalid number for '{field}': {value}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Errors during log file reading operations
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open log file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory map file {path}")]
    MemoryMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to seek in file {path}")]
    Seek {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
