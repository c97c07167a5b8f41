//! Common error types for hwlit

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for hwlit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by every pipeline stage
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error for a record collection
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required input file does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}
