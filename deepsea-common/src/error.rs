//! Common error types for Deepsea

use thiserror::Error;

/// Common result type for Deepsea operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Deepsea services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input data (dataset files, request parameters)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
