//! Common error types for fftiers

use std::path::PathBuf;

use thiserror::Error;

/// Common result type for fftiers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the fftiers crates
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
