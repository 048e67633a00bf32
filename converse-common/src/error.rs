//! Error types for the Converse gateway.

use thiserror::Error;

/// Result type alias using the Converse error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Startup errors shared by the Converse crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
