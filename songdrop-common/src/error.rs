//! Common error types for songdrop

use thiserror::Error;

/// Common result type for songdrop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by songdrop crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
