//! Error types for Mist

use thiserror::Error;

/// The main error type for Mist operations.
///
/// Shader compilation failures have their own richer type in the GPU
/// layer (`ShaderError`); this enum only carries the host-side failures.
#[derive(Debug, Error)]
pub enum MistError {
    #[error("Config parse error: {0}")]
    ConfigError(String),
}

/// Result type alias using MistError
pub type Result<T> = std::result::Result<T, MistError>;
