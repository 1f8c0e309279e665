//! Errors surfaced by the headless runner.

use thiserror::Error;

use eco_core::error::EcoError;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Anything that can stop a headless command.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// Simulation-side failure (config, codec).
    #[error(transparent)]
    Core(#[from] EcoError),

    /// Filesystem or stdio failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    /// Worker pool could not be built.
    #[error("Failed to build worker pool: {0}")]
    Pool(String),
}
