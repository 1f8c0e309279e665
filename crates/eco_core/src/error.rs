//! Error types for the ecosystem simulation.
//!
//! The simulation loop itself never fails: missing entities are skipped and
//! numeric state saturates. Errors only surface at the edges, when loading
//! configuration, encoding snapshots, or applying them on the consumer side.

use thiserror::Error;

/// Result type alias using [`EcoError`].
pub type Result<T> = std::result::Result<T, EcoError>;

/// Top-level error type for the simulation crate.
#[derive(Debug, Error)]
pub enum EcoError {
    /// Configuration values failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to parse config file '{path}': {message}")]
    ConfigParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Snapshot codec error: {0}")]
    Codec(String),

    /// A delta arrived that does not continue the mirror's current state.
    #[error("Snapshot sequence gap: expected base {expected}, received base {received}")]
    SequenceGap {
        /// Sequence number the mirror last applied.
        expected: u64,
        /// Base sequence carried by the rejected delta.
        received: u64,
    },

    /// A delta arrived before any full snapshot.
    #[error("Delta received without a full baseline")]
    MissingBaseline,

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u32),
}
