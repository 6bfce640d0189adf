//! Error types for the scaling core library.

use thiserror::Error;

/// Top-level error type for all scaling operations.
///
/// Nothing that touches a difficulty value returns this: values are clamped,
/// never rejected. Errors only surface from loading configuration, compiling
/// formulas and talking to the save database.
#[derive(Error, Debug)]
pub enum ScalingError {
    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A mutator formula failed to compile.
    #[error("Formula error at offset {offset}: {message} (in `{source_text}`)")]
    Formula {
        /// The formula text as written in the config.
        source_text: String,
        /// Byte offset of the offending token.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// `SQLite` persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ScalingError>;
