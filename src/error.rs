//! Error types for quickref
//!
//! Provides standardized error handling across the crate.

use thiserror::Error;

/// Errors that can occur in the palette core
#[derive(Debug, Error)]
pub enum PaletteError {
    /// Document-store access errors (enumeration, record lookup)
    #[error("document store error: {0}")]
    Store(String),

    /// Index build errors that abort a whole rebuild
    #[error("index error: {0}")]
    Index(String),

    /// Command lookup or execution errors
    #[error("command error: {0}")]
    Command(String),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for palette operations
pub type PaletteResult<T> = Result<T, PaletteError>;
