//! # Configuration Error Types
//!
//! Everything that can go wrong while loading a [`StreamingConfig`] or a
//! [`BlockRegistry`] at startup.
//!
//! [`StreamingConfig`]: crate::config::StreamingConfig
//! [`BlockRegistry`]: crate::block::BlockRegistry

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The block palette is malformed.
    #[error("invalid block palette: {0}")]
    InvalidPalette(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
