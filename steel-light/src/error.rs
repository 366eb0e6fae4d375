//! Errors surfaced by the lighting crate.

use std::io;

use thiserror::Error;

/// Errors produced while loading light data or configuration.
#[derive(Debug, Error)]
pub enum LightError {
    /// A persisted or received section did not have the packed nibble length.
    #[error("light layer must be {expected} bytes, got {actual}")]
    InvalidLayerLength {
        /// The required byte length.
        expected: usize,
        /// The byte length that was supplied.
        actual: usize,
    },
    /// The config file could not be read or written.
    #[error("config io error: {0}")]
    ConfigIo(#[from] io::Error),
    /// The config file is not valid json5 for [`crate::config::LightConfig`].
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json5::Error),
    /// The config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
