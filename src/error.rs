//! Error types for chatdown operations.

use thiserror::Error;

/// Errors that can occur while converting a chat export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The bytes are not recognizably HTML (empty, binary, or tagless).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Parsing succeeded but no conversation turn was identified.
    #[error("no conversation turns found in document")]
    NoTurnsFound,

    /// The declared or detected character encoding cannot be decoded.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// A signature rule file could not be read.
    #[error("invalid extraction rules: {0}")]
    InvalidRules(String),
}

pub type Result<T> = std::result::Result<T, Error>;
