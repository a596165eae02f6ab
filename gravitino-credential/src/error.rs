//! Error types for credential vending.

use thiserror::Error;

/// Errors from credential construction, providers and the refresher.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Missing or blank static configuration. Fatal at initialization.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential was constructed with missing or blank required fields.
    ///
    /// Indicates a bug in the caller or provider; never converted into a
    /// fallback by the refresher.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// No usable credential could be produced.
    #[error("Credential unavailable: {0}")]
    Unavailable(String),

    /// The external credential source failed.
    #[error("Credential source error: {0}")]
    Source(String),

    /// An external call did not complete within the configured bound.
    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

impl CredentialError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Whether this error reports a malformed credential.
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, Self::InvalidCredential(_))
    }
}

/// Result type for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;
