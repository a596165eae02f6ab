//! Error types for the storage access context.

use gravitino_credential::CredentialError;
use gravitino_metadata_cache::MetadataCacheError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    /// Invalid or incomplete configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading the configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`AccessConfig`](crate::AccessConfig).
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    MetadataCache(#[from] MetadataCacheError),
}

impl AccessError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether no usable credential could be produced.
    pub fn is_credential_unavailable(&self) -> bool {
        matches!(self, Self::Credential(CredentialError::Unavailable(_)))
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
