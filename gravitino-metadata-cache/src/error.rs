//! Error types for the table metadata cache.

use thiserror::Error;

/// Errors from metadata parsing, identifiers and location probes.
#[derive(Debug, Error)]
pub enum MetadataCacheError {
    /// Invalid configuration or identifier.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Table metadata could not be parsed.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// The authoritative metadata location could not be determined.
    ///
    /// Internal to the cache; a lookup that hits this is treated as a miss.
    #[error("Probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// The metastore call failed or the table does not exist.
    #[error("Metastore error: {0}")]
    Metastore(String),
}

impl MetadataCacheError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn probe_unavailable(msg: impl Into<String>) -> Self {
        Self::ProbeUnavailable(msg.into())
    }

    pub fn metastore(msg: impl Into<String>) -> Self {
        Self::Metastore(msg.into())
    }
}

impl From<serde_json::Error> for MetadataCacheError {
    fn from(err: serde_json::Error) -> Self {
        MetadataCacheError::Metadata(format!("JSON parse error: {}", err))
    }
}

/// Result type for metadata cache operations.
pub type Result<T> = std::result::Result<T, MetadataCacheError>;
