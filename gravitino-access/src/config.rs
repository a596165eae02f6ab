//! Storage access configuration.
//!
//! Loaded once at startup from JSON with kebab-case keys:
//!
//! ```json
//! {
//!   "storage-backend": "s3",
//!   "catalog-name": "lakehouse",
//!   "credential-providers": ["s3-token", "s3-secret-key"],
//!   "credential-properties": {
//!     "s3-role-arn": "arn:aws:iam::123456789012:role/lakehouse",
//!     "s3-access-key-id": {"env_var": "LAKE_S3_ACCESS_KEY_ID"},
//!     "s3-secret-access-key": {"env_var": "LAKE_S3_SECRET_ACCESS_KEY"}
//!   },
//!   "expiry-factor": 0.9,
//!   "credential-cache-capacity": 1024,
//!   "call-timeout-ms": 10000
//! }
//! ```
//!
//! The same `credential-properties` feed the providers and the static
//! fallback credential.

use crate::config_value::ConfigValue;
use crate::error::{AccessError, Result};
use gravitino_credential::{CredentialKind, RefresherConfig, StorageBackend, NO_CREDENTIAL_PROVIDER};
use gravitino_metadata_cache::MetadataCacheConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

fn default_expiry_factor() -> f64 {
    gravitino_credential::refresher::DEFAULT_EXPIRY_FACTOR
}

fn default_credential_cache_capacity() -> usize {
    gravitino_credential::refresher::DEFAULT_CAPACITY
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccessConfig {
    pub storage_backend: StorageBackend,

    /// Name of the catalog the metadata cache serves (used in logs and probes).
    #[serde(default)]
    pub catalog_name: Option<String>,

    /// Provider type names, in the order candidates are collected.
    #[serde(default)]
    pub credential_providers: Vec<String>,

    #[serde(default)]
    pub credential_properties: HashMap<String, ConfigValue>,

    #[serde(default = "default_expiry_factor")]
    pub expiry_factor: f64,

    #[serde(default = "default_credential_cache_capacity")]
    pub credential_cache_capacity: usize,

    /// `None` keeps every table.
    #[serde(default)]
    pub metadata_cache_capacity: Option<usize>,

    /// Bound on credential source and metadata probe calls.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl AccessConfig {
    /// Config for `backend` with defaults and no providers.
    pub fn new(storage_backend: StorageBackend) -> Self {
        Self {
            storage_backend,
            catalog_name: None,
            credential_providers: Vec::new(),
            credential_properties: HashMap::new(),
            expiry_factor: default_expiry_factor(),
            credential_cache_capacity: default_credential_cache_capacity(),
            metadata_cache_capacity: None,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }

    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AccessError::config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.refresher_config().validate()?;

        if self.metadata_cache_capacity == Some(0) {
            return Err(AccessError::config("metadata-cache-capacity must be > 0"));
        }

        for name in &self.credential_providers {
            if name == NO_CREDENTIAL_PROVIDER {
                continue;
            }
            let kind: CredentialKind = name.parse().map_err(|_| {
                AccessError::config(format!("Unknown credential provider '{}'", name))
            })?;
            if kind.backend() != self.storage_backend {
                return Err(AccessError::config(format!(
                    "Credential provider '{}' does not serve storage backend '{}'",
                    name, self.storage_backend
                )));
            }
        }
        Ok(())
    }

    /// Resolve every credential property once, reading the environment.
    pub fn resolve_properties(&self) -> Result<HashMap<String, String>> {
        self.credential_properties
            .iter()
            .map(|(key, value)| {
                let resolved = value.resolve().map_err(|e| {
                    AccessError::config(format!("Property '{}': {}", key, e))
                })?;
                Ok((key.clone(), resolved))
            })
            .collect()
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn refresher_config(&self) -> RefresherConfig {
        RefresherConfig {
            expiry_factor: self.expiry_factor,
            capacity: self.credential_cache_capacity,
            call_timeout: self.call_timeout(),
        }
    }

    pub fn metadata_cache_config(&self) -> MetadataCacheConfig {
        MetadataCacheConfig {
            capacity: self.metadata_cache_capacity,
            probe_timeout: self.call_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AccessConfig::from_json_str(r#"{"storage-backend": "oss"}"#).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Oss);
        assert_eq!(config.expiry_factor, 0.9);
        assert_eq!(config.credential_cache_capacity, 1024);
        assert_eq!(config.metadata_cache_capacity, None);
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert!(config.credential_providers.is_empty());
    }

    #[test]
    fn test_rejects_bad_tuning() {
        for json in [
            r#"{"storage-backend": "s3", "expiry-factor": 0}"#,
            r#"{"storage-backend": "s3", "expiry-factor": 1.2}"#,
            r#"{"storage-backend": "s3", "credential-cache-capacity": 0}"#,
            r#"{"storage-backend": "s3", "metadata-cache-capacity": 0}"#,
            r#"{"storage-backend": "s3", "call-timeout-ms": 0}"#,
        ] {
            assert!(AccessConfig::from_json_str(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_rejects_provider_for_other_backend() {
        let err = AccessConfig::from_json_str(
            r#"{"storage-backend": "gcs", "credential-providers": ["s3-token"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AccessError::Config(_)));

        let err = AccessConfig::from_json_str(
            r#"{"storage-backend": "gcs", "credential-providers": ["azure-sas"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AccessError::Config(_)));
    }

    #[test]
    fn test_unknown_backend_is_json_error() {
        let err = AccessConfig::from_json_str(r#"{"storage-backend": "hdfs"}"#).unwrap_err();
        assert!(matches!(err, AccessError::Json(_)));
    }

    #[test]
    fn test_resolve_properties() {
        let config = AccessConfig::from_json_str(
            r#"{
                "storage-backend": "s3",
                "credential-providers": ["s3-secret-key", "none"],
                "credential-properties": {
                    "s3-access-key-id": "AKIA",
                    "s3-secret-access-key": {
                        "env_var": "GRAVITINO_CFG_UNSET_1",
                        "default_val": "dflt"
                    }
                }
            }"#,
        )
        .unwrap();
        let props = config.resolve_properties().unwrap();
        assert_eq!(props["s3-access-key-id"], "AKIA");
        assert_eq!(props["s3-secret-access-key"], "dflt");

        let mut missing = config.clone();
        missing.credential_properties.insert(
            "s3-role-arn".to_string(),
            ConfigValue::from_env("GRAVITINO_CFG_UNSET_2"),
        );
        assert!(missing.resolve_properties().is_err());
    }
}
