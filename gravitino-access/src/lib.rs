//! Storage access for Gravitino catalogs.
//!
//! Ties credential vending ([`gravitino_credential`]) and the table metadata
//! cache ([`gravitino_metadata_cache`]) together behind one explicitly
//! constructed [`StorageAccessContext`], configured from an [`AccessConfig`].
//!
//! # Example
//!
//! ```ignore
//! use gravitino_access::{telemetry, AccessConfig, StorageAccessContext};
//! use gravitino_metadata_cache::HiveMetadataLocationProbe;
//!
//! telemetry::init_logging(&telemetry::TelemetryConfig::default());
//!
//! let config = AccessConfig::from_file("/etc/gravitino/access.json")?;
//! let probe = Arc::new(HiveMetadataLocationProbe::new("hive", metastore));
//! let context: StorageAccessContext = StorageAccessContext::builder(config)
//!     .with_issuer(sts)
//!     .build(probe)?;
//!
//! let credential = context.get_active_credential("s3://lake/warehouse/db/tbl").await?;
//! ```

pub mod config;
pub mod config_value;
pub mod context;
pub mod error;
pub mod sink;
pub mod telemetry;

pub use config::AccessConfig;
pub use config_value::ConfigValue;
pub use context::{StorageAccessContext, StorageAccessContextBuilder};
pub use error::{AccessError, Result};
pub use sink::{
    GcsAccessToken, GcsAccessTokenSource, OssCredentialsSource, S3CredentialsSource, StorageKeys,
};
