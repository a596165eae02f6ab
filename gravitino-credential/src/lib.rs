//! Temporary storage credential vending for Gravitino.
//!
//! This crate models storage credentials for S3, GCS and OSS, produces them
//! through pluggable providers, and caches the preferred one per resource
//! with lazy refresh ahead of expiry.
//!
//! # Architecture
//!
//! - [`credential`] - the [`Credential`] sum type and its property-map form
//! - [`provider`] - [`CredentialProvider`] implementations (static keys, session tokens)
//! - [`selector`] - dynamic-before-static candidate selection
//! - [`source`] - [`CredentialSource`] / [`CredentialResolver`] seams
//! - [`refresher`] - the per-resource cache with single-flight refresh
//! - [`iceberg`] - conversion into Iceberg client properties
//!
//! # Example
//!
//! ```ignore
//! use gravitino_credential::{
//!     create_provider, CredentialRefresher, CredentialSelector, ProviderCredentialSource,
//!     RefresherConfig, StorageBackend,
//! };
//!
//! let provider = create_provider(StorageBackend::S3, "s3-secret-key", &props, None)?;
//! let source = ProviderCredentialSource::read_only(vec![provider]);
//! let refresher = CredentialRefresher::new(
//!     Arc::new(source),
//!     CredentialSelector::new(StorageBackend::S3),
//!     None,
//!     RefresherConfig::default(),
//! )?;
//! let credential = refresher.get_active_credential("s3://bucket/warehouse/db/tbl").await?;
//! ```

pub mod clock;
pub mod context;
pub mod credential;
pub mod error;
pub mod iceberg;
pub mod keys;
pub mod provider;
pub mod refresher;
pub mod selector;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AccessIntent, CredentialContext};
pub use credential::{
    Credential, CredentialKind, GcsTokenCredential, OssSecretKeyCredential, OssTokenCredential,
    S3SecretKeyCredential, S3TokenCredential, StorageBackend,
};
pub use error::{CredentialError, Result};
pub use iceberg::to_iceberg_properties;
pub use provider::{
    create_provider, static_fallback_credential, CredentialProvider, IssuedToken,
    NoCredentialProvider, OssSecretKeyProvider, S3SecretKeyProvider, SessionTokenIssuer,
    SessionTokenProvider, TokenRequest, NO_CREDENTIAL_PROVIDER,
};
pub use refresher::{CacheState, CachedCredentialEntry, CredentialRefresher, RefresherConfig};
pub use selector::CredentialSelector;
pub use source::{ContextResolver, CredentialResolver, CredentialSource, ProviderCredentialSource};
