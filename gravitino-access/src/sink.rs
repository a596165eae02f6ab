//! Storage SDK credential adapters.
//!
//! Object store clients ask for credentials through their own provider
//! hooks. These adapters answer those hooks from a [`CredentialResolver`] for
//! one fixed resource, converting the vended [`Credential`] into the shape
//! each SDK expects.
//!
//! # Example
//!
//! ```ignore
//! let resolver: Arc<dyn CredentialResolver> = context.credential_resolver();
//! let source = S3CredentialsSource::new("s3://lake/warehouse/db/tbl", resolver);
//!
//! // inside the SDK's credential callback
//! let keys = source.credentials().await?;
//! ```

use chrono::{DateTime, Utc};
use gravitino_credential::{Credential, CredentialError, CredentialResolver, Result};
use std::sync::Arc;

/// An OAuth2 access token for GCS clients.
#[derive(Clone, PartialEq, Eq)]
pub struct GcsAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for GcsAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsAccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Access key material for S3 and OSS clients.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Session token (S3) or security token (OSS); `None` for static keys.
    pub session_token: Option<String>,
    /// `None` for static keys.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for StorageKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("has_session_token", &self.session_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn expiry(expire_time_ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(expire_time_ms).ok_or_else(|| {
        CredentialError::invalid(format!("expiry {} ms is out of range", expire_time_ms))
    })
}

fn mismatched(resource: &str, expected: &str, credential: &Credential) -> CredentialError {
    CredentialError::unavailable(format!(
        "Resolved {} credential for '{}', but a {} credential is required",
        credential.kind(),
        resource,
        expected
    ))
}

/// Shared state of every adapter: which resource to ask for, and whom.
#[derive(Debug, Clone)]
struct Binding {
    resource: String,
    resolver: Arc<dyn CredentialResolver>,
}

impl Binding {
    async fn resolve(&self) -> Result<Credential> {
        self.resolver.resolve(&self.resource).await
    }

    fn invalidate(&self) {
        self.resolver.invalidate(&self.resource);
    }
}

/// Supplies GCS access tokens.
#[derive(Debug, Clone)]
pub struct GcsAccessTokenSource {
    binding: Binding,
}

impl GcsAccessTokenSource {
    pub fn new(resource: impl Into<String>, resolver: Arc<dyn CredentialResolver>) -> Self {
        Self {
            binding: Binding {
                resource: resource.into(),
                resolver,
            },
        }
    }

    pub async fn access_token(&self) -> Result<GcsAccessToken> {
        match self.binding.resolve().await? {
            Credential::GcsToken(c) => Ok(GcsAccessToken {
                token: c.token().to_string(),
                expires_at: expiry(c.expire_time_ms())?,
            }),
            other => Err(mismatched(&self.binding.resource, "gcs-token", &other)),
        }
    }

    /// Forget the cached token, e.g. after the store rejected it.
    pub fn invalidate(&self) {
        self.binding.invalidate();
    }
}

/// Supplies S3 access keys, static or session-scoped.
#[derive(Debug, Clone)]
pub struct S3CredentialsSource {
    binding: Binding,
}

impl S3CredentialsSource {
    pub fn new(resource: impl Into<String>, resolver: Arc<dyn CredentialResolver>) -> Self {
        Self {
            binding: Binding {
                resource: resource.into(),
                resolver,
            },
        }
    }

    pub async fn credentials(&self) -> Result<StorageKeys> {
        match self.binding.resolve().await? {
            Credential::S3SecretKey(c) => Ok(StorageKeys {
                access_key_id: c.access_key_id().to_string(),
                secret_access_key: c.secret_access_key().to_string(),
                session_token: None,
                expires_at: None,
            }),
            Credential::S3Token(c) => Ok(StorageKeys {
                access_key_id: c.access_key_id().to_string(),
                secret_access_key: c.secret_access_key().to_string(),
                session_token: Some(c.session_token().to_string()),
                expires_at: Some(expiry(c.expire_time_ms())?),
            }),
            other => Err(mismatched(&self.binding.resource, "S3", &other)),
        }
    }

    pub fn invalidate(&self) {
        self.binding.invalidate();
    }
}

/// Supplies OSS access keys, static or STS-scoped.
#[derive(Debug, Clone)]
pub struct OssCredentialsSource {
    binding: Binding,
}

impl OssCredentialsSource {
    pub fn new(resource: impl Into<String>, resolver: Arc<dyn CredentialResolver>) -> Self {
        Self {
            binding: Binding {
                resource: resource.into(),
                resolver,
            },
        }
    }

    pub async fn credentials(&self) -> Result<StorageKeys> {
        match self.binding.resolve().await? {
            Credential::OssSecretKey(c) => Ok(StorageKeys {
                access_key_id: c.access_key_id().to_string(),
                secret_access_key: c.secret_access_key().to_string(),
                session_token: None,
                expires_at: None,
            }),
            Credential::OssToken(c) => Ok(StorageKeys {
                access_key_id: c.access_key_id().to_string(),
                secret_access_key: c.secret_access_key().to_string(),
                session_token: Some(c.security_token().to_string()),
                expires_at: Some(expiry(c.expire_time_ms())?),
            }),
            other => Err(mismatched(&self.binding.resource, "OSS", &other)),
        }
    }

    pub fn invalidate(&self) {
        self.binding.invalidate();
    }
}
