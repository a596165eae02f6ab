//! Providers that mint short-lived session tokens.

use super::{required_property, CredentialProvider};
use crate::context::CredentialContext;
use crate::credential::{
    Credential, CredentialKind, GcsTokenCredential, OssTokenCredential, S3TokenCredential,
    StorageBackend,
};
use crate::error::{CredentialError, Result};
use crate::keys;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default requested token lifetime (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Minimum requested token lifetime (1 minute).
pub const MIN_TOKEN_TTL: Duration = Duration::from_secs(60);

/// Maximum requested token lifetime (12 hours).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(12 * 3600);

/// Request passed to a [`SessionTokenIssuer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub backend: StorageBackend,
    /// Role ARN (S3/OSS) or service account (GCS) to act as.
    pub identity: String,
    pub resource: String,
    pub user_name: Option<String>,
    pub read_locations: Vec<String>,
    pub write_locations: Vec<String>,
    pub ttl: Duration,
}

/// Raw token material returned by an issuer.
#[derive(Clone, Default)]
pub struct IssuedToken {
    /// Temporary access key id (S3/OSS only).
    pub access_key_id: Option<String>,
    /// Temporary secret (S3/OSS only).
    pub secret_access_key: Option<String>,
    /// Session token, security token or OAuth2 access token.
    pub token: String,
    /// Expiry in ms since epoch.
    pub expire_time_ms: i64,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_key_id", &self.access_key_id)
            .field("expire_time_ms", &self.expire_time_ms)
            .finish_non_exhaustive()
    }
}

/// External identity service (STS, Aliyun STS, IAM credentials API).
#[async_trait]
pub trait SessionTokenIssuer: Debug + Send + Sync {
    async fn issue(&self, request: TokenRequest) -> Result<IssuedToken>;
}

/// Mints session tokens through a [`SessionTokenIssuer`].
#[derive(Debug)]
pub struct SessionTokenProvider {
    backend: StorageBackend,
    identity: String,
    ttl: Duration,
    issuer: Arc<dyn SessionTokenIssuer>,
    closed: AtomicBool,
}

impl SessionTokenProvider {
    /// Build a provider for `backend`.
    ///
    /// Requires the backend's identity property (`s3-role-arn`,
    /// `oss-role-arn` or `gcs-service-account`). `token-expire-in-secs` is
    /// optional and clamped to [`MIN_TOKEN_TTL`]..=[`MAX_TOKEN_TTL`].
    pub fn from_properties(
        backend: StorageBackend,
        properties: &HashMap<String, String>,
        issuer: Arc<dyn SessionTokenIssuer>,
    ) -> Result<Self> {
        let identity_key = match backend {
            StorageBackend::S3 => keys::S3_ROLE_ARN,
            StorageBackend::Oss => keys::OSS_ROLE_ARN,
            StorageBackend::Gcs => keys::GCS_SERVICE_ACCOUNT,
        };
        let identity = required_property(properties, identity_key)?;

        let ttl = match properties.get(keys::TOKEN_EXPIRE_IN_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    CredentialError::config(format!(
                        "Invalid '{}' value '{}': {}",
                        keys::TOKEN_EXPIRE_IN_SECS,
                        raw,
                        e
                    ))
                })?;
                Duration::from_secs(secs).clamp(MIN_TOKEN_TTL, MAX_TOKEN_TTL)
            }
            None => DEFAULT_TOKEN_TTL,
        };

        Ok(Self {
            backend,
            identity,
            ttl,
            issuer,
            closed: AtomicBool::new(false),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn build_request(&self, context: &CredentialContext) -> TokenRequest {
        TokenRequest {
            backend: self.backend,
            identity: self.identity.clone(),
            resource: context.resource().to_string(),
            user_name: context.user_name().map(str::to_string),
            read_locations: context
                .read_locations()
                .into_iter()
                .map(str::to_string)
                .collect(),
            write_locations: context.write_locations().map(str::to_string).collect(),
            ttl: self.ttl,
        }
    }

    fn to_credential(&self, issued: IssuedToken) -> Result<Credential> {
        let IssuedToken {
            access_key_id,
            secret_access_key,
            token,
            expire_time_ms,
        } = issued;
        let credential = match self.backend {
            StorageBackend::S3 => S3TokenCredential::new(
                access_key_id.unwrap_or_default(),
                secret_access_key.unwrap_or_default(),
                token,
                expire_time_ms,
            )?
            .into(),
            StorageBackend::Oss => OssTokenCredential::new(
                access_key_id.unwrap_or_default(),
                secret_access_key.unwrap_or_default(),
                token,
                expire_time_ms,
            )?
            .into(),
            StorageBackend::Gcs => GcsTokenCredential::new(token, expire_time_ms)?.into(),
        };
        Ok(credential)
    }
}

#[async_trait]
impl CredentialProvider for SessionTokenProvider {
    fn credential_kind(&self) -> CredentialKind {
        self.backend.dynamic_kind()
    }

    async fn get_credential(&self, context: &CredentialContext) -> Result<Credential> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CredentialError::unavailable(format!(
                "{} session token provider is closed",
                self.backend
            )));
        }

        let request = self.build_request(context);
        debug!(
            backend = %self.backend,
            resource = context.resource(),
            ttl_secs = self.ttl.as_secs(),
            "requesting session token"
        );

        // An issuer outage stays a source error so the refresher can keep
        // serving the token it already has.
        let issued = self.issuer.issue(request).await.map_err(|e| match e {
            CredentialError::InvalidCredential(_) | CredentialError::Unavailable(_) => e,
            other => CredentialError::source(format!(
                "Failed to issue {} token for '{}': {}",
                self.backend,
                context.resource(),
                other
            )),
        })?;

        // Malformed issuer output surfaces as InvalidCredential, never as a fallback.
        self.to_credential(issued)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
