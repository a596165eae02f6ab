//! Credential providers.
//!
//! A provider turns a [`CredentialContext`] into a [`Credential`], optionally
//! by calling external identity infrastructure. Providers never cache; caching
//! belongs to the [`CredentialRefresher`](crate::CredentialRefresher).
//!
//! # Implementations
//!
//! - [`S3SecretKeyProvider`] / [`OssSecretKeyProvider`] - static keys from configuration
//! - [`SessionTokenProvider`] - short-lived tokens from a [`SessionTokenIssuer`]
//! - [`NoCredentialProvider`] - always unavailable

mod session;
mod static_key;

pub use session::{IssuedToken, SessionTokenIssuer, SessionTokenProvider, TokenRequest};
pub use static_key::{static_fallback_credential, OssSecretKeyProvider, S3SecretKeyProvider};

use crate::context::CredentialContext;
use crate::credential::{Credential, CredentialKind, StorageBackend};
use crate::error::{CredentialError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Produces credentials for a resource.
#[async_trait]
pub trait CredentialProvider: Debug + Send + Sync {
    /// The kind of credential this provider produces. Constant per instance.
    fn credential_kind(&self) -> CredentialKind;

    /// Produce a usable credential or fail with
    /// [`CredentialError::Unavailable`].
    async fn get_credential(&self, context: &CredentialContext) -> Result<Credential>;

    /// Release external resources. Calling it more than once is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Type name accepted by [`create_provider`] for [`NoCredentialProvider`].
pub const NO_CREDENTIAL_PROVIDER: &str = "none";

/// Create a provider for `backend` by type name.
///
/// Type names are the [`CredentialKind`] names (`s3-secret-key`, `s3-token`,
/// `gcs-token`, `oss-secret-key`, `oss-token`) plus `none`. Token providers
/// require an `issuer`.
pub fn create_provider(
    backend: StorageBackend,
    type_name: &str,
    properties: &HashMap<String, String>,
    issuer: Option<Arc<dyn SessionTokenIssuer>>,
) -> Result<Arc<dyn CredentialProvider>> {
    if type_name == NO_CREDENTIAL_PROVIDER {
        return Ok(Arc::new(NoCredentialProvider::new(backend)));
    }

    let kind: CredentialKind = type_name.parse().map_err(|_| {
        CredentialError::config(format!("Unknown credential provider type '{}'", type_name))
    })?;
    if kind.backend() != backend {
        return Err(CredentialError::config(format!(
            "Credential provider '{}' does not serve storage backend '{}'",
            type_name, backend
        )));
    }

    match kind {
        CredentialKind::S3SecretKey => Ok(Arc::new(S3SecretKeyProvider::from_properties(
            properties,
        )?)),
        CredentialKind::OssSecretKey => Ok(Arc::new(OssSecretKeyProvider::from_properties(
            properties,
        )?)),
        CredentialKind::S3Token | CredentialKind::GcsToken | CredentialKind::OssToken => {
            let issuer = issuer.ok_or_else(|| {
                CredentialError::config(format!(
                    "Credential provider '{}' requires a session token issuer",
                    type_name
                ))
            })?;
            Ok(Arc::new(SessionTokenProvider::from_properties(
                kind.backend(),
                properties,
                issuer,
            )?))
        }
    }
}

/// Provider for resources that have no credentials configured.
#[derive(Debug, Clone, Copy)]
pub struct NoCredentialProvider {
    backend: StorageBackend,
}

impl NoCredentialProvider {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl CredentialProvider for NoCredentialProvider {
    /// The token kind of its backend. Nothing of this kind is ever produced.
    fn credential_kind(&self) -> CredentialKind {
        self.backend.dynamic_kind()
    }

    async fn get_credential(&self, context: &CredentialContext) -> Result<Credential> {
        Err(CredentialError::unavailable(format!(
            "No credential provider configured for '{}'",
            context.resource()
        )))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Read a required, non-blank configuration property.
pub(crate) fn required_property(
    properties: &HashMap<String, String>,
    key: &str,
) -> Result<String> {
    match properties.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        Some(_) => Err(CredentialError::config(format!(
            "Property '{}' should not be blank",
            key
        ))),
        None => Err(CredentialError::config(format!(
            "Missing required property '{}'",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    #[test]
    fn test_required_property() {
        let mut props = HashMap::new();
        assert!(matches!(
            required_property(&props, "k"),
            Err(CredentialError::Config(_))
        ));
        props.insert("k".to_string(), "   ".to_string());
        assert!(matches!(
            required_property(&props, "k"),
            Err(CredentialError::Config(_))
        ));
        props.insert("k".to_string(), "v".to_string());
        assert_eq!(required_property(&props, "k").unwrap(), "v");
    }

    #[test]
    fn test_create_static_provider() {
        let mut props = HashMap::new();
        props.insert(keys::S3_ACCESS_KEY_ID.to_string(), "ak".to_string());
        props.insert(keys::S3_SECRET_ACCESS_KEY.to_string(), "sk".to_string());
        let provider = create_provider(StorageBackend::S3, "s3-secret-key", &props, None).unwrap();
        assert_eq!(provider.credential_kind(), CredentialKind::S3SecretKey);
    }

    #[test]
    fn test_create_token_provider_without_issuer_fails() {
        let mut props = HashMap::new();
        props.insert(keys::S3_ROLE_ARN.to_string(), "arn:aws:iam::1:role/r".to_string());
        let err = create_provider(StorageBackend::S3, "s3-token", &props, None).unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));
    }

    #[test]
    fn test_create_unknown_provider_fails() {
        let err = create_provider(StorageBackend::S3, "azure-sas", &HashMap::new(), None)
            .unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));
    }

    #[test]
    fn test_create_provider_for_other_backend_fails() {
        let mut props = HashMap::new();
        props.insert(keys::OSS_ACCESS_KEY_ID.to_string(), "ak".to_string());
        props.insert(keys::OSS_SECRET_ACCESS_KEY.to_string(), "sk".to_string());
        let err = create_provider(StorageBackend::S3, "oss-secret-key", &props, None).unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));
    }

    #[tokio::test]
    async fn test_no_credential_provider_is_unavailable() {
        let provider =
            create_provider(StorageBackend::Oss, NO_CREDENTIAL_PROVIDER, &HashMap::new(), None)
                .unwrap();
        assert_eq!(provider.credential_kind(), CredentialKind::OssToken);
        let ctx = CredentialContext::read_only("fs", Vec::<String>::new());
        let err = provider.get_credential(&ctx).await.unwrap_err();
        assert!(matches!(err, CredentialError::Unavailable(_)));
        provider.close().await.unwrap();
        provider.close().await.unwrap();
    }
}
