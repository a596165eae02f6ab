//! Credential sources and resolvers.
//!
//! A [`CredentialSource`] is the external collaborator that produces
//! candidate credentials for a resource (the catalog, a set of providers).
//! A [`CredentialResolver`] is what storage IO layers call: it hands back
//! one usable credential and accepts invalidation after an access failure.

use crate::context::CredentialContext;
use crate::credential::Credential;
use crate::error::{CredentialError, Result};
use crate::provider::CredentialProvider;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

/// Loads candidate credentials for a resource identifier.
#[async_trait]
pub trait CredentialSource: Debug + Send + Sync {
    /// Return all credentials currently obtainable for `resource`.
    ///
    /// An empty list is a valid answer; the caller applies selection and
    /// fallback policy.
    async fn load_credential_candidates(&self, resource: &str) -> Result<Vec<Credential>>;
}

/// Resolves the credential IO layers should use for a resource.
#[async_trait]
pub trait CredentialResolver: Debug + Send + Sync {
    /// Get a usable credential for `resource`.
    ///
    /// Fails with [`CredentialError::Unavailable`] when nothing usable exists.
    async fn resolve(&self, resource: &str) -> Result<Credential>;

    /// Drop any cached credential for `resource` (e.g. after a 403) so the
    /// next `resolve()` refreshes.
    fn invalidate(&self, resource: &str);
}

/// Builds the [`CredentialContext`] for a resource identifier.
pub type ContextResolver = Arc<dyn Fn(&str) -> Result<CredentialContext> + Send + Sync>;

/// A [`CredentialSource`] that asks each configured provider in turn.
///
/// Providers that report [`CredentialError::Unavailable`] are skipped. A
/// provider that fails outright is skipped too, but if no short-lived token
/// was collected in that load the failure is returned, so the caller can keep
/// serving its last good credential instead of settling on static keys.
/// Validation failures ([`CredentialError::InvalidCredential`]) always
/// propagate.
pub struct ProviderCredentialSource {
    providers: Vec<Arc<dyn CredentialProvider>>,
    context_for: ContextResolver,
}

impl std::fmt::Debug for ProviderCredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentialSource")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl ProviderCredentialSource {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>, context_for: ContextResolver) -> Self {
        Self {
            providers,
            context_for,
        }
    }

    /// Source whose context grants read access to the resource identifier
    /// itself, treated as a storage location.
    pub fn read_only(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        Self::new(
            providers,
            Arc::new(|resource: &str| Ok(CredentialContext::read_only(resource, [resource]))),
        )
    }

    /// Close every provider. Errors are logged; the first one is returned.
    pub async fn close(&self) -> Result<()> {
        let mut first_error = None;
        for provider in &self.providers {
            if let Err(e) = provider.close().await {
                warn!(
                    kind = %provider.credential_kind(),
                    error = %e,
                    "failed to close credential provider"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CredentialSource for ProviderCredentialSource {
    async fn load_credential_candidates(&self, resource: &str) -> Result<Vec<Credential>> {
        let context = (self.context_for)(resource)?;
        let mut candidates = Vec::with_capacity(self.providers.len());
        let mut failure = None;

        for provider in &self.providers {
            match provider.get_credential(&context).await {
                Ok(credential) => candidates.push(credential),
                Err(e) if e.is_invalid_credential() => return Err(e),
                Err(CredentialError::Unavailable(msg)) => {
                    debug!(
                        resource,
                        kind = %provider.credential_kind(),
                        reason = %msg,
                        "provider has no credential"
                    );
                }
                Err(e) => {
                    warn!(
                        resource,
                        kind = %provider.credential_kind(),
                        error = %e,
                        "credential provider failed"
                    );
                    failure.get_or_insert(e);
                }
            }
        }

        // Static keys alone never expire, so returning them here would pin
        // the resource to them after the outage ends.
        match failure {
            Some(e) if !candidates.iter().any(|c| c.kind().is_dynamic()) => {
                Err(CredentialError::source(format!(
                    "{} of {} credential providers answered for '{}', first failure: {}",
                    candidates.len(),
                    self.providers.len(),
                    resource,
                    e
                )))
            }
            _ => Ok(candidates),
        }
    }
}
