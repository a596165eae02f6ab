//! The storage access context: one object owning both caches.
//!
//! Catalog operations receive a [`StorageAccessContext`] explicitly instead
//! of reaching for process-wide singletons. Build one from an
//! [`AccessConfig`] with [`StorageAccessContext::builder`], or assemble it
//! from already constructed parts with [`StorageAccessContext::new`].

use crate::config::AccessConfig;
use crate::error::{AccessError, Result};
use gravitino_credential::{
    create_provider, static_fallback_credential, to_iceberg_properties, Clock, Credential,
    CredentialProvider, CredentialRefresher, CredentialResolver, CredentialSelector,
    CredentialSource, ProviderCredentialSource, SessionTokenIssuer,
};
use gravitino_metadata_cache::{
    LoadedTableMetadata, MemoryMetadataCache, MetadataLocationProbe, MetadataSnapshot,
    TableIdentifier, TableMetadataCache,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct StorageAccessContext<M: MetadataSnapshot + 'static = LoadedTableMetadata> {
    refresher: Arc<CredentialRefresher>,
    metadata_cache: Arc<dyn TableMetadataCache<Metadata = M>>,
    providers: Option<Arc<ProviderCredentialSource>>,
}

impl<M: MetadataSnapshot + 'static> std::fmt::Debug for StorageAccessContext<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAccessContext")
            .field("refresher", &self.refresher)
            .finish_non_exhaustive()
    }
}

impl<M: MetadataSnapshot + 'static> StorageAccessContext<M> {
    pub fn new(
        refresher: Arc<CredentialRefresher>,
        metadata_cache: Arc<dyn TableMetadataCache<Metadata = M>>,
    ) -> Self {
        Self {
            refresher,
            metadata_cache,
            providers: None,
        }
    }

    /// The credential to use for `resource` right now.
    pub async fn get_active_credential(&self, resource: &str) -> Result<Credential> {
        Ok(self.refresher.get_active_credential(resource).await?)
    }

    /// [`get_active_credential`](Self::get_active_credential) as Iceberg
    /// client properties.
    pub async fn get_iceberg_properties(&self, resource: &str) -> Result<HashMap<String, String>> {
        let credential = self.get_active_credential(resource).await?;
        Ok(to_iceberg_properties(&credential))
    }

    /// Drop the cached credential for `resource`, e.g. after a 403.
    pub fn invalidate_credential(&self, resource: &str) {
        self.refresher.invalidate(resource);
    }

    /// Cached metadata for `id` if it is still current.
    pub async fn get_table_metadata(&self, id: &TableIdentifier) -> Option<Arc<M>> {
        self.metadata_cache.get(id).await
    }

    pub fn update_table_metadata(&self, id: &TableIdentifier, metadata: M) {
        self.metadata_cache.update(id, metadata);
    }

    pub fn invalidate_table_metadata(&self, id: &TableIdentifier) {
        self.metadata_cache.invalidate(id);
    }

    /// Resolver for storage SDK adapters in [`crate::sink`].
    pub fn credential_resolver(&self) -> Arc<dyn CredentialResolver> {
        self.refresher.clone()
    }

    /// Close the providers this context created. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if let Some(providers) = &self.providers {
            providers.close().await?;
        }
        Ok(())
    }
}

impl StorageAccessContext {
    /// Start building a context from `config`.
    ///
    /// The metadata type is chosen at [`build`](StorageAccessContextBuilder::build).
    pub fn builder(config: AccessConfig) -> StorageAccessContextBuilder {
        StorageAccessContextBuilder::new(config)
    }
}

/// Builds a [`StorageAccessContext`] from configuration.
#[derive(Default)]
pub struct StorageAccessContextBuilder {
    config: Option<AccessConfig>,
    source: Option<Arc<dyn CredentialSource>>,
    issuer: Option<Arc<dyn SessionTokenIssuer>>,
    clock: Option<Arc<dyn Clock>>,
}

impl StorageAccessContextBuilder {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    /// Use an external credential source instead of building providers from
    /// `credential-providers`.
    pub fn with_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Issuer for session-token providers.
    pub fn with_issuer(mut self, issuer: Arc<dyn SessionTokenIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build<M: MetadataSnapshot + 'static>(
        self,
        probe: Arc<dyn MetadataLocationProbe>,
    ) -> Result<StorageAccessContext<M>> {
        let config = self
            .config
            .ok_or_else(|| AccessError::config("no access configuration given"))?;
        config.validate()?;

        // Static keys are read from the environment once, here.
        let properties = config.resolve_properties()?;
        let fallback = static_fallback_credential(config.storage_backend, &properties)?;
        let has_fallback = fallback.is_some();

        let (source, providers): (Arc<dyn CredentialSource>, _) = match self.source {
            Some(source) => (source, None),
            None => {
                let providers = config
                    .credential_providers
                    .iter()
                    .map(|name| {
                        create_provider(
                            config.storage_backend,
                            name,
                            &properties,
                            self.issuer.clone(),
                        )
                    })
                    .collect::<std::result::Result<Vec<Arc<dyn CredentialProvider>>, _>>()?;
                let providers = Arc::new(ProviderCredentialSource::read_only(providers));
                let source: Arc<dyn CredentialSource> = providers.clone();
                (source, Some(providers))
            }
        };

        let mut refresher = CredentialRefresher::new(
            source,
            CredentialSelector::new(config.storage_backend),
            fallback,
            config.refresher_config(),
        )?;
        if let Some(clock) = self.clock {
            refresher = refresher.with_clock(clock);
        }

        let metadata_cache: MemoryMetadataCache<M> =
            MemoryMetadataCache::new(probe, config.metadata_cache_config())?;

        info!(
            backend = %config.storage_backend,
            catalog = config.catalog_name.as_deref().unwrap_or("-"),
            providers = ?config.credential_providers,
            has_fallback,
            "storage access context initialized"
        );

        Ok(StorageAccessContext {
            refresher: Arc::new(refresher),
            metadata_cache: Arc::new(metadata_cache),
            providers,
        })
    }
}
