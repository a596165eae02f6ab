//! In-memory table metadata cache validated against a location probe.
//!
//! An entry is only served while its `metadata_location` equals what the
//! [`MetadataLocationProbe`] currently reports. A mismatch means the table
//! was committed elsewhere; the entry is dropped and the caller reloads.
//! When the probe cannot answer, the lookup is a miss but the entry stays.

use crate::error::{MetadataCacheError, Result};
use crate::metadata::MetadataSnapshot;
use crate::probe::MetadataLocationProbe;
use crate::table_identifier::TableIdentifier;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a probe call.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations every table metadata cache supports.
#[async_trait]
pub trait TableMetadataCache: Send + Sync {
    type Metadata: MetadataSnapshot;

    /// The cached metadata if it is still current, else `None`.
    async fn get(&self, id: &TableIdentifier) -> Option<Arc<Self::Metadata>>;

    /// Store `metadata` for `id`, replacing any previous entry.
    fn update(&self, id: &TableIdentifier, metadata: Self::Metadata);

    /// Drop the entry for `id`. Idempotent.
    fn invalidate(&self, id: &TableIdentifier);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataCacheConfig {
    /// `None` means unbounded.
    pub capacity: Option<usize>,
    pub probe_timeout: Duration,
}

impl Default for MetadataCacheConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// [`TableMetadataCache`] held in process memory.
pub struct MemoryMetadataCache<M> {
    entries: Mutex<LruCache<TableIdentifier, Arc<M>>>,
    probe: Arc<dyn MetadataLocationProbe>,
    probe_timeout: Duration,
}

impl<M> std::fmt::Debug for MemoryMetadataCache<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMetadataCache")
            .field("entries", &self.entries.lock().len())
            .field("probe", &self.probe)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

impl<M: MetadataSnapshot> MemoryMetadataCache<M> {
    pub fn new(probe: Arc<dyn MetadataLocationProbe>, config: MetadataCacheConfig) -> Result<Self> {
        let entries = match config.capacity {
            Some(capacity) => {
                let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
                    MetadataCacheError::config("metadata cache capacity must be > 0")
                })?;
                LruCache::new(capacity)
            }
            None => LruCache::unbounded(),
        };
        if config.probe_timeout.is_zero() {
            return Err(MetadataCacheError::config("probe timeout must be > 0"));
        }
        Ok(Self {
            entries: Mutex::new(entries),
            probe,
            probe_timeout: config.probe_timeout,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Ask the probe for the current location, folding failures into `None`.
    async fn probe_location(&self, id: &TableIdentifier) -> Option<String> {
        let probed =
            tokio::time::timeout(self.probe_timeout, self.probe.current_metadata_location(id))
                .await;
        match probed {
            Ok(Ok(location)) => {
                if location.is_none() {
                    debug!(table = %id, "probe reported no metadata location");
                }
                location
            }
            Ok(Err(e)) => {
                warn!(table = %id, error = %e, "metadata location probe failed");
                None
            }
            Err(_) => {
                warn!(
                    table = %id,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "metadata location probe timed out"
                );
                None
            }
        }
    }
}

#[async_trait]
impl<M: MetadataSnapshot + 'static> TableMetadataCache for MemoryMetadataCache<M> {
    type Metadata = M;

    async fn get(&self, id: &TableIdentifier) -> Option<Arc<M>> {
        let cached = self.entries.lock().get(id).cloned()?;

        let current = self.probe_location(id).await?;
        if current == cached.metadata_location() {
            debug!(table = %id, location = %current, "metadata cache hit");
            return Some(cached);
        }

        info!(
            table = %id,
            cached = %cached.metadata_location(),
            current = %current,
            "cached metadata is stale, evicting"
        );
        let mut entries = self.entries.lock();
        // Only remove the entry that was validated; a concurrent update wins.
        if entries
            .peek(id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &cached))
        {
            entries.pop(id);
        }
        None
    }

    fn update(&self, id: &TableIdentifier, metadata: M) {
        debug!(table = %id, location = %metadata.metadata_location(), "metadata cache update");
        self.entries.lock().put(id.clone(), Arc::new(metadata));
    }

    fn invalidate(&self, id: &TableIdentifier) {
        if self.entries.lock().pop(id).is_some() {
            info!(table = %id, "metadata cache entry invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{LoadedTableMetadata, TableMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    enum Answer {
        Location(&'static str),
        Unknown,
        Fail,
        Hang,
    }

    #[derive(Debug)]
    struct FakeProbe {
        answer: Mutex<Answer>,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(answer: Answer) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(answer),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataLocationProbe for FakeProbe {
        async fn current_metadata_location(&self, _id: &TableIdentifier) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self.answer.lock().clone();
            match answer {
                Answer::Location(l) => Ok(Some(l.to_string())),
                Answer::Unknown => Ok(None),
                Answer::Fail => Err(MetadataCacheError::metastore("connection refused")),
                Answer::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }
    }

    fn loaded(location: &str) -> LoadedTableMetadata {
        LoadedTableMetadata::new(
            location,
            TableMetadata {
                format_version: 2,
                table_uuid: None,
                location: "s3://w/db/t".to_string(),
                last_updated_ms: 0,
                current_schema_id: 0,
                schemas: Vec::new(),
                current_snapshot_id: None,
                snapshots: Vec::new(),
                properties: Default::default(),
            },
        )
    }

    fn cache(probe: Arc<FakeProbe>) -> MemoryMetadataCache<LoadedTableMetadata> {
        MemoryMetadataCache::new(
            probe,
            MetadataCacheConfig {
                capacity: None,
                probe_timeout: Duration::from_millis(50),
            },
        )
        .unwrap()
    }

    fn table() -> TableIdentifier {
        TableIdentifier::parse("db.t").unwrap()
    }

    #[tokio::test]
    async fn test_miss_does_not_probe_or_populate() {
        let probe = FakeProbe::new(Answer::Location("m1"));
        let cache = cache(probe.clone());
        assert!(cache.get(&table()).await.is_none());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_hit_when_location_matches() {
        let cache = cache(FakeProbe::new(Answer::Location("m1")));
        cache.update(&table(), loaded("m1"));
        let hit = cache.get(&table()).await.unwrap();
        assert_eq!(hit.metadata_location(), "m1");
    }

    #[tokio::test]
    async fn test_mismatch_purges_entry() {
        let cache = cache(FakeProbe::new(Answer::Location("m2")));
        cache.update(&table(), loaded("m1"));
        assert!(cache.get(&table()).await.is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_probe_failures_keep_entry() {
        for answer in [Answer::Unknown, Answer::Fail, Answer::Hang] {
            let probe = FakeProbe::new(answer);
            let cache = cache(probe.clone());
            cache.update(&table(), loaded("m1"));

            assert!(cache.get(&table()).await.is_none());
            assert_eq!(cache.len(), 1);

            *probe.answer.lock() = Answer::Location("m1");
            assert!(cache.get(&table()).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_update_replaces_and_invalidate_is_idempotent() {
        let cache = cache(FakeProbe::new(Answer::Location("m2")));
        cache.update(&table(), loaded("m1"));
        cache.update(&table(), loaded("m2"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&table()).await.unwrap().metadata_location(), "m2");

        cache.invalidate(&table());
        cache.invalidate(&table());
        assert!(cache.get(&table()).await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let probe = FakeProbe::new(Answer::Location("m1"));
        let cache: MemoryMetadataCache<LoadedTableMetadata> = MemoryMetadataCache::new(
            probe,
            MetadataCacheConfig {
                capacity: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        for raw in ["db.a", "db.b", "db.c"] {
            cache.update(&TableIdentifier::parse(raw).unwrap(), loaded("m1"));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&TableIdentifier::parse("db.a").unwrap()).await.is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = MemoryMetadataCache::<LoadedTableMetadata>::new(
            FakeProbe::new(Answer::Unknown),
            MetadataCacheConfig {
                capacity: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(MetadataCacheError::Config(_))));
    }
}
