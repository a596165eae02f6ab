//! Per-resource credential cache with lazy, single-flight refresh.
//!
//! Each resource identifier owns one [`CachedCredentialEntry`] guarded by its
//! own async mutex. A read takes that mutex, and if the entry is not fresh
//! refreshes it while still holding it, so concurrent callers for the same
//! resource wait for one refresh instead of each hitting the source.
//!
//! Entries become stale at a computed instant earlier than the credential's
//! real expiry:
//!
//! ```text
//! computed_expiry = now + max(floor((expire_time_ms - now) * expiry_factor), 1)
//! ```
//!
//! Static credentials (`expire_time_ms == 0`) never go stale.
//!
//! A slot stays in the map while any task holds it, so invalidation and LRU
//! eviction never open a second refresh path for the same resource.

use crate::clock::{Clock, SystemClock};
use crate::credential::Credential;
use crate::error::{CredentialError, Result};
use crate::selector::CredentialSelector;
use crate::source::{CredentialResolver, CredentialSource};
use async_trait::async_trait;
use lru::LruCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default fraction of a token's remaining lifetime it is trusted for.
pub const DEFAULT_EXPIRY_FACTOR: f64 = 0.9;

/// Default number of resources kept in the cache.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default bound on a single source call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning for [`CredentialRefresher`].
#[derive(Debug, Clone, PartialEq)]
pub struct RefresherConfig {
    /// In `(0, 1]`.
    pub expiry_factor: f64,
    /// Maximum number of cached resources; least recently used idle entries
    /// are evicted.
    pub capacity: usize,
    pub call_timeout: Duration,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            expiry_factor: DEFAULT_EXPIRY_FACTOR,
            capacity: DEFAULT_CAPACITY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl RefresherConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.expiry_factor > 0.0 && self.expiry_factor <= 1.0) {
            return Err(CredentialError::config(format!(
                "expiry factor must be in (0, 1], got {}",
                self.expiry_factor
            )));
        }
        if self.capacity == 0 {
            return Err(CredentialError::config("cache capacity must be > 0"));
        }
        if self.call_timeout.is_zero() {
            return Err(CredentialError::config("call timeout must be > 0"));
        }
        Ok(())
    }
}

/// Observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

/// The last good credential for a resource and when to stop trusting it.
#[derive(Debug, Clone, Default)]
pub struct CachedCredentialEntry {
    credential: Option<Credential>,
    computed_expiry_ms: i64,
}

impl CachedCredentialEntry {
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// `i64::MAX` means the entry never goes stale.
    pub fn computed_expiry_ms(&self) -> i64 {
        self.computed_expiry_ms
    }

    pub fn state(&self, now_ms: i64) -> CacheState {
        match self.credential {
            None => CacheState::Empty,
            Some(_) if now_ms >= self.computed_expiry_ms => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    fn fresh(&self, now_ms: i64) -> Option<&Credential> {
        match self.state(now_ms) {
            CacheState::Fresh => self.credential.as_ref(),
            _ => None,
        }
    }

    fn store(&mut self, credential: Credential, computed_expiry_ms: i64) {
        self.credential = Some(credential);
        self.computed_expiry_ms = computed_expiry_ms;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: tokio::sync::Mutex<CachedCredentialEntry>,
    /// Set by `invalidate` when the slot could not be removed because a task
    /// holds it; the next task to lock the entry clears it.
    invalidated: AtomicBool,
}

/// Only the map holds a reference, so no task is waiting on or refreshing
/// this entry. Call with the map lock held.
fn is_idle(slot: &Arc<Slot>) -> bool {
    Arc::strong_count(slot) == 1
}

/// Caches the selected credential per resource and refreshes it lazily.
pub struct CredentialRefresher {
    entries: parking_lot::Mutex<LruCache<String, Arc<Slot>>>,
    source: Arc<dyn CredentialSource>,
    selector: CredentialSelector,
    fallback: Option<Credential>,
    clock: Arc<dyn Clock>,
    config: RefresherConfig,
}

impl std::fmt::Debug for CredentialRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRefresher")
            .field("backend", &self.selector.backend())
            .field("has_fallback", &self.fallback.is_some())
            .field("cached", &self.entries.lock().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CredentialRefresher {
    /// Create a refresher.
    ///
    /// `fallback` is the statically configured credential used when the
    /// source yields nothing selectable; it must belong to the selector's
    /// backend.
    pub fn new(
        source: Arc<dyn CredentialSource>,
        selector: CredentialSelector,
        fallback: Option<Credential>,
        config: RefresherConfig,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(fallback) = &fallback {
            if fallback.kind().backend() != selector.backend() {
                return Err(CredentialError::config(format!(
                    "fallback credential kind {} does not match backend {}",
                    fallback.kind(),
                    selector.backend()
                )));
            }
        }

        // Capacity is enforced in `slot` so that busy entries are never evicted.
        Ok(Self {
            entries: parking_lot::Mutex::new(LruCache::unbounded()),
            source,
            selector,
            fallback,
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RefresherConfig {
        &self.config
    }

    /// Return a usable credential for `resource`, refreshing if needed.
    pub async fn get_active_credential(&self, resource: &str) -> Result<Credential> {
        let slot = self.slot(resource);
        let mut entry = slot.entry.lock().await;

        if slot.invalidated.swap(false, Ordering::SeqCst) {
            entry.clear();
        }

        if let Some(credential) = entry.fresh(self.clock.now_ms()) {
            debug!(resource, kind = %credential.kind(), "credential cache hit");
            return Ok(credential.clone());
        }

        self.refresh(resource, &mut entry).await
    }

    /// Drop the cached entry for `resource`.
    ///
    /// If a refresh for `resource` is in flight, it completes, and the next
    /// read refreshes again.
    pub fn invalidate(&self, resource: &str) {
        let mut entries = self.entries.lock();
        let idle = match entries.peek(resource) {
            Some(slot) if is_idle(slot) => true,
            Some(slot) => {
                slot.invalidated.store(true, Ordering::SeqCst);
                false
            }
            None => return,
        };
        if idle {
            entries.pop(resource);
        }
        info!(resource, "credential invalidated");
    }

    /// Current state of the entry for `resource`. Does not refresh.
    pub async fn state(&self, resource: &str) -> CacheState {
        let slot = self.entries.lock().peek(resource).cloned();
        match slot {
            Some(slot) => {
                let entry = slot.entry.lock().await;
                if slot.invalidated.load(Ordering::SeqCst) {
                    CacheState::Empty
                } else {
                    entry.state(self.clock.now_ms())
                }
            }
            None => CacheState::Empty,
        }
    }

    /// Number of resources currently tracked.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn slot(&self, resource: &str) -> Arc<Slot> {
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.get(resource) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(Slot::default());
        entries.put(resource.to_string(), Arc::clone(&slot));
        self.evict_idle(&mut entries);
        slot
    }

    /// Evict least recently used idle entries down to capacity. Entries in
    /// use are skipped, so the map may briefly hold more than `capacity`.
    fn evict_idle(&self, entries: &mut LruCache<String, Arc<Slot>>) {
        while entries.len() > self.config.capacity {
            let victim = entries
                .iter()
                .rev()
                .find(|(_, slot)| is_idle(slot))
                .map(|(resource, _)| resource.clone());
            match victim {
                Some(resource) => {
                    entries.pop(&resource);
                    debug!(resource = %resource, "evicted credential entry");
                }
                None => break,
            }
        }
    }

    /// Runs with the entry's lock held.
    async fn refresh(
        &self,
        resource: &str,
        entry: &mut CachedCredentialEntry,
    ) -> Result<Credential> {
        let loaded = match tokio::time::timeout(
            self.config.call_timeout,
            self.source.load_credential_candidates(resource),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CredentialError::Timeout(
                self.config.call_timeout.as_millis() as u64,
            )),
        };

        let candidates = match loaded {
            Ok(candidates) => candidates,
            Err(e) if e.is_invalid_credential() => return Err(e),
            Err(e) => return self.serve_stale(resource, entry, e),
        };

        let now = self.clock.now_ms();
        let credential = match self.selector.select(&candidates) {
            Some(credential) => credential,
            None => {
                return match &self.fallback {
                    Some(fallback) => {
                        warn!(
                            resource,
                            candidates = candidates.len(),
                            kind = %fallback.kind(),
                            "no selectable credential, using static fallback"
                        );
                        entry.store(fallback.clone(), i64::MAX);
                        Ok(fallback.clone())
                    }
                    None => {
                        error!(resource, candidates = candidates.len(), "no credential available");
                        Err(CredentialError::unavailable(format!(
                            "No {} credential available for '{}'",
                            self.selector.backend(),
                            resource
                        )))
                    }
                };
            }
        };

        if !credential.is_expiring() {
            info!(resource, kind = %credential.kind(), "credential refreshed");
            entry.store(credential.clone(), i64::MAX);
            return Ok(credential);
        }

        let expire_time_ms = credential.expire_time_ms();
        if expire_time_ms <= now {
            warn!(
                resource,
                kind = %credential.kind(),
                expire_time_ms,
                now_ms = now,
                "source returned an already expired credential, not caching"
            );
            return Ok(credential);
        }

        let computed_expiry_ms = self.computed_expiry(now, expire_time_ms);
        info!(
            resource,
            kind = %credential.kind(),
            expire_time_ms,
            computed_expiry_ms,
            "credential refreshed"
        );
        entry.store(credential.clone(), computed_expiry_ms);
        Ok(credential)
    }

    fn computed_expiry(&self, now_ms: i64, expire_time_ms: i64) -> i64 {
        let remaining = (expire_time_ms - now_ms) as f64 * self.config.expiry_factor;
        now_ms.saturating_add((remaining.floor() as i64).max(1))
    }

    fn serve_stale(
        &self,
        resource: &str,
        entry: &CachedCredentialEntry,
        cause: CredentialError,
    ) -> Result<Credential> {
        match entry.credential() {
            Some(credential) => {
                warn!(
                    resource,
                    kind = %credential.kind(),
                    error = %cause,
                    "credential refresh failed, serving last good credential"
                );
                Ok(credential.clone())
            }
            None => {
                error!(resource, error = %cause, "credential refresh failed");
                Err(CredentialError::unavailable(format!(
                    "Failed to load credential for '{}': {}",
                    resource, cause
                )))
            }
        }
    }
}

#[async_trait]
impl CredentialResolver for CredentialRefresher {
    async fn resolve(&self, resource: &str) -> Result<Credential> {
        self.get_active_credential(resource).await
    }

    fn invalidate(&self, resource: &str) {
        CredentialRefresher::invalidate(self, resource)
    }
}
