//! Integration tests for credential refresh under concurrency and for the
//! provider-backed resolution path.

use async_trait::async_trait;
use futures::future::join_all;
use gravitino_credential::{
    create_provider, keys, CacheState, Clock, Credential, CredentialError, CredentialKind,
    CredentialRefresher, CredentialResolver, CredentialSelector, CredentialSource, IssuedToken,
    ManualClock, ProviderCredentialSource, RefresherConfig, Result, S3TokenCredential,
    SessionTokenIssuer, StorageBackend, TokenRequest,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000_000;

/// Source that takes a while to answer and hands out tokens valid for 10s.
#[derive(Debug)]
struct SlowSource {
    calls: AtomicUsize,
    clock: Arc<ManualClock>,
}

#[async_trait]
impl CredentialSource for SlowSource {
    async fn load_credential_candidates(&self, _resource: &str) -> Result<Vec<Credential>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let token = S3TokenCredential::new(
            format!("ASIA{}", n),
            "secret",
            "session",
            self.clock.now_ms() + 10_000,
        )?;
        Ok(vec![token.into()])
    }
}

fn slow_refresher() -> (Arc<CredentialRefresher>, Arc<SlowSource>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let source = Arc::new(SlowSource {
        calls: AtomicUsize::new(0),
        clock: clock.clone(),
    });
    let refresher = CredentialRefresher::new(
        source.clone(),
        CredentialSelector::new(StorageBackend::S3),
        None,
        RefresherConfig::default(),
    )
    .expect("refresher")
    .with_clock(clock.clone());
    (Arc::new(refresher), source, clock)
}

async fn read_concurrently(
    refresher: &Arc<CredentialRefresher>,
    resource: &str,
    callers: usize,
) -> Vec<Credential> {
    let handles = (0..callers).map(|_| {
        let refresher = Arc::clone(refresher);
        let resource = resource.to_string();
        tokio::spawn(async move { refresher.get_active_credential(&resource).await })
    });
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("credential"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_access_refreshes_once() {
    let (refresher, source, _clock) = slow_refresher();

    let credentials = read_concurrently(&refresher, "catalog.db.tbl", 32).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(credentials.iter().all(|c| c == &credentials[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_after_expiry_refreshes_once() {
    let (refresher, source, clock) = slow_refresher();
    let first = refresher.get_active_credential("catalog.db.tbl").await.unwrap();

    clock.advance(9_500);
    assert_eq!(refresher.state("catalog.db.tbl").await, CacheState::Stale);

    let credentials = read_concurrently(&refresher, "catalog.db.tbl", 32).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert!(credentials.iter().all(|c| c != &first));
    assert!(credentials.iter().all(|c| c == &credentials[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resources_refresh_independently() {
    let (refresher, source, _clock) = slow_refresher();

    let (a, b) = tokio::join!(
        read_concurrently(&refresher, "catalog.db.a", 8),
        read_concurrently(&refresher, "catalog.db.b", 8),
    );

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_ne!(a[0], b[0]);
    assert_eq!(refresher.len(), 2);
}

/// Slow source that records the highest number of loads running at once for
/// any single resource.
#[derive(Debug, Default)]
struct GaugedSource {
    calls: AtomicUsize,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl CredentialSource for GaugedSource {
    async fn load_credential_candidates(&self, resource: &str) -> Result<Vec<Credential>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut in_flight = self.in_flight.lock();
            let running = in_flight.entry(resource.to_string()).or_insert(0);
            *running += 1;
            self.max_in_flight.fetch_max(*running, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Some(running) = self.in_flight.lock().get_mut(resource) {
            *running -= 1;
        }
        let token =
            S3TokenCredential::new(format!("ASIA{}", n), "secret", "session", NOW + 60_000)?;
        Ok(vec![token.into()])
    }
}

fn gauged_refresher(capacity: usize) -> (Arc<CredentialRefresher>, Arc<GaugedSource>) {
    let source = Arc::new(GaugedSource::default());
    let refresher = CredentialRefresher::new(
        source.clone(),
        CredentialSelector::new(StorageBackend::S3),
        None,
        RefresherConfig {
            capacity,
            ..Default::default()
        },
    )
    .expect("refresher")
    .with_clock(Arc::new(ManualClock::new(NOW)));
    (Arc::new(refresher), source)
}

fn spawn_read(
    refresher: &Arc<CredentialRefresher>,
    resource: &str,
) -> tokio::task::JoinHandle<Result<Credential>> {
    let refresher = Arc::clone(refresher);
    let resource = resource.to_string();
    tokio::spawn(async move { refresher.get_active_credential(&resource).await })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalidate_during_refresh_keeps_single_flight() {
    let (refresher, source) = gauged_refresher(16);

    let first = spawn_read(&refresher, "catalog.db.tbl");
    tokio::time::sleep(Duration::from_millis(20)).await;
    refresher.invalidate("catalog.db.tbl");
    let second = spawn_read(&refresher, "catalog.db.tbl");

    let first = first.await.expect("task panicked").expect("credential");
    let second = second.await.expect("task panicked").expect("credential");

    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    // The invalidation still forces one more load once the first finished.
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_ne!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_eviction_skips_entries_being_refreshed() {
    let (refresher, source) = gauged_refresher(1);

    let first = spawn_read(&refresher, "catalog.db.a");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let other = spawn_read(&refresher, "catalog.db.b");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let again = spawn_read(&refresher, "catalog.db.a");

    let first = first.await.expect("task panicked").expect("credential");
    other.await.expect("task panicked").expect("credential");
    let again = again.await.expect("task panicked").expect("credential");

    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(first, again);

    // Once idle, the bound applies again on the next insertion.
    refresher.get_active_credential("catalog.db.c").await.unwrap();
    assert_eq!(refresher.len(), 1);
}

#[derive(Debug, Default)]
struct CountingIssuer {
    calls: AtomicUsize,
}

#[async_trait]
impl SessionTokenIssuer for CountingIssuer {
    async fn issue(&self, request: TokenRequest) -> Result<IssuedToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.read_locations.is_empty() {
            return Err(CredentialError::source("no locations to scope"));
        }
        Ok(IssuedToken {
            access_key_id: Some(format!("ASIA{}", n)),
            secret_access_key: Some("secret".to_string()),
            token: "session".to_string(),
            expire_time_ms: NOW + 3_600_000,
        })
    }
}

#[tokio::test]
async fn test_provider_backed_resolver() {
    let issuer = Arc::new(CountingIssuer::default());
    let props: HashMap<String, String> = [
        (keys::S3_ACCESS_KEY_ID, "AKIA"),
        (keys::S3_SECRET_ACCESS_KEY, "static-secret"),
        (keys::S3_ROLE_ARN, "arn:aws:iam::123456789012:role/lake"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let providers = vec![
        create_provider(StorageBackend::S3, "s3-secret-key", &props, None).unwrap(),
        create_provider(StorageBackend::S3, "s3-token", &props, Some(issuer.clone())).unwrap(),
    ];
    let source = ProviderCredentialSource::read_only(providers);
    let refresher = CredentialRefresher::new(
        Arc::new(source),
        CredentialSelector::new(StorageBackend::S3),
        None,
        RefresherConfig::default(),
    )
    .unwrap()
    .with_clock(Arc::new(ManualClock::new(NOW)));
    let resolver: Arc<dyn CredentialResolver> = Arc::new(refresher);

    let credential = resolver.resolve("s3://lake/warehouse/db/tbl").await.unwrap();
    assert_eq!(credential.kind(), CredentialKind::S3Token);
    resolver.resolve("s3://lake/warehouse/db/tbl").await.unwrap();
    assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);

    resolver.invalidate("s3://lake/warehouse/db/tbl");
    let reissued = resolver.resolve("s3://lake/warehouse/db/tbl").await.unwrap();
    assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    assert_ne!(reissued, credential);
}
