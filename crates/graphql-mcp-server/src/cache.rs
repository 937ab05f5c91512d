//! Time-bounded schema cache with single-flight refresh

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::SchemaError;
use crate::introspection::SchemaFetcher;
use crate::naming::NameRegistry;
use crate::schema::SchemaSnapshot;

/// Default time a fetched schema stays valid
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// One fetched schema together with the tool names derived from it
#[derive(Debug)]
pub struct SchemaGeneration {
    pub snapshot: SchemaSnapshot,
    pub registry: NameRegistry,
    pub fetched_at: Instant,
    pub expires_at: Instant,
}

impl SchemaGeneration {
    fn new(snapshot: SchemaSnapshot, ttl: Duration) -> Self {
        let fetched_at = Instant::now();
        Self {
            registry: NameRegistry::for_schema(&snapshot),
            snapshot,
            fetched_at,
            expires_at: fetched_at + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Refresh = Shared<BoxFuture<'static, Result<Arc<SchemaGeneration>, SchemaError>>>;

#[derive(Default)]
struct CacheState {
    /// The latest successfully fetched generation, possibly expired
    current: Option<Arc<SchemaGeneration>>,
    in_flight: Option<Refresh>,
}

struct Inner {
    fetcher: Arc<dyn SchemaFetcher>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

/// Owner of the live schema generation.
///
/// Concurrent callers that find no valid generation share a single fetch.
#[derive(Clone)]
pub struct SchemaService {
    inner: Arc<Inner>,
}

impl SchemaService {
    pub fn new(fetcher: Arc<dyn SchemaFetcher>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                ttl,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Get the live schema generation, fetching a new one if needed
    pub async fn generation(&self) -> Result<Arc<SchemaGeneration>, SchemaError> {
        let refresh = {
            let mut state = self.inner.state.lock().await;
            if let Some(refresh) = &state.in_flight {
                debug!("Waiting for in-flight schema fetch");
                refresh.clone()
            } else if let Some(current) = state
                .current
                .as_ref()
                .filter(|current| !current.is_expired(Instant::now()))
            {
                return Ok(current.clone());
            } else {
                let refresh = Self::refresh(self.inner.clone()).boxed().shared();
                state.in_flight = Some(refresh.clone());
                refresh
            }
        };
        refresh.await
    }

    async fn refresh(inner: Arc<Inner>) -> Result<Arc<SchemaGeneration>, SchemaError> {
        let result = inner
            .fetcher
            .fetch()
            .await
            .map(|snapshot| Arc::new(SchemaGeneration::new(snapshot, inner.ttl)));

        let mut state = inner.state.lock().await;
        state.in_flight = None;
        match &result {
            Ok(generation) => {
                info!(ttl = ?inner.ttl, "Fetched GraphQL schema");
                state.current = Some(generation.clone());
            }
            // The stale generation stays for inspection but is never served again
            Err(error) => warn!(%error, "Failed to fetch GraphQL schema"),
        }
        result
    }

    /// The latest fetched generation, even if it has expired
    pub async fn last_generation(&self) -> Option<Arc<SchemaGeneration>> {
        self.inner.state.lock().await.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeFetcher {
        calls: AtomicUsize,
        results: std::sync::Mutex<VecDeque<Result<&'static str, SchemaError>>>,
    }

    impl FakeFetcher {
        fn new(results: impl IntoIterator<Item = Result<&'static str, SchemaError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                results: std::sync::Mutex::new(results.into_iter().collect()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SchemaFetcher for FakeFetcher {
        async fn fetch(&self) -> Result<SchemaSnapshot, SchemaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            let next = self
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("type Query { fallback: String }"));
            SchemaSnapshot::from_sdl(next?, "schema.graphql")
        }
    }

    const SDL: &str = "type Query { hello: String }";

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let fetcher = FakeFetcher::new([Ok(SDL)]);
        let service = SchemaService::new(fetcher.clone(), DEFAULT_TTL);

        let generations =
            futures::future::join_all((0..8).map(|_| service.generation())).await;

        assert_eq!(fetcher.calls(), 1);
        let first = generations.first().unwrap().as_ref().unwrap();
        for generation in &generations {
            assert!(Arc::ptr_eq(first, generation.as_ref().unwrap()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reuses_generation_until_expiry() {
        let fetcher = FakeFetcher::new([Ok(SDL), Ok(SDL)]);
        let service = SchemaService::new(fetcher.clone(), Duration::from_secs(60));

        let first = service.generation().await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = service.generation().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        let third = service.generation().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        let failure = SchemaError::Request("connection refused".to_string());
        let fetcher = FakeFetcher::new([Ok(SDL), Err(failure.clone()), Ok(SDL)]);
        let service = SchemaService::new(fetcher.clone(), Duration::from_secs(1));

        let first = service.generation().await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(service.generation().await.unwrap_err(), failure);
        let stale = service.last_generation().await.unwrap();
        assert!(Arc::ptr_eq(&first, &stale));

        let recovered = service.generation().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &recovered));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_a_failure() {
        let failure = SchemaError::Request("timeout".to_string());
        let fetcher = FakeFetcher::new([Err(failure.clone())]);
        let service = SchemaService::new(fetcher.clone(), DEFAULT_TTL);

        let results = futures::future::join_all((0..4).map(|_| service.generation())).await;

        assert_eq!(fetcher.calls(), 1);
        for result in results {
            assert_eq!(result.unwrap_err(), failure);
        }
    }
}
