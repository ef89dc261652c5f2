//! Status list fetching.
//!
//! The engine never talks HTTP itself. It calls an injected
//! [`StatusListFetcher`]; [`SingleFlightFetcher`] wraps any fetcher so that
//! concurrent lookups of one URL share a single underlying fetch and
//! successful bodies are reused until their TTL runs out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::FetchError;

/// Fetch capability for status list credential URLs.
#[async_trait]
pub trait StatusListFetcher: Send + Sync {
    /// Fetch the document served at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<F: StatusListFetcher + ?Sized> StatusListFetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}

/// Fixed URL to document map. Unknown URLs answer HTTP 404.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    documents: HashMap<String, Bytes>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn with_document(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl StatusListFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.documents.get(url).cloned().ok_or(FetchError::Http(404))
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Bytes, FetchError>>>;

#[derive(Debug, Clone)]
struct CachedDocument {
    body: Bytes,
    fetched_at: Instant,
}

/// At most one in-flight fetch per URL, plus a TTL cache of successful
/// responses. Failures are handed to every waiter but never cached.
pub struct SingleFlightFetcher<F> {
    inner: Arc<F>,
    in_flight: DashMap<String, SharedFetch>,
    cache: DashMap<String, CachedDocument>,
    ttl: Duration,
}

impl<F: StatusListFetcher + 'static> SingleFlightFetcher<F> {
    /// Wrap `inner`. A zero `ttl` disables caching but keeps de-duplication.
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self::from_arc(Arc::new(inner), ttl)
    }

    pub fn from_arc(inner: Arc<F>, ttl: Duration) -> Self {
        Self {
            inner,
            in_flight: DashMap::new(),
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Drop the cached document for `url`, if any.
    pub fn invalidate(&self, url: &str) -> bool {
        self.cache.remove(url).is_some()
    }

    /// Drop every cached document.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remove expired documents. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.cache.len();
        let ttl = self.ttl;
        self.cache.retain(|_, doc| doc.fetched_at.elapsed() < ttl);
        before - self.cache.len()
    }

    /// Number of cached documents, including expired ones not yet evicted.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Fresh cached body for `url`. An expired entry is evicted.
    fn cached_body(&self, url: &str) -> Option<Bytes> {
        {
            let doc = self.cache.get(url)?;
            if doc.fetched_at.elapsed() < self.ttl {
                return Some(doc.body.clone());
            }
        }
        self.cache
            .remove_if(url, |_, doc| doc.fetched_at.elapsed() >= self.ttl);
        None
    }

    fn join_or_start(&self, url: &str) -> SharedFetch {
        self.in_flight
            .entry(url.to_string())
            .or_insert_with(|| {
                tracing::debug!(url = %url, "starting status list fetch");
                let inner = Arc::clone(&self.inner);
                let url = url.to_string();
                async move { inner.fetch(&url).await }.boxed().shared()
            })
            .clone()
    }
}

#[async_trait]
impl<F: StatusListFetcher + 'static> StatusListFetcher for SingleFlightFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if let Some(body) = self.cached_body(url) {
            tracing::debug!(url = %url, "status list cache hit");
            return Ok(body);
        }

        let shared = self.join_or_start(url);
        let result = shared.clone().await;

        match &result {
            Ok(body) if !self.ttl.is_zero() => {
                let purged = self.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "evicted expired status lists");
                }
                self.cache.insert(
                    url.to_string(),
                    CachedDocument {
                        body: body.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(url = %url, error = %e, "status list fetch failed"),
        }

        // Only the fetch we awaited may be retired; a newer one stays.
        self.in_flight
            .remove_if(url, |_, current| current.ptr_eq(&shared));
        result
    }
}
