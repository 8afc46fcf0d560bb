//! # Keyfetch Cache
//!
//! Keyed result cache for the keyfetch architecture.
//!
//! A [`ResultCache`] deduplicates fetch-by-key operations within one
//! session: a lookup by key either yields a previously stored result
//! synchronously, or triggers the underlying fetch and records the value
//! once it resolves. The cache is handed to operation initiators as an
//! explicit dependency — there is no ambient singleton.
//!
//! ## Control Flow
//!
//! [`ResultCache::lookup_or_fetch`] consults the mapping first. On a hit it
//! hands the stored value straight to the store's resolved path with no
//! asynchronous round-trip. On a miss it composes the fetch with a side
//! effect that records `key → value` *before* the value is delivered
//! onward, then feeds the composed future into
//! [`OperationStore::start`](keyfetch_runtime::OperationStore::start).
//!
//! ## Concurrency
//!
//! Lookups for different keys never interact. Two concurrent lookups for
//! the same key may both reach the fetcher and both record on completion —
//! last write wins, and values for a given key are expected identical. The
//! mapping itself sits behind an `RwLock`, so inserts are safe across
//! threads.
//!
//! ## Example
//!
//! ```ignore
//! let cache: ResultCache<Record> = ResultCache::new();
//! let store = OperationStore::new();
//!
//! // Miss: fetches, records, resolves.
//! let mut handle = cache.lookup_or_fetch(&store, Some("pikachu"), &fetcher).await?;
//! handle.settled().await;
//!
//! // Hit: resolves synchronously, the fetcher is never invoked.
//! cache.lookup_or_fetch(&store, Some("pikachu"), &fetcher).await?;
//! assert_eq!(cache.list(), vec!["pikachu".to_owned()]);
//! ```

use keyfetch_core::{FetchByKey, FetchFuture};
use keyfetch_runtime::{OperationHandle, OperationStore, ScopeError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Insertion-ordered mapping from key to previously resolved value.
///
/// A key is present if and only if a request for that key has completed
/// successfully (or was recorded explicitly). Keys are never removed.
/// Clones are cheap handles onto the same mapping, which is how one session
/// shares its cache across every operation initiator.
pub struct ResultCache<T> {
    inner: Arc<RwLock<CacheInner<T>>>,
}

struct CacheInner<T> {
    entries: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ResultCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty cache for a new session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
                order: Vec::new(),
            })),
        }
    }

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn read(&self) -> std::sync::RwLockReadGuard<'_, CacheInner<T>> {
        self.inner.read().unwrap()
    }

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CacheInner<T>> {
        self.inner.write().unwrap()
    }

    /// Insert `key → value` directly.
    ///
    /// Used when a result was produced by means other than a lookup miss.
    /// Re-recording an existing key overwrites the value but keeps the
    /// key's original position in [`list`](Self::list).
    pub fn record(&self, key: &str, value: T) {
        let mut inner = self.write();
        if !inner.entries.contains_key(key) {
            inner.order.push(key.to_owned());
        }
        inner.entries.insert(key.to_owned(), value);
        metrics::counter!("cache.inserts").increment(1);
    }

    /// The stored value for `key`, if a request for it has completed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        self.read().entries.get(key).cloned()
    }

    /// Whether `key` has a stored value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.read().entries.contains_key(key)
    }

    /// The keys recorded so far, in insertion order.
    ///
    /// Finite and restartable: recomputed from the mapping on every call.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.read().order.clone()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether the cache holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Serve `selection` from the cache, or fetch it and record the result.
    ///
    /// - With no current selection (absent or empty key), no operation is
    ///   started and the cache is not consulted; the store's state becomes
    ///   `Idle`.
    /// - On a hit, the stored value goes straight to the store via its
    ///   resolved path; the fetcher is never invoked and the returned
    ///   handle is already settled.
    /// - On a miss, `fetcher.fetch_by_key` runs and the value is recorded
    ///   into the mapping before it is delivered onward. A failed fetch
    ///   records nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ScopeClosed`] if `store`'s scope has been torn
    /// down. A domain fetch failure is not an error here — it settles into
    /// the store's rejected state.
    #[tracing::instrument(skip(self, store, fetcher), name = "cache_lookup")]
    pub async fn lookup_or_fetch<E, F>(
        &self,
        store: &OperationStore<T, E>,
        selection: Option<&str>,
        fetcher: &F,
    ) -> Result<OperationHandle, ScopeError>
    where
        E: Clone + Send + Sync + 'static,
        F: FetchByKey<Value = T, Error = E> + ?Sized,
    {
        // Fail before any cache access or fetch side effect.
        if !store.is_alive() {
            return Err(ScopeError::ScopeClosed);
        }

        let Some(key) = selection.filter(|key| !key.is_empty()) else {
            return store.start(no_operation::<T, E>).await;
        };

        if let Some(value) = self.get(key) {
            metrics::counter!("cache.hits").increment(1);
            tracing::debug!(key, "cache hit");
            store.set_result(value).await?;
            return Ok(OperationHandle::completed());
        }

        metrics::counter!("cache.misses").increment(1);
        tracing::debug!(key, "cache miss, fetching");

        let fetch = fetcher.fetch_by_key(key);
        let cache = self.clone();
        let key = key.to_owned();

        store
            .start(move || {
                Some(async move {
                    let value = fetch.await?;
                    cache.record(&key, value.clone());
                    Ok(value)
                })
            })
            .await
    }
}

fn no_operation<T, E>() -> Option<FetchFuture<'static, T, E>> {
    None
}
