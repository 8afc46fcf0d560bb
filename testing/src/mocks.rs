//! Mock implementations of the fetch boundary.
//!
//! Two mocks cover the two kinds of test:
//!
//! - [`ScriptedFetch`] settles immediately with canned responses — right
//!   for hit/miss counting and end-to-end flows.
//! - [`ManualFetch`] parks every call until the test settles it explicitly
//!   — right for staleness and teardown properties where settle order is
//!   the point.

use keyfetch_core::{FetchByKey, FetchFuture};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Per-key invocation counts shared between a mock and the test observing it.
struct CallLog {
    calls: Mutex<HashMap<String, usize>>,
}

impl CallLog {
    fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn note(&self, key: &str) {
        *self.calls.lock().unwrap().entry(key.to_owned()).or_insert(0) += 1;
    }

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn for_key(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

/// Fetch mock with canned per-key responses and immediate settles.
///
/// Configure with the builder methods, then hand a reference to the code
/// under test. Every invocation is counted, so "the fetch ran exactly
/// once" assertions are one call away.
///
/// # Panics
///
/// A fetch for a key with no scripted response panics: the test forgot to
/// script it, which should fail loudly.
pub struct ScriptedFetch<T, E> {
    responses: Arc<Mutex<HashMap<String, Result<T, E>>>>,
    calls: Arc<CallLog>,
}

impl<T, E> Clone for ScriptedFetch<T, E> {
    fn clone(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T, E> Default for ScriptedFetch<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> ScriptedFetch<T, E> {
    /// Create a mock with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(CallLog::new()),
        }
    }

    /// Script a successful response for `key`.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    pub fn succeeds(self, key: &str, value: T) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_owned(), Ok(value));
        self
    }

    /// Script a failing response for `key`.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    pub fn fails(self, key: &str, error: E) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_owned(), Err(error));
        self
    }

    /// How many times `key` has been fetched.
    #[must_use]
    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.for_key(key)
    }

    /// How many fetches have run across all keys.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.total()
    }
}

impl<T, E> FetchByKey for ScriptedFetch<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Value = T;
    type Error = E;

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    #[allow(clippy::panic)] // An unscripted key is a broken test
    fn fetch_by_key(&self, key: &str) -> FetchFuture<'static, T, E> {
        self.calls.note(key);
        let response = self.responses.lock().unwrap().get(key).cloned();
        match response {
            Some(outcome) => Box::pin(std::future::ready(outcome)),
            None => panic!("no scripted response for key `{key}`"),
        }
    }
}

/// Fetch mock whose calls settle only when the test says so.
///
/// Every `fetch_by_key` call parks on a gate. The test settles parked
/// calls in any order with [`resolve`](Self::resolve) /
/// [`fail`](Self::fail), which is how deliberately reordered settles are
/// injected. Calls for the same key settle oldest-first.
///
/// # Panics
///
/// A parked fetch panics if the mock is dropped before the test settles
/// it — a hung assertion is turned into a loud failure.
pub struct ManualFetch<T, E> {
    pending: Arc<Mutex<HashMap<String, VecDeque<oneshot::Sender<Result<T, E>>>>>>,
    calls: Arc<CallLog>,
}

impl<T, E> Clone for ManualFetch<T, E> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T, E> Default for ManualFetch<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> ManualFetch<T, E> {
    /// Create a mock with no parked calls.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(CallLog::new()),
        }
    }

    /// Settle the oldest parked call for `key` successfully.
    ///
    /// Returns whether a parked call existed and was still awaited.
    pub fn resolve(&self, key: &str, value: T) -> bool {
        self.settle(key, Ok(value))
    }

    /// Settle the oldest parked call for `key` with a failure.
    ///
    /// Returns whether a parked call existed and was still awaited.
    pub fn fail(&self, key: &str, error: E) -> bool {
        self.settle(key, Err(error))
    }

    /// How many calls for `key` are currently parked.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    pub fn pending_for(&self, key: &str) -> usize {
        self.pending
            .lock()
            .unwrap()
            .get(key)
            .map_or(0, VecDeque::len)
    }

    /// How many times `key` has been fetched.
    #[must_use]
    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.for_key(key)
    }

    /// How many fetches have run across all keys.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.total()
    }

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn settle(&self, key: &str, outcome: Result<T, E>) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front);
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

impl<T, E> FetchByKey for ManualFetch<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    type Value = T;
    type Error = E;

    #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable
    fn fetch_by_key(&self, key: &str) -> FetchFuture<'static, T, E> {
        self.calls.note(key);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .entry(key.to_owned())
            .or_default()
            .push_back(tx);

        Box::pin(async move {
            #[allow(clippy::expect_used)] // A dropped gate is a broken test
            rx.await.expect("manual fetch dropped before it was settled")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_fetch_counts_calls() {
        let fetcher: ScriptedFetch<u32, String> =
            ScriptedFetch::new().succeeds("a", 1).fails("b", "e".to_owned());

        assert_eq!(fetcher.fetch_by_key("a").await, Ok(1));
        assert_eq!(fetcher.fetch_by_key("a").await, Ok(1));
        assert_eq!(fetcher.fetch_by_key("b").await, Err("e".to_owned()));

        assert_eq!(fetcher.calls_for("a"), 2);
        assert_eq!(fetcher.calls_for("b"), 1);
        assert_eq!(fetcher.total_calls(), 3);
    }

    #[tokio::test]
    async fn manual_fetch_settles_on_demand() {
        let fetcher: ManualFetch<u32, String> = ManualFetch::new();

        let parked = fetcher.fetch_by_key("a");
        assert_eq!(fetcher.pending_for("a"), 1);

        assert!(fetcher.resolve("a", 7));
        assert_eq!(parked.await, Ok(7));
        assert_eq!(fetcher.pending_for("a"), 0);
    }

    #[tokio::test]
    async fn manual_fetch_settles_oldest_first() {
        let fetcher: ManualFetch<u32, String> = ManualFetch::new();

        let first = fetcher.fetch_by_key("a");
        let second = fetcher.fetch_by_key("a");

        assert!(fetcher.resolve("a", 1));
        assert!(fetcher.fail("a", "late".to_owned()));

        assert_eq!(first.await, Ok(1));
        assert_eq!(second.await, Err("late".to_owned()));
    }

    #[test]
    fn settle_without_parked_call_reports_false() {
        let fetcher: ManualFetch<u32, String> = ManualFetch::new();
        assert!(!fetcher.resolve("a", 1));
    }
}
