//! # Keyfetch Runtime
//!
//! Runtime implementation for the keyfetch architecture.
//!
//! This crate provides the [`OperationStore`], the runtime that owns one
//! logical asynchronous operation slot: it applies transitions
//! synchronously, awaits settle outcomes on spawned tasks, and guarantees
//! that a superseded or post-teardown outcome never mutates visible state.
//!
//! ## Core Components
//!
//! - **`OperationStore`**: Owns the [`OperationState`] and runs operations
//! - **`OperationHandle`**: Lets a caller await the settle of one operation
//! - **Generation counter**: Every mutating entry point claims a new
//!   generation; a settling task compares its claim against the current
//!   generation before applying its outcome
//! - **Liveness flag**: Teardown flips it; late settles are dropped and new
//!   mutations are rejected
//!
//! ## Example
//!
//! ```ignore
//! use keyfetch_runtime::OperationStore;
//!
//! let store: OperationStore<Record, FetchError> = OperationStore::new();
//!
//! // Start an operation; state is Pending before the future is polled.
//! let mut handle = store.start(|| Some(fetch_record("pikachu"))).await?;
//! handle.settled().await;
//!
//! let state = store.snapshot().await;
//! assert!(state.is_settled());
//! ```

use keyfetch_core::{OperationState, Transition, apply};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{RwLock, watch};

pub use error::ScopeError;

/// Error types for the operation store
pub mod error {
    use thiserror::Error;

    /// Errors that can occur when driving an [`super::OperationStore`].
    ///
    /// A domain fetch failure is NOT represented here: it settles into
    /// `OperationState::error` and is handed to the caller's recovery
    /// collaborator. This enum covers misuse of the store itself, so the
    /// two can never be caught by the same recovery path.
    #[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ScopeError {
        /// The owning scope has been torn down
        ///
        /// Returned by every mutating entry point after `teardown()`.
        /// Starting new work against a dead scope is a programmer error,
        /// not a runtime condition.
        #[error("operation scope has been torn down")]
        ScopeClosed,
    }
}

/// Handle for awaiting the settle of one started operation.
///
/// The handle completes when the operation's settle task has finished,
/// whether its outcome was applied or discarded as stale. Synchronous paths
/// (no-op producer, cache hit) return an already-settled handle.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    done: watch::Receiver<bool>,
}

impl OperationHandle {
    fn new() -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { done: rx }, tx)
    }

    /// Create a handle that is already settled.
    ///
    /// Useful for initialization in loops where you need a `last_handle`,
    /// and returned by the synchronous paths of `start`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { done: rx }
    }

    /// Wait until the operation has settled.
    ///
    /// Returns immediately if it already has. Also returns if the settle
    /// task terminated abnormally, so a caller can never hang on a dead
    /// operation.
    pub async fn settled(&mut self) {
        let _ = self.done.wait_for(|done| *done).await;
    }

    /// Whether the operation has already settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        *self.done.borrow()
    }
}

/// The runtime for one logical asynchronous operation.
///
/// The store manages:
/// 1. The [`OperationState`] (behind an `RwLock` for concurrent access)
/// 2. The generation counter used to discard superseded outcomes
/// 3. The liveness flag used to discard post-teardown outcomes
/// 4. A `watch` channel publishing every applied state for observers
///
/// Clones are cheap handles onto the same operation slot.
///
/// # Ordering guarantee
///
/// The generation is claimed and the transition applied inside a single
/// write critical section, and a settle re-checks the generation and the
/// liveness flag inside that same critical section before applying its
/// outcome. Visible state is therefore always consistent with the most
/// recently started operation that has settled; an older start's outcome
/// can never overwrite a newer start's.
///
/// # Type Parameters
///
/// - `T`: The domain value produced by a successful operation
/// - `E`: The domain failure produced by an unsuccessful operation
pub struct OperationStore<T, E> {
    state: Arc<RwLock<OperationState<T, E>>>,
    generation: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    observers: Arc<watch::Sender<OperationState<T, E>>>,
}

impl<T, E> Clone for OperationStore<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            generation: Arc::clone(&self.generation),
            alive: Arc::clone(&self.alive),
            observers: Arc::clone(&self.observers),
        }
    }
}

impl<T, E> OperationStore<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a store with an idle initial state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(OperationState::idle())
    }

    /// Create a store with an explicit initial state.
    ///
    /// Use `OperationState::pending()` when the identifying key is already
    /// known at construction time, so observers never see an idle frame.
    #[must_use]
    pub fn with_initial(initial: OperationState<T, E>) -> Self {
        let (observers, _) = watch::channel(initial.clone());

        Self {
            state: Arc::new(RwLock::new(initial)),
            generation: Arc::new(AtomicU64::new(0)),
            alive: Arc::new(AtomicBool::new(true)),
            observers: Arc::new(observers),
        }
    }

    /// Start a new operation, superseding any operation still in flight.
    ///
    /// `producer` is called exactly once, synchronously:
    ///
    /// - `None` means there is nothing to do for the current input. State
    ///   becomes `Idle` immediately and no asynchronous work occurs.
    /// - `Some(future)` transitions state to `Pending` immediately
    ///   (before the future is first polled), then awaits it on a spawned
    ///   task. On success the state becomes `Resolved`, on failure
    ///   `Rejected` — in both cases only if this `start` is still the most
    ///   recent mutation when the future settles. A superseded outcome is
    ///   dropped silently; the drop is a deliberate non-event, not a
    ///   failure.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ScopeClosed`] if the scope has been torn down.
    #[tracing::instrument(skip(self, producer), name = "operation_start")]
    pub async fn start<P, Fut>(&self, producer: P) -> Result<OperationHandle, ScopeError>
    where
        P: FnOnce() -> Option<Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if !self.alive.load(Ordering::Acquire) {
            return Err(ScopeError::ScopeClosed);
        }

        metrics::counter!("store.operations.total").increment(1);

        let Some(operation) = producer() else {
            self.apply_latest(Transition::Idle).await;
            metrics::counter!("store.operations.idle").increment(1);
            tracing::debug!("no operation produced, state is idle");
            return Ok(OperationHandle::completed());
        };

        let claimed = self.apply_latest(Transition::Pending).await;
        tracing::debug!(generation = claimed, "operation pending");

        let (handle, done) = OperationHandle::new();
        let store = self.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = operation.await;
            let applied = store.settle(claimed, outcome).await;

            metrics::histogram!("store.operation.duration_seconds")
                .record(started.elapsed().as_secs_f64());
            if !applied {
                metrics::counter!("store.operations.stale_discarded").increment(1);
            }

            let _ = done.send(true);
        });

        Ok(handle)
    }

    /// Push a `Resolved` state directly, without an asynchronous round-trip.
    ///
    /// This is how a caller who already has the value in hand (a cache hit)
    /// short-circuits the fetch. The injection claims a new generation, so
    /// an operation still in flight is superseded by it.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ScopeClosed`] if the scope has been torn down.
    #[tracing::instrument(skip(self, value), name = "operation_set_result")]
    pub async fn set_result(&self, value: T) -> Result<(), ScopeError> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(ScopeError::ScopeClosed);
        }

        self.apply_latest(Transition::Resolved(value)).await;
        metrics::counter!("store.operations.injected").increment(1);
        tracing::debug!("result injected, state is resolved");
        Ok(())
    }

    /// Push a `Rejected` state directly, without an asynchronous round-trip.
    ///
    /// Symmetric to [`set_result`](Self::set_result) for a failure value a
    /// collaborator produced outside the fetch path.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ScopeClosed`] if the scope has been torn down.
    #[tracing::instrument(skip(self, error), name = "operation_set_error")]
    pub async fn set_error(&self, error: E) -> Result<(), ScopeError> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(ScopeError::ScopeClosed);
        }

        self.apply_latest(Transition::Rejected(error)).await;
        metrics::counter!("store.operations.injected").increment(1);
        tracing::debug!("error injected, state is rejected");
        Ok(())
    }

    /// Read current state via a closure.
    ///
    /// Access state through a closure to ensure the lock is released
    /// promptly:
    ///
    /// ```ignore
    /// let status = store.state(|s| s.status()).await;
    /// ```
    pub async fn state<F, U>(&self, f: F) -> U
    where
        F: FnOnce(&OperationState<T, E>) -> U,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Clone out the current state. No side effects.
    pub async fn snapshot(&self) -> OperationState<T, E> {
        self.state(Clone::clone).await
    }

    /// Subscribe to applied states.
    ///
    /// Every applied transition publishes a snapshot. Observers see the
    /// latest value; intermediate values may coalesce, which is acceptable
    /// for rendering.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OperationState<T, E>> {
        self.observers.subscribe()
    }

    /// Tear down the owning scope.
    ///
    /// Idempotent. After teardown no further mutation of the state may
    /// occur: every mutating entry point returns
    /// [`ScopeError::ScopeClosed`], and an outstanding operation that
    /// settles later is dropped before it touches the state. Reads remain
    /// valid.
    pub fn teardown(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            metrics::counter!("store.teardown.total").increment(1);
            tracing::debug!("scope torn down");
        }
    }

    /// Whether the owning scope is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Claim a new generation and apply `transition` in one critical
    /// section. Returns the claimed generation.
    async fn apply_latest(&self, transition: Transition<T, E>) -> u64 {
        let mut state = self.state.write().await;
        let claimed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        apply(&mut state, transition);
        self.observers.send_replace((*state).clone());
        claimed
    }

    /// Apply a settle outcome if its generation is still current and the
    /// scope is still alive. Returns whether the outcome was applied.
    async fn settle(&self, claimed: u64, outcome: Result<T, E>) -> bool {
        let mut state = self.state.write().await;

        if !self.alive.load(Ordering::Acquire) {
            tracing::trace!(generation = claimed, "dropping settle after teardown");
            return false;
        }
        if self.generation.load(Ordering::SeqCst) != claimed {
            tracing::trace!(generation = claimed, "dropping superseded settle");
            return false;
        }

        match outcome {
            Ok(data) => {
                apply(&mut state, Transition::Resolved(data));
                metrics::counter!("store.operations.resolved").increment(1);
                tracing::debug!(generation = claimed, "operation resolved");
            },
            Err(error) => {
                apply(&mut state, Transition::Rejected(error));
                metrics::counter!("store.operations.rejected").increment(1);
                tracing::debug!(generation = claimed, "operation rejected");
            },
        }

        self.observers.send_replace((*state).clone());
        true
    }
}

impl<T, E> Default for OperationStore<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
