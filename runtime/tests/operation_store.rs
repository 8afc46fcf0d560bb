//! Integration tests for the `OperationStore` lifecycle.
//!
//! These cover the ordering and liveness guarantees: transitions happen in
//! settle order filtered by generation, superseded outcomes are discarded,
//! and nothing mutates after teardown.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code

use keyfetch_core::{FetchByKey, OperationState, Status};
use keyfetch_runtime::{OperationStore, ScopeError};
use keyfetch_testing::ManualFetch;
use std::future::Ready;
use tokio::sync::oneshot;
use tokio_test::assert_ok;

fn no_operation() -> Option<Ready<Result<u32, String>>> {
    None
}

#[tokio::test]
async fn empty_input_is_idle() {
    let store: OperationStore<u32, String> = OperationStore::new();

    let mut handle = assert_ok!(store.start(no_operation).await);
    handle.settled().await;

    assert_eq!(store.snapshot().await.status(), Status::Idle);
}

#[tokio::test]
async fn empty_input_is_idle_regardless_of_prior_operations() {
    let store: OperationStore<u32, String> = OperationStore::new();

    let mut handle = assert_ok!(
        store
            .start(|| Some(std::future::ready(Ok::<_, String>(3))))
            .await
    );
    handle.settled().await;
    assert_eq!(store.snapshot().await.status(), Status::Resolved);

    let mut handle = assert_ok!(store.start(no_operation).await);
    handle.settled().await;
    assert_eq!(store.snapshot().await, OperationState::idle());
}

#[tokio::test]
async fn pending_then_resolved() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let (gate, parked) = oneshot::channel::<Result<u32, String>>();

    let mut handle = assert_ok!(
        store
            .start(move || Some(async move { parked.await.expect("gate") }))
            .await
    );

    // Pending is applied synchronously, before the operation settles.
    assert_eq!(store.snapshot().await.status(), Status::Pending);

    gate.send(Ok(7)).unwrap();
    handle.settled().await;

    let state = store.snapshot().await;
    assert_eq!(state.status(), Status::Resolved);
    assert_eq!(state.data(), Some(&7));
    assert!(state.error().is_none());
}

#[tokio::test]
async fn pending_then_rejected() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let (gate, parked) = oneshot::channel::<Result<u32, String>>();

    let mut handle = assert_ok!(
        store
            .start(move || Some(async move { parked.await.expect("gate") }))
            .await
    );
    assert_eq!(store.snapshot().await.status(), Status::Pending);

    gate.send(Err("not found".to_owned())).unwrap();
    handle.settled().await;

    let state = store.snapshot().await;
    assert_eq!(state.status(), Status::Rejected);
    assert!(state.data().is_none());
    assert_eq!(state.error().map(String::as_str), Some("not found"));
}

#[tokio::test]
async fn superseded_outcome_is_discarded_when_it_settles_last() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let fetcher: ManualFetch<u32, String> = ManualFetch::new();

    // Operation A starts first; B supersedes it before either settles.
    let parked_a = fetcher.fetch_by_key("mew");
    let mut handle_a = assert_ok!(store.start(move || Some(parked_a)).await);

    let parked_b = fetcher.fetch_by_key("pikachu");
    let mut handle_b = assert_ok!(store.start(move || Some(parked_b)).await);

    // B settles first and wins.
    assert!(fetcher.resolve("pikachu", 25));
    handle_b.settled().await;
    assert_eq!(store.snapshot().await.data(), Some(&25));

    // A settles last but started first: its outcome is dropped silently.
    assert!(fetcher.resolve("mew", 151));
    handle_a.settled().await;

    let state = store.snapshot().await;
    assert_eq!(state.status(), Status::Resolved);
    assert_eq!(state.data(), Some(&25));
}

#[tokio::test]
async fn superseded_outcome_is_discarded_when_it_settles_first() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let fetcher: ManualFetch<u32, String> = ManualFetch::new();

    let parked_a = fetcher.fetch_by_key("mew");
    let mut handle_a = assert_ok!(store.start(move || Some(parked_a)).await);

    let parked_b = fetcher.fetch_by_key("pikachu");
    let mut handle_b = assert_ok!(store.start(move || Some(parked_b)).await);

    // A settles while B is still in flight: visible state stays pending.
    assert!(fetcher.resolve("mew", 151));
    handle_a.settled().await;
    assert_eq!(store.snapshot().await.status(), Status::Pending);

    assert!(fetcher.resolve("pikachu", 25));
    handle_b.settled().await;
    assert_eq!(store.snapshot().await.data(), Some(&25));
}

#[tokio::test]
async fn injected_result_supersedes_operation_in_flight() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let fetcher: ManualFetch<u32, String> = ManualFetch::new();

    let parked = fetcher.fetch_by_key("pikachu");
    let mut handle = assert_ok!(store.start(move || Some(parked)).await);

    assert_ok!(store.set_result(25).await);
    assert_eq!(store.snapshot().await.data(), Some(&25));

    // The superseded fetch settles later with a different value; it loses.
    assert!(fetcher.resolve("pikachu", 999));
    handle.settled().await;
    assert_eq!(store.snapshot().await.data(), Some(&25));
}

#[tokio::test]
async fn injected_error_is_visible() {
    let store: OperationStore<u32, String> = OperationStore::new();

    assert_ok!(store.set_error("upstream offline".to_owned()).await);

    let state = store.snapshot().await;
    assert_eq!(state.status(), Status::Rejected);
    assert_eq!(state.error().map(String::as_str), Some("upstream offline"));
}

#[tokio::test]
async fn settles_after_teardown_never_mutate_state() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let fetcher: ManualFetch<u32, String> = ManualFetch::new();

    let parked = fetcher.fetch_by_key("late");
    let mut handle = assert_ok!(store.start(move || Some(parked)).await);
    let before = store.snapshot().await;

    store.teardown();
    assert!(!store.is_alive());

    assert!(fetcher.resolve("late", 9));
    handle.settled().await;

    // Reads stay valid and nothing changed.
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn mutations_after_teardown_fail_loudly() {
    let store: OperationStore<u32, String> = OperationStore::new();
    store.teardown();
    store.teardown(); // idempotent

    assert!(matches!(
        store.start(no_operation).await,
        Err(ScopeError::ScopeClosed)
    ));
    assert_eq!(store.set_result(1).await, Err(ScopeError::ScopeClosed));
    assert_eq!(
        store.set_error("e".to_owned()).await,
        Err(ScopeError::ScopeClosed)
    );
}

#[tokio::test]
async fn observers_see_the_latest_applied_state() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let observer = store.subscribe();

    assert_eq!(observer.borrow().status(), Status::Idle);

    let mut handle = assert_ok!(
        store
            .start(|| Some(std::future::ready(Ok::<_, String>(4))))
            .await
    );
    handle.settled().await;

    assert_eq!(observer.borrow().status(), Status::Resolved);
    assert_eq!(observer.borrow().data(), Some(&4));
}

#[tokio::test]
async fn clones_drive_the_same_operation_slot() {
    let store: OperationStore<u32, String> = OperationStore::new();
    let clone = store.clone();

    assert_ok!(clone.set_result(11).await);
    assert_eq!(store.snapshot().await.data(), Some(&11));

    store.teardown();
    assert!(!clone.is_alive());
}
