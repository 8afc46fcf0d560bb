//! # Keyfetch Testing
//!
//! Testing utilities and helpers for the keyfetch architecture.
//!
//! This crate provides:
//! - Mock implementations of the fetch boundary ([`ScriptedFetch`],
//!   [`ManualFetch`])
//! - A fluent Given-When-Then helper for the transition function
//!   ([`TransitionTest`])
//! - Test tracing initialization
//!
//! ## Example
//!
//! ```ignore
//! use keyfetch_testing::ScriptedFetch;
//!
//! #[tokio::test]
//! async fn test_lookup_flow() {
//!     let fetcher = ScriptedFetch::new().succeeds("pikachu", record.clone());
//!     let mut handle = cache
//!         .lookup_or_fetch(&store, Some("pikachu"), &fetcher)
//!         .await?;
//!     handle.settled().await;
//!
//!     assert_eq!(fetcher.calls_for("pikachu"), 1);
//! }
//! ```

pub mod mocks;

pub use mocks::{ManualFetch, ScriptedFetch};
pub use transition_test::TransitionTest;

/// Initialize a fmt tracing subscriber for tests.
///
/// Idempotent: only the first call installs a subscriber, so test functions
/// can all call it without coordination. Filtering honors `RUST_LOG` and
/// defaults to `debug`.
pub fn init_test_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
