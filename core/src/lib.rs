//! # Keyfetch Core
//!
//! Core state model and boundary traits for the keyfetch architecture.
//!
//! This crate provides the pure, runtime-free pieces of a fetch-by-key
//! lifecycle: the observable state of one asynchronous operation, the closed
//! set of transitions that may mutate it, and the trait through which a
//! data-fetching collaborator is injected.
//!
//! ## Core Concepts
//!
//! - **`OperationState`**: The current view of one asynchronous operation
//!   (idle / pending / resolved / rejected)
//! - **`Transition`**: Tagged transition set, applied by a single dispatch
//!   function that enforces the state invariant
//! - **`FetchByKey`**: Injected dependency that produces a value for a key
//!
//! ## Architecture Principles
//!
//! - State is mutated only through [`transition::apply`]
//! - Exactly one of `data`/`error` is populated, and only when the status
//!   matches
//! - Dependencies are injected explicitly, never reached through ambient
//!   globals
//!
//! ## Example
//!
//! ```
//! use keyfetch_core::{apply, OperationState, Status, Transition};
//!
//! let mut state: OperationState<u32, String> = OperationState::idle();
//! apply(&mut state, Transition::Pending);
//! assert_eq!(state.status(), Status::Pending);
//!
//! apply(&mut state, Transition::Resolved(42));
//! assert_eq!(state.status(), Status::Resolved);
//! assert_eq!(state.data(), Some(&42));
//! assert!(state.error().is_none());
//! ```

pub mod environment;
pub mod state;
pub mod transition;

pub use environment::{FetchByKey, FetchFuture};
pub use state::{OperationState, Status};
pub use transition::{Transition, apply};
