//! Tagged transition set and the dispatch function that applies it.
//!
//! Mirrors the reducer pattern: a closed set of transitions, each validated
//! against the state invariant by construction. Every arm rebuilds the full
//! state, so a transition to any non-resolved status clears `data` and a
//! transition to any non-rejected status clears `error`.

use crate::state::{OperationState, Status};

/// One state transition of an asynchronous operation.
///
/// The set is closed: no transition kind can exist outside this enum, so an
/// unhandled tag is a compile error rather than a runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T, E> {
    /// Nothing to do for the current input
    Idle,

    /// An operation has been started
    Pending,

    /// The operation settled successfully with a value
    Resolved(T),

    /// The operation settled with a failure
    Rejected(E),
}

impl<T, E> Transition<T, E> {
    /// The status this transition leads to.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Idle => Status::Idle,
            Self::Pending => Status::Pending,
            Self::Resolved(_) => Status::Resolved,
            Self::Rejected(_) => Status::Rejected,
        }
    }
}

/// Apply a transition to an operation state.
///
/// This is the only mutation path for [`OperationState`]. Each arm replaces
/// the whole state, which is what keeps the data/error invariant intact.
pub fn apply<T, E>(state: &mut OperationState<T, E>, transition: Transition<T, E>) {
    *state = match transition {
        Transition::Idle => OperationState::idle(),
        Transition::Pending => OperationState::pending(),
        Transition::Resolved(data) => OperationState::resolved(data),
        Transition::Rejected(error) => OperationState::rejected(error),
    };
}
