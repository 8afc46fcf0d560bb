//! Observable state of one asynchronous operation.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an asynchronous operation.
///
/// An operation starts [`Idle`](Status::Idle) (nothing to do), moves to
/// [`Pending`](Status::Pending) the moment work is started, and settles as
/// either [`Resolved`](Status::Resolved) or [`Rejected`](Status::Rejected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// No operation is running and none is requested
    Idle,

    /// An operation has been started and has not settled yet
    Pending,

    /// The most recent operation settled successfully
    Resolved,

    /// The most recent operation settled with a failure
    Rejected,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// The current view of one asynchronous operation.
///
/// # Invariant
///
/// `data` is populated if and only if `status` is [`Status::Resolved`], and
/// `error` if and only if `status` is [`Status::Rejected`]. Fields are
/// private so the invariant holds by construction; the only mutation path is
/// [`crate::transition::apply`].
///
/// # Type Parameters
///
/// - `T`: The domain value produced by a successful operation
/// - `E`: The domain failure produced by an unsuccessful operation
///
/// The core never interprets the shape of either.
///
/// # Example
///
/// ```
/// use keyfetch_core::{OperationState, Status};
///
/// let state: OperationState<u32, String> = OperationState::resolved(7);
/// assert_eq!(state.status(), Status::Resolved);
/// assert_eq!(state.data(), Some(&7));
/// assert!(state.error().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationState<T, E> {
    status: Status,
    data: Option<T>,
    error: Option<E>,
}

impl<T, E> OperationState<T, E> {
    /// State with no operation running and none requested.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
        }
    }

    /// State of an operation that has started but not settled.
    ///
    /// Also the right initial state when the identifying key is already
    /// known at construction time.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            status: Status::Pending,
            data: None,
            error: None,
        }
    }

    /// State of an operation that settled successfully with `data`.
    #[must_use]
    pub const fn resolved(data: T) -> Self {
        Self {
            status: Status::Resolved,
            data: Some(data),
            error: None,
        }
    }

    /// State of an operation that settled with `error`.
    #[must_use]
    pub const fn rejected(error: E) -> Self {
        Self {
            status: Status::Rejected,
            data: None,
            error: Some(error),
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The resolved value, present only when [`Status::Resolved`].
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// The failure value, present only when [`Status::Rejected`].
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    /// Whether the operation has settled (resolved or rejected).
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self.status, Status::Resolved | Status::Rejected)
    }

    /// Consume the state, yielding the resolved value if there is one.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Consume the state, yielding the failure value if there is one.
    #[must_use]
    pub fn into_error(self) -> Option<E> {
        self.error
    }
}

impl<T, E> Default for OperationState<T, E> {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;

    #[test]
    fn constructors_populate_matching_field_only() {
        let idle: OperationState<u32, String> = OperationState::idle();
        assert_eq!(idle.status(), Status::Idle);
        assert!(idle.data().is_none());
        assert!(idle.error().is_none());

        let pending: OperationState<u32, String> = OperationState::pending();
        assert_eq!(pending.status(), Status::Pending);
        assert!(pending.data().is_none());
        assert!(pending.error().is_none());

        let resolved: OperationState<u32, String> = OperationState::resolved(5);
        assert_eq!(resolved.status(), Status::Resolved);
        assert_eq!(resolved.data(), Some(&5));
        assert!(resolved.error().is_none());

        let rejected: OperationState<u32, String> =
            OperationState::rejected("boom".to_owned());
        assert_eq!(rejected.status(), Status::Rejected);
        assert!(rejected.data().is_none());
        assert_eq!(rejected.error().map(String::as_str), Some("boom"));
    }

    #[test]
    fn default_is_idle() {
        let state: OperationState<u32, String> = OperationState::default();
        assert_eq!(state, OperationState::idle());
    }

    #[test]
    fn settled_covers_both_terminal_statuses() {
        assert!(!OperationState::<u32, String>::idle().is_settled());
        assert!(!OperationState::<u32, String>::pending().is_settled());
        assert!(OperationState::<u32, String>::resolved(1).is_settled());
        assert!(OperationState::<u32, String>::rejected("e".to_owned()).is_settled());
    }

    #[test]
    fn into_data_and_into_error() {
        assert_eq!(
            OperationState::<u32, String>::resolved(9).into_data(),
            Some(9)
        );
        assert_eq!(OperationState::<u32, String>::pending().into_data(), None);
        assert_eq!(
            OperationState::<u32, String>::rejected("e".to_owned()).into_error(),
            Some("e".to_owned())
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Idle.to_string(), "idle");
        assert_eq!(Status::Pending.to_string(), "pending");
        assert_eq!(Status::Resolved.to_string(), "resolved");
        assert_eq!(Status::Rejected.to_string(), "rejected");
    }

    #[test]
    fn state_round_trips_through_serde() {
        let state: OperationState<u32, String> = OperationState::resolved(25);
        let json = serde_json::to_string(&state).unwrap();
        let back: OperationState<u32, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
