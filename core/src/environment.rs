//! Dependency injection traits for the fetch boundary.
//!
//! All external dependencies are abstracted behind traits and passed in
//! explicitly. The cache and the operation store never know how a value is
//! produced for a key; they only see this seam.

use futures::future::BoxFuture;

/// The future a fetch collaborator hands back: eventually a domain value or
/// a domain failure.
pub type FetchFuture<'a, T, E> = BoxFuture<'a, Result<T, E>>;

/// Trait for the data-fetching collaborator.
///
/// Implementations resolve with a domain value or fail with a domain error
/// value; the core does not interpret either shape. The returned future must
/// be `'static` because it outlives the call that started it.
///
/// # Examples
///
/// ```ignore
/// // Production - an HTTP-backed fetcher
/// struct ApiFetch { client: HttpClient }
///
/// impl FetchByKey for ApiFetch {
///     type Value = Record;
///     type Error = ApiError;
///
///     fn fetch_by_key(&self, key: &str) -> FetchFuture<'static, Record, ApiError> {
///         let request = self.client.get(key);
///         Box::pin(async move { request.await })
///     }
/// }
///
/// // Test - canned responses, see the keyfetch-testing crate
/// ```
pub trait FetchByKey: Send + Sync {
    /// The domain value a successful fetch produces
    type Value: Send;

    /// The domain failure an unsuccessful fetch produces
    type Error: Send;

    /// Start fetching the value for `key`.
    ///
    /// Called at most once per cache miss; never called on a cache hit or
    /// when there is no current selection.
    fn fetch_by_key(&self, key: &str) -> FetchFuture<'static, Self::Value, Self::Error>;
}
