//! # Pokedex Example
//!
//! An end-to-end demonstration of the keyfetch architecture: a user selects
//! a pokemon by name, the selection is looked up through a session cache,
//! and the operation store publishes the lifecycle the UI renders.
//!
//! This example showcases:
//! - A [`FetchByKey`] collaborator with simulated latency
//! - The four-way status render branch
//! - Cache-hit short-circuiting and the previously-seen listing
//!
//! ## Example
//!
//! ```no_run
//! use keyfetch_cache::ResultCache;
//! use keyfetch_runtime::OperationStore;
//! use pokedex::{Pokemon, StaticPokedex, render};
//!
//! # async fn example() -> Result<(), keyfetch_runtime::ScopeError> {
//! let cache: ResultCache<Pokemon> = ResultCache::new();
//! let store = OperationStore::new();
//!
//! let mut handle = cache
//!     .lookup_or_fetch(&store, Some("pikachu"), &StaticPokedex::new())
//!     .await?;
//! handle.settled().await;
//!
//! println!("{}", render(Some("pikachu"), &store.snapshot().await));
//! # Ok(())
//! # }
//! ```

use keyfetch_core::{FetchByKey, FetchFuture, OperationState, Status};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One pokedex record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    /// Canonical lowercase name
    pub name: String,
    /// National pokedex number
    pub number: u16,
    /// A few known attacks
    pub attacks: Vec<String>,
}

/// Failures the pokedex fetch can settle with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PokedexError {
    /// No record exists for the requested name
    #[error("no pokemon named `{0}`")]
    NotFound(String),
}

/// A fetch collaborator backed by a small built-in table.
///
/// Simulates the asynchronous round-trip with a configurable latency, so
/// the pending state is actually observable.
#[derive(Debug, Clone, Copy)]
pub struct StaticPokedex {
    latency: Duration,
}

impl StaticPokedex {
    /// Pokedex with the default simulated latency.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_latency(Duration::from_millis(25))
    }

    /// Pokedex with an explicit simulated latency.
    #[must_use]
    pub const fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for StaticPokedex {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchByKey for StaticPokedex {
    type Value = Pokemon;
    type Error = PokedexError;

    fn fetch_by_key(&self, key: &str) -> FetchFuture<'static, Pokemon, PokedexError> {
        let latency = self.latency;
        let name = key.to_lowercase();

        Box::pin(async move {
            tracing::debug!(name = %name, "fetching from the pokedex");
            tokio::time::sleep(latency).await;
            find(&name).ok_or(PokedexError::NotFound(name))
        })
    }
}

fn find(name: &str) -> Option<Pokemon> {
    let record = match name {
        "pikachu" => Pokemon {
            name: "pikachu".to_owned(),
            number: 25,
            attacks: vec!["Thunder Jolt".to_owned(), "Feint".to_owned()],
        },
        "charizard" => Pokemon {
            name: "charizard".to_owned(),
            number: 6,
            attacks: vec!["Fire Spin".to_owned(), "Slash".to_owned()],
        },
        "mew" => Pokemon {
            name: "mew".to_owned(),
            number: 151,
            attacks: vec!["Psychic".to_owned(), "Ancient Power".to_owned()],
        },
        _ => return None,
    };
    Some(record)
}

/// The four-way status branch a UI collaborator renders.
///
/// Idle shows the empty prompt, pending a loading indicator parameterized
/// by the current selection, rejected hands the error text to the recovery
/// surface, and resolved shows the record.
#[must_use]
pub fn render(
    selection: Option<&str>,
    state: &OperationState<Pokemon, PokedexError>,
) -> String {
    match state.status() {
        Status::Idle => "Submit a pokemon".to_owned(),
        Status::Pending => format!("Loading {}...", selection.unwrap_or("?")),
        Status::Rejected => state
            .error()
            .map_or_else(String::new, |error| format!("There was an error: {error}")),
        Status::Resolved => state.data().map_or_else(String::new, |pokemon| {
            serde_json::to_string_pretty(pokemon).unwrap_or_else(|_| format!("{pokemon:?}"))
        }),
    }
}
