//! Pokedex example binary
//!
//! Walks the fetch-by-key lifecycle end to end: a miss that fetches, a hit
//! served from the cache, a failing lookup, and a teardown that discards a
//! late settle.

use keyfetch_cache::ResultCache;
use keyfetch_core::OperationState;
use keyfetch_runtime::OperationStore;
use pokedex::{Pokemon, PokedexError, StaticPokedex, render};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pokedex=debug,keyfetch_runtime=debug,keyfetch_cache=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Pokedex Example: keyfetch architecture ===\n");

    let pokedex = StaticPokedex::new();
    let cache: ResultCache<Pokemon> = ResultCache::new();

    // Each selection gets its own scope; the first two miss then hit.
    for selection in [None, Some("pikachu"), Some("pikachu"), Some("doesnotexist")] {
        println!(">>> Selection: {}", selection.unwrap_or("(none)"));
        let store = store_for(selection);

        match cache.lookup_or_fetch(&store, selection, &pokedex).await {
            Ok(mut handle) => {
                println!("    {}", render(selection, &store.snapshot().await));
                handle.settled().await;
                println!("    {}", render(selection, &store.snapshot().await));
            },
            Err(error) => println!("    scope error: {error}"),
        }

        store.teardown();
        println!();
    }

    // Tearing a scope down mid-flight: the late settle never lands.
    println!(">>> Selection: mew (torn down before the fetch settles)");
    let store = store_for(Some("mew"));
    match cache.lookup_or_fetch(&store, Some("mew"), &pokedex).await {
        Ok(mut handle) => {
            store.teardown();
            handle.settled().await;
            println!("    {}", render(Some("mew"), &store.snapshot().await));
        },
        Err(error) => println!("    scope error: {error}"),
    }
    println!();

    println!("Previously seen: {:?}", cache.list());

    println!("\n=== Lifecycle Demonstration Complete ===");
    println!("\nKey concepts demonstrated:");
    println!("  • OperationState: idle / pending / resolved / rejected");
    println!("  • OperationStore: runs one operation, discards stale settles");
    println!("  • ResultCache: lookup-or-fetch, hits resolve synchronously");
    println!("  • Teardown: a dead scope never changes state again");
}

fn store_for(selection: Option<&str>) -> OperationStore<Pokemon, PokedexError> {
    // A known selection starts its scope pending, so no idle frame shows.
    if selection.is_some_and(|key| !key.is_empty()) {
        OperationStore::with_initial(OperationState::pending())
    } else {
        OperationStore::new()
    }
}
