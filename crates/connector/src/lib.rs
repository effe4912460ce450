//! Fetching per-recording analytics responses.
//!
//! A [`Fetcher`] turns an ISRC plus an optional query window into a
//! [`FetchOutcome`]. Fetchers never return errors to the batch: transport
//! and API failures are folded into `FetchOutcome::Failed` so one bad
//! identifier cannot stop a run.

pub mod fixture;
pub mod luminate;

use std::time::Duration;

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use streamwatch_core::{FetchOutcome, FetchQuery};

pub use fixture::FixtureFetcher;
pub use luminate::{FetchError, LuminateClient};

/// Source of raw analytics responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, isrc: &str, query: &FetchQuery) -> FetchOutcome;
}

/// Fetch every identifier in order, pausing `delay` between requests.
///
/// No pause follows the last request. Duplicate identifiers are fetched once.
pub async fn fetch_batch(
    fetcher: &dyn Fetcher,
    isrcs: &[String],
    query: &FetchQuery,
    delay: Duration,
) -> IndexMap<String, FetchOutcome> {
    let unique: IndexSet<&String> = isrcs.iter().collect();
    let total = unique.len();
    if total < isrcs.len() {
        tracing::debug!(skipped = isrcs.len() - total, "ignoring duplicate identifiers");
    }
    let mut results = IndexMap::with_capacity(total);

    for (i, isrc) in unique.into_iter().enumerate() {
        tracing::info!(isrc = %isrc, "fetching {}/{}", i + 1, total);
        let outcome = fetcher.fetch(isrc, query).await;
        if let FetchOutcome::Failed { reason } = &outcome {
            tracing::warn!(isrc = %isrc, %reason, "fetch failed");
        }
        results.insert(isrc.clone(), outcome);

        if i + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    results
}
