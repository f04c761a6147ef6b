//! Two-phase, token-chained search orchestration.
//!
//! Phase one searches outbound itineraries. Phase two runs only for
//! offers the user actually selects, keyed by the continuation token the
//! first phase returned - never eagerly for every outbound offer, which
//! bounds provider call volume. Results are cached by parameter
//! fingerprint so identical searches never hit the provider twice within
//! the TTL.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::cache::SearchCache;
use super::errors::SearchError;
use super::offer::{ContinuationToken, Offer};
use crate::domain::trip::TripRequest;
use crate::ports::{FlightProvider, FlightQuery, OfferPage};

/// Fixed cap on offers surfaced from one search phase.
pub const MAX_OFFERS: usize = 5;

/// Runs the dependent two-phase provider search and caches results.
pub struct SearchOrchestrator<F: FlightProvider + ?Sized> {
    provider: Arc<F>,
    cache: SearchCache,
    include_airlines: Option<String>,
    max_parallel_returns: usize,
}

impl<F: FlightProvider + ?Sized> SearchOrchestrator<F> {
    pub fn new(
        provider: Arc<F>,
        cache_ttl: Duration,
        include_airlines: Option<String>,
        max_parallel_returns: usize,
    ) -> Self {
        Self {
            provider,
            cache: SearchCache::new(cache_ttl),
            include_airlines,
            max_parallel_returns: max_parallel_returns.max(1),
        }
    }

    /// First-phase search.
    ///
    /// For round trips, outbound offers without a continuation token are
    /// unbookable as round trips and dropped here (logged, not an error).
    /// An empty result set is `Ok(vec![])`, not an error.
    pub async fn search_outbound(&self, trip: &TripRequest) -> Result<Vec<Offer>, SearchError> {
        let query = self.query_for(trip)?;
        let require_continuation = trip.is_round_trip();
        self.cached_search(&query, None, require_continuation).await
    }

    /// Second-phase search for one selected outbound offer.
    pub async fn search_return(
        &self,
        trip: &TripRequest,
        token: &ContinuationToken,
    ) -> Result<Vec<Offer>, SearchError> {
        let query = self.query_for(trip)?;
        self.cached_search(&query, Some(token), false).await
    }

    /// Return searches for several selected outbound offers, issued in
    /// parallel with bounded concurrency.
    ///
    /// One failed search never aborts the others and never touches what
    /// is already cached; each token gets its own result.
    pub async fn search_returns_batch(
        &self,
        trip: &TripRequest,
        tokens: &[ContinuationToken],
    ) -> Vec<(ContinuationToken, Result<Vec<Offer>, SearchError>)> {
        stream::iter(tokens.to_vec())
            .map(|token| async move {
                let result = self.search_return(trip, &token).await;
                (token, result)
            })
            .buffer_unordered(self.max_parallel_returns)
            .collect()
            .await
    }

    fn query_for(&self, trip: &TripRequest) -> Result<FlightQuery, SearchError> {
        Ok(FlightQuery::from_trip(trip, self.include_airlines.clone())?)
    }

    async fn cached_search(
        &self,
        query: &FlightQuery,
        token: Option<&ContinuationToken>,
        require_continuation: bool,
    ) -> Result<Vec<Offer>, SearchError> {
        let key = query.fingerprint(token);
        if let Some(offers) = self.cache.get(&key).await {
            debug!(phase = token.map_or("outbound", |_| "return"), "search cache hit");
            return Ok(offers);
        }

        let page = self.call_with_retry(query, token).await?;
        let offers = select_top(page, require_continuation);
        self.cache.insert(key, offers.clone()).await;
        Ok(offers)
    }

    /// One immediate retry for these idempotent read-only calls; nothing
    /// beyond that.
    async fn call_with_retry(
        &self,
        query: &FlightQuery,
        token: Option<&ContinuationToken>,
    ) -> Result<OfferPage, SearchError> {
        match self.call(query, token).await {
            Ok(page) => Ok(page),
            Err(err) if err.is_retryable() => {
                warn!(%err, "search failed; retrying once");
                Ok(self.call(query, token).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn call(
        &self,
        query: &FlightQuery,
        token: Option<&ContinuationToken>,
    ) -> Result<OfferPage, crate::ports::ProviderError> {
        match token {
            Some(token) => self.provider.search_return(query, token).await,
            None => self.provider.search_outbound(query).await,
        }
    }
}

/// Applies the offer cap: "best" bucket first, remaining slots filled from
/// the secondary bucket, provider ranking order preserved. Optionally
/// keeps only offers that can seed a return search.
fn select_top(page: OfferPage, require_continuation: bool) -> Vec<Offer> {
    let mut selected = Vec::with_capacity(MAX_OFFERS);
    let mut dropped = 0usize;

    for offer in page.best.into_iter().chain(page.other) {
        if selected.len() == MAX_OFFERS {
            break;
        }
        if require_continuation && !offer.is_pairable() {
            dropped += 1;
            continue;
        }
        selected.push(offer);
    }

    if dropped > 0 {
        debug!(dropped, "dropped outbound offers without continuation tokens");
    }
    selected
}
