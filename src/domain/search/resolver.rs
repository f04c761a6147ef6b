//! Booking resolution for a selected offer.

use std::sync::Arc;

use tracing::warn;

use super::errors::SearchError;
use super::offer::Offer;
use crate::domain::trip::TripRequest;
use crate::ports::{BookingReference, FlightProvider, FlightQuery, ProviderError};

/// Resolves a selected offer's booking token to a provider booking
/// reference.
pub struct BookingResolver<F: FlightProvider + ?Sized> {
    provider: Arc<F>,
    include_airlines: Option<String>,
}

impl<F: FlightProvider + ?Sized> BookingResolver<F> {
    pub fn new(provider: Arc<F>, include_airlines: Option<String>) -> Self {
        Self {
            provider,
            include_airlines,
        }
    }

    /// Resolves one offer to a booking reference.
    ///
    /// An expired or unknown token is a soft failure: the error says so,
    /// and the caller keeps the selection so the user can retry or
    /// re-search. Resolution is not retried automatically.
    pub async fn resolve(
        &self,
        trip: &TripRequest,
        offer: &Offer,
    ) -> Result<BookingReference, SearchError> {
        let token = offer.booking_token.as_ref().ok_or(SearchError::NotBookable)?;
        let query = FlightQuery::from_trip(trip, self.include_airlines.clone())?;

        match self.provider.resolve_booking(&query, token).await {
            Ok(reference) => Ok(reference),
            Err(ProviderError::BookingUnavailable(reason)) => {
                warn!(%reason, "booking token could not be resolved");
                Err(SearchError::BookingUnavailable(reason))
            }
            Err(err) => Err(err.into()),
        }
    }
}
