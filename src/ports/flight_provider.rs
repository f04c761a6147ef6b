//! Flight-inventory provider port.
//!
//! Two dependent search calls plus booking resolution. The outbound search
//! always carries a return date - a provider quirk - even when the trip is
//! conceptually one-way; [`FlightQuery::from_trip`] substitutes the
//! outbound date in that case so callers cannot forget.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::search::{BookingToken, ContinuationToken, Offer};
use crate::domain::trip::{AirportCode, CabinClass, TimeWindow, TripRequest};

/// Port for flight search and booking resolution.
#[async_trait]
pub trait FlightProvider: Send + Sync {
    /// First-phase search: outbound itineraries for the query.
    async fn search_outbound(&self, query: &FlightQuery) -> Result<OfferPage, ProviderError>;

    /// Second-phase search: return itineraries for one selected outbound
    /// offer, keyed by its continuation token.
    async fn search_return(
        &self,
        query: &FlightQuery,
        token: &ContinuationToken,
    ) -> Result<OfferPage, ProviderError>;

    /// Resolves a booking token to a provider booking reference.
    async fn resolve_booking(
        &self,
        query: &FlightQuery,
        token: &BookingToken,
    ) -> Result<BookingReference, ProviderError>;
}

/// The trip request is not complete enough to query the provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("trip request is missing required fields: {missing:?}")]
pub struct IncompleteTrip {
    pub missing: Vec<&'static str>,
}

/// Validated, provider-ready search parameters.
///
/// Serialization is canonical (fixed field order), so the serialized form
/// doubles as a deterministic cache fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightQuery {
    pub departure: AirportCode,
    pub arrival: AirportCode,
    pub outbound_date: NaiveDate,
    /// Always present; equals `outbound_date` for one-way trips.
    pub return_date: NaiveDate,
    pub one_way: bool,
    pub adults: u8,
    pub cabin: CabinClass,
    pub outbound_times: Option<TimeWindow>,
    pub return_times: Option<TimeWindow>,
    /// Carrier alliance filter, e.g. "SKYTEAM".
    pub include_airlines: Option<String>,
}

impl FlightQuery {
    /// Builds a query from a complete trip request.
    pub fn from_trip(
        trip: &TripRequest,
        include_airlines: Option<String>,
    ) -> Result<Self, IncompleteTrip> {
        if !trip.is_complete() {
            return Err(IncompleteTrip {
                missing: trip.missing_fields(),
            });
        }

        // is_complete guarantees the required fields below are present.
        let outbound_date = trip.outbound_date().ok_or_else(|| IncompleteTrip {
            missing: vec!["outbound_date"],
        })?;

        Ok(Self {
            departure: trip
                .departure()
                .cloned()
                .ok_or_else(|| IncompleteTrip {
                    missing: vec!["departure_id"],
                })?,
            arrival: trip.arrival().cloned().ok_or_else(|| IncompleteTrip {
                missing: vec!["arrival_id"],
            })?,
            outbound_date,
            return_date: trip.return_date().unwrap_or(outbound_date),
            one_way: !trip.is_round_trip(),
            adults: trip.adults().unwrap_or(1),
            cabin: trip.travel_class().unwrap_or(CabinClass::Economy),
            outbound_times: trip.outbound_times().cloned(),
            return_times: if trip.is_round_trip() {
                trip.return_times().cloned()
            } else {
                None
            },
            include_airlines,
        })
    }

    /// Deterministic fingerprint of the query parameters plus an optional
    /// continuation token, used as the result-cache key.
    pub fn fingerprint(&self, token: Option<&ContinuationToken>) -> String {
        let params = serde_json::to_string(self).unwrap_or_default();
        match token {
            Some(token) => format!("{params}|{}", token.as_str()),
            None => params,
        }
    }
}

/// Provider response to either search phase: the "best" ranking bucket and
/// the secondary bucket, each in the provider's internal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferPage {
    pub best: Vec<Offer>,
    pub other: Vec<Offer>,
}

impl OfferPage {
    pub fn is_empty(&self) -> bool {
        self.best.is_empty() && self.other.is_empty()
    }
}

/// Resolved booking handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReference {
    /// Who fulfills the booking, e.g. an airline or agency name.
    pub vendor: String,
    /// URL to complete the booking with the vendor.
    pub url: String,
}

/// Flight provider errors.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Request timed out.
    #[error("flight search timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Rate limited by the provider.
    #[error("rate limited by flight provider")]
    RateLimited,

    /// Provider returned a server error.
    #[error("provider unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// API key or authentication failed.
    #[error("flight provider authentication failed")]
    AuthenticationFailed,

    /// Failed to parse the provider response.
    #[error("could not parse provider response: {0}")]
    Parse(String),

    /// Provider rejected the request parameters.
    #[error("provider rejected the request: {0}")]
    InvalidRequest(String),

    /// Booking token expired or unknown; the offer stays selectable.
    #[error("booking is no longer available: {0}")]
    BookingUnavailable(String),
}

impl ProviderError {
    /// Returns true if an immediate retry of the same read-only call may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. }
                | ProviderError::Network(_)
                | ProviderError::RateLimited
                | ProviderError::Unavailable { .. }
        )
    }
}
