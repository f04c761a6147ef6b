//! Mock flight provider for testing.
//!
//! Scriptable per call type: queued outbound pages, per-token return
//! pages, and booking resolutions, with error injection and call tracking.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::search::{BookingToken, ContinuationToken, FlightLeg, Offer};
use crate::ports::{
    BookingReference, FlightProvider, FlightQuery, OfferPage, ProviderError,
};

/// Mock flight provider with queued responses and call tracking.
#[derive(Debug, Clone, Default)]
pub struct MockFlightProvider {
    outbound: Arc<Mutex<VecDeque<Result<OfferPage, ProviderError>>>>,
    returns: Arc<Mutex<HashMap<String, VecDeque<Result<OfferPage, ProviderError>>>>>,
    bookings: Arc<Mutex<VecDeque<Result<BookingReference, ProviderError>>>>,
    outbound_calls: Arc<AtomicUsize>,
    return_calls: Arc<AtomicUsize>,
    booking_calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl MockFlightProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outbound search response.
    pub fn with_outbound(self, response: Result<OfferPage, ProviderError>) -> Self {
        self.outbound.lock().unwrap().push_back(response);
        self
    }

    /// Queues a return search response for one continuation token.
    pub fn with_return(
        self,
        token: &str,
        response: Result<OfferPage, ProviderError>,
    ) -> Self {
        self.returns
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Queues a booking resolution response.
    pub fn with_booking(self, response: Result<BookingReference, ProviderError>) -> Self {
        self.bookings.lock().unwrap().push_back(response);
        self
    }

    /// Sets a simulated latency for every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn outbound_calls(&self) -> usize {
        self.outbound_calls.load(Ordering::SeqCst)
    }

    pub fn return_calls(&self) -> usize {
        self.return_calls.load(Ordering::SeqCst)
    }

    pub fn booking_calls(&self) -> usize {
        self.booking_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightProvider for MockFlightProvider {
    async fn search_outbound(&self, _query: &FlightQuery) -> Result<OfferPage, ProviderError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.outbound_calls.fetch_add(1, Ordering::SeqCst);
        self.outbound
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("mock outbound queue exhausted".into())))
    }

    async fn search_return(
        &self,
        _query: &FlightQuery,
        token: &ContinuationToken,
    ) -> Result<OfferPage, ProviderError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.return_calls.fetch_add(1, Ordering::SeqCst);
        self.returns
            .lock()
            .unwrap()
            .get_mut(token.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(ProviderError::Network(format!(
                    "mock has no return response for token {}",
                    token.as_str()
                )))
            })
    }

    async fn resolve_booking(
        &self,
        _query: &FlightQuery,
        _token: &BookingToken,
    ) -> Result<BookingReference, ProviderError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.booking_calls.fetch_add(1, Ordering::SeqCst);
        self.bookings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("mock booking queue exhausted".into())))
    }
}

/// Builds a one-segment offer for tests.
pub fn sample_offer(
    flight_number: &str,
    price_minor: u32,
    continuation_token: Option<&str>,
    booking_token: Option<&str>,
) -> Offer {
    Offer {
        legs: vec![FlightLeg {
            carrier: "Delta".to_string(),
            flight_number: flight_number.to_string(),
            departure_airport: "CDG".to_string(),
            departure_time: "2025-03-10 09:00".to_string(),
            arrival_airport: "AUS".to_string(),
            arrival_time: "2025-03-10 15:30".to_string(),
            duration_minutes: 390,
        }],
        layovers: vec![],
        price_minor,
        duration_minutes: 390,
        continuation_token: continuation_token.map(ContinuationToken::new),
        booking_token: booking_token.map(BookingToken::new),
    }
}
