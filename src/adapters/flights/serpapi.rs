//! SerpAPI adapter - Google Flights searches over the FlightProvider port.
//!
//! Three logical calls share one parameter set: the outbound search, the
//! token-chained return search (`departure_token`), and booking resolution
//! (`booking_token`). Responses arrive as `best_flights` / `other_flights`
//! buckets which are passed through untouched; ranking and truncation are
//! the orchestrator's business.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::search::{
    BookingToken, ContinuationToken, FlightLeg, Layover, Offer,
};
use crate::ports::{
    BookingReference, FlightProvider, FlightQuery, OfferPage, ProviderError,
};

/// Configuration for the SerpAPI provider.
#[derive(Debug, Clone)]
pub struct SerpApiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Base URL of the search endpoint.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl SerpApiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: "https://serpapi.com/search".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// SerpAPI Google Flights provider implementation.
pub struct SerpApiProvider {
    config: SerpApiConfig,
    client: Client,
}

impl SerpApiProvider {
    /// Creates a new provider with the given configuration.
    pub fn new(config: SerpApiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Shared search parameters for every call variant.
    fn base_params(&self, query: &FlightQuery) -> Vec<(String, String)> {
        let mut params = vec![
            ("engine".to_string(), "google_flights".to_string()),
            ("departure_id".to_string(), query.departure.to_string()),
            ("arrival_id".to_string(), query.arrival.to_string()),
            ("outbound_date".to_string(), query.outbound_date.to_string()),
            // Provider quirk: return_date is required even for one-way
            // trips; FlightQuery substitutes the outbound date upstream.
            ("return_date".to_string(), query.return_date.to_string()),
            (
                "type".to_string(),
                if query.one_way { "2" } else { "1" }.to_string(),
            ),
            ("adults".to_string(), query.adults.to_string()),
            (
                "travel_class".to_string(),
                query.cabin.provider_code().to_string(),
            ),
            ("hl".to_string(), "en".to_string()),
        ];

        if let Some(ref airlines) = query.include_airlines {
            params.push(("include_airlines".to_string(), airlines.clone()));
        }
        if let Some(window) = &query.outbound_times {
            params.push(("outbound_times".to_string(), window.to_param()));
        }
        if let Some(window) = &query.return_times {
            params.push(("return_times".to_string(), window.to_param()));
        }

        params
    }

    async fn get(&self, mut params: Vec<(String, String)>) -> Result<Response, ProviderError> {
        params.push(("api_key".to_string(), self.config.api_key().to_string()));

        self.client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    ProviderError::Network(format!("Connection failed: {}", e))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ProviderError::AuthenticationFailed),
            429 => Err(ProviderError::RateLimited),
            400 => Err(ProviderError::InvalidRequest(error_body)),
            500..=599 => Err(ProviderError::Unavailable {
                status: status.as_u16(),
                message: error_body,
            }),
            _ => Err(ProviderError::Network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }

    async fn search(&self, params: Vec<(String, String)>) -> Result<OfferPage, ProviderError> {
        let response = self.get(params).await?;
        let response = self.handle_response_status(response).await?;

        let wire: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = wire.error {
            return Err(classify_api_error(error));
        }

        debug!(
            best = wire.best_flights.len(),
            other = wire.other_flights.len(),
            "search response received"
        );

        Ok(OfferPage {
            best: wire.best_flights.into_iter().map(Offer::from).collect(),
            other: wire.other_flights.into_iter().map(Offer::from).collect(),
        })
    }
}

#[async_trait]
impl FlightProvider for SerpApiProvider {
    async fn search_outbound(&self, query: &FlightQuery) -> Result<OfferPage, ProviderError> {
        self.search(self.base_params(query)).await
    }

    async fn search_return(
        &self,
        query: &FlightQuery,
        token: &ContinuationToken,
    ) -> Result<OfferPage, ProviderError> {
        let mut params = self.base_params(query);
        params.push(("departure_token".to_string(), token.as_str().to_string()));
        self.search(params).await
    }

    async fn resolve_booking(
        &self,
        query: &FlightQuery,
        token: &BookingToken,
    ) -> Result<BookingReference, ProviderError> {
        let mut params = self.base_params(query);
        params.push(("booking_token".to_string(), token.as_str().to_string()));

        let response = self.get(params).await?;
        let response = self.handle_response_status(response).await?;

        let wire: BookingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = wire.error {
            return Err(ProviderError::BookingUnavailable(error));
        }

        wire.booking_options
            .into_iter()
            .find_map(booking_reference)
            .ok_or_else(|| {
                ProviderError::BookingUnavailable("no booking options returned".to_string())
            })
    }
}

/// Bad-request errors arrive as 200s with an `error` field; keys and
/// parameters need different downstream handling.
fn classify_api_error(error: String) -> ProviderError {
    let lowered = error.to_lowercase();
    if lowered.contains("api key") || lowered.contains("api_key") {
        ProviderError::AuthenticationFailed
    } else {
        ProviderError::InvalidRequest(error)
    }
}

fn booking_reference(option: ApiBookingOption) -> Option<BookingReference> {
    let together = option.together?;
    let url = together.booking_request.and_then(|r| r.url)?;
    Some(BookingReference {
        vendor: together
            .book_with
            .unwrap_or_else(|| "Google Flights".to_string()),
        url,
    })
}

// ----- SerpAPI wire types -----

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    best_flights: Vec<ApiFlightOption>,
    #[serde(default)]
    other_flights: Vec<ApiFlightOption>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiFlightOption {
    #[serde(default)]
    flights: Vec<ApiSegment>,
    #[serde(default)]
    layovers: Vec<ApiLayover>,
    total_duration: Option<u32>,
    price: Option<u32>,
    departure_token: Option<String>,
    booking_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    departure_airport: ApiAirport,
    arrival_airport: ApiAirport,
    duration: Option<u32>,
    airline: Option<String>,
    flight_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiAirport {
    id: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLayover {
    id: Option<String>,
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BookingResponse {
    #[serde(default)]
    booking_options: Vec<ApiBookingOption>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBookingOption {
    together: Option<ApiBookingSide>,
}

#[derive(Debug, Deserialize)]
struct ApiBookingSide {
    book_with: Option<String>,
    booking_request: Option<ApiBookingRequest>,
}

#[derive(Debug, Deserialize)]
struct ApiBookingRequest {
    url: Option<String>,
}

impl From<ApiFlightOption> for Offer {
    fn from(option: ApiFlightOption) -> Self {
        let legs: Vec<FlightLeg> = option.flights.into_iter().map(FlightLeg::from).collect();
        let summed: u32 = legs.iter().map(|l| l.duration_minutes).sum();

        Offer {
            duration_minutes: option.total_duration.unwrap_or(summed),
            layovers: option.layovers.into_iter().map(Layover::from).collect(),
            // Provider prices are whole currency units.
            price_minor: option.price.unwrap_or(0).saturating_mul(100),
            continuation_token: option.departure_token.map(ContinuationToken::new),
            booking_token: option.booking_token.map(BookingToken::new),
            legs,
        }
    }
}

impl From<ApiSegment> for FlightLeg {
    fn from(segment: ApiSegment) -> Self {
        Self {
            carrier: segment.airline.unwrap_or_default(),
            flight_number: segment.flight_number.unwrap_or_default(),
            departure_airport: segment.departure_airport.id.unwrap_or_default(),
            departure_time: segment.departure_airport.time.unwrap_or_default(),
            arrival_airport: segment.arrival_airport.id.unwrap_or_default(),
            arrival_time: segment.arrival_airport.time.unwrap_or_default(),
            duration_minutes: segment.duration.unwrap_or(0),
        }
    }
}

impl From<ApiLayover> for Layover {
    fn from(layover: ApiLayover) -> Self {
        Self {
            airport: layover.id.unwrap_or_default(),
            duration_minutes: layover.duration.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trip::{ExtractedUpdate, ParameterStore};
    use serde_json::json;

    fn provider() -> SerpApiProvider {
        SerpApiProvider::new(SerpApiConfig::new("test-key"))
    }

    fn query(payload: serde_json::Value) -> FlightQuery {
        let mut store = ParameterStore::new();
        store
            .merge(&ExtractedUpdate::from_value(&payload))
            .unwrap();
        FlightQuery::from_trip(store.current(), Some("SKYTEAM".to_string())).unwrap()
    }

    fn one_way_query() -> FlightQuery {
        query(json!({
            "departure_id": "CDG",
            "arrival_id": "AUS",
            "trip_type": "one_way",
            "outbound_date": "2025-03-10",
            "adults": 2,
            "travel_class": "business",
            "outbound_times": [4, 18]
        }))
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    mod request_building {
        use super::*;

        #[test]
        fn one_way_params_still_carry_a_return_date() {
            let params = provider().base_params(&one_way_query());
            assert_eq!(param(&params, "type"), Some("2"));
            assert_eq!(param(&params, "outbound_date"), Some("2025-03-10"));
            assert_eq!(param(&params, "return_date"), Some("2025-03-10"));
        }

        #[test]
        fn cabin_and_counts_use_provider_codes() {
            let params = provider().base_params(&one_way_query());
            assert_eq!(param(&params, "travel_class"), Some("3"));
            assert_eq!(param(&params, "adults"), Some("2"));
        }

        #[test]
        fn alliance_filter_and_time_windows_pass_through() {
            let params = provider().base_params(&one_way_query());
            assert_eq!(param(&params, "include_airlines"), Some("SKYTEAM"));
            assert_eq!(param(&params, "outbound_times"), Some("4,18"));
            assert_eq!(param(&params, "return_times"), None);
        }

        #[test]
        fn round_trip_sends_both_dates_and_windows() {
            let query = query(json!({
                "departure_id": "CDG",
                "arrival_id": "AUS",
                "trip_type": "round_trip",
                "outbound_date": "2025-03-10",
                "return_date": "2025-03-20",
                "adults": 1,
                "travel_class": "economy",
                "return_times": [6, 22]
            }));
            let params = provider().base_params(&query);
            assert_eq!(param(&params, "type"), Some("1"));
            assert_eq!(param(&params, "return_date"), Some("2025-03-20"));
            assert_eq!(param(&params, "return_times"), Some("6,22"));
        }
    }

    mod response_mapping {
        use super::*;

        fn sample_option() -> ApiFlightOption {
            serde_json::from_value(json!({
                "flights": [
                    {
                        "departure_airport": { "name": "Paris Charles de Gaulle", "id": "CDG", "time": "2025-03-10 09:40" },
                        "arrival_airport": { "name": "Amsterdam Schiphol", "id": "AMS", "time": "2025-03-10 11:05" },
                        "duration": 85,
                        "airline": "KLM",
                        "flight_number": "KL 1234",
                        "travel_class": "Business"
                    },
                    {
                        "departure_airport": { "name": "Amsterdam Schiphol", "id": "AMS", "time": "2025-03-10 13:00" },
                        "arrival_airport": { "name": "Austin-Bergstrom", "id": "AUS", "time": "2025-03-10 17:10" },
                        "duration": 610,
                        "airline": "KLM",
                        "flight_number": "KL 667"
                    }
                ],
                "layovers": [
                    { "duration": 115, "name": "Amsterdam Schiphol", "id": "AMS" }
                ],
                "total_duration": 810,
                "price": 1450,
                "departure_token": "dep-abc",
                "booking_token": "book-xyz"
            }))
            .unwrap()
        }

        #[test]
        fn maps_segments_layovers_and_tokens() {
            let offer = Offer::from(sample_option());

            assert_eq!(offer.legs.len(), 2);
            assert_eq!(offer.legs[0].carrier, "KLM");
            assert_eq!(offer.legs[0].departure_airport, "CDG");
            assert_eq!(offer.legs[1].arrival_airport, "AUS");
            assert_eq!(offer.layovers.len(), 1);
            assert_eq!(offer.layovers[0].airport, "AMS");
            assert_eq!(offer.duration_minutes, 810);
            assert_eq!(
                offer.continuation_token,
                Some(ContinuationToken::new("dep-abc"))
            );
            assert_eq!(offer.booking_token, Some(BookingToken::new("book-xyz")));
        }

        #[test]
        fn converts_whole_unit_price_to_minor_units() {
            let offer = Offer::from(sample_option());
            assert_eq!(offer.price_minor, 145_000);
        }

        #[test]
        fn missing_total_duration_falls_back_to_segment_sum() {
            let option: ApiFlightOption = serde_json::from_value(json!({
                "flights": [
                    {
                        "departure_airport": { "id": "CDG", "time": "t1" },
                        "arrival_airport": { "id": "AUS", "time": "t2" },
                        "duration": 390
                    }
                ],
                "price": 450
            }))
            .unwrap();

            let offer = Offer::from(option);
            assert_eq!(offer.duration_minutes, 390);
            assert!(offer.continuation_token.is_none());
        }

        #[test]
        fn search_response_buckets_deserialize_independently() {
            let wire: SearchResponse = serde_json::from_value(json!({
                "best_flights": [ { "flights": [], "price": 100 } ],
                "other_flights": []
            }))
            .unwrap();
            assert_eq!(wire.best_flights.len(), 1);
            assert!(wire.other_flights.is_empty());
            assert!(wire.error.is_none());
        }

        #[test]
        fn api_error_field_classifies_key_problems() {
            assert!(matches!(
                classify_api_error("Invalid API key".to_string()),
                ProviderError::AuthenticationFailed
            ));
            assert!(matches!(
                classify_api_error("Unsupported travel_class".to_string()),
                ProviderError::InvalidRequest(_)
            ));
        }

        #[test]
        fn booking_options_resolve_to_vendor_and_url() {
            let wire: BookingResponse = serde_json::from_value(json!({
                "booking_options": [
                    {
                        "together": {
                            "book_with": "KLM",
                            "booking_request": {
                                "url": "https://www.google.com/travel/clk/f",
                                "post_data": "u=abc"
                            }
                        }
                    }
                ]
            }))
            .unwrap();

            let reference = wire
                .booking_options
                .into_iter()
                .find_map(booking_reference)
                .unwrap();
            assert_eq!(reference.vendor, "KLM");
            assert!(reference.url.starts_with("https://www.google.com"));
        }

        #[test]
        fn booking_option_without_url_is_skipped() {
            let wire: BookingResponse = serde_json::from_value(json!({
                "booking_options": [ { "together": { "book_with": "KLM" } } ]
            }))
            .unwrap();
            assert!(wire.booking_options.into_iter().find_map(booking_reference).is_none());
        }
    }
}
