//! The booking session: one conversation, from slot filling to booking.
//!
//! Wires the dialogue controller, the language-model provider, the search
//! orchestrator, the pairer, and the booking resolver together, and owns
//! the transcript plus the currently displayed results. Per the error
//! policy, per-turn and per-search failures become user-visible messages
//! or recoverable errors; nothing here aborts the process.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::conversation::{
    prompt, DialogueController, DialoguePhase, TransitionError, TurnReply,
};
use crate::domain::search::{
    BookingResolver, OfferPairer, RoundTripPair, SearchError, SearchOrchestrator,
};
use crate::domain::trip::TripRequest;
use crate::ports::{
    AiProvider, BookingReference, CompletionRequest, Message, MessageRole, FlightProvider,
    RequestMetadata,
};

/// Errors surfaced to the session boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Dialogue(#[from] TransitionError),

    #[error("no flights found for these parameters")]
    NoFlightsFound,

    #[error("no search results to select from")]
    NoResults,

    #[error("offer {index} does not exist")]
    UnknownOffer { index: usize },

    #[error("the session has ended")]
    Ended,
}

/// One user's booking conversation.
pub struct BookingSession<A: AiProvider + ?Sized, F: FlightProvider + ?Sized> {
    session_id: Uuid,
    ai: Arc<A>,
    orchestrator: SearchOrchestrator<F>,
    resolver: BookingResolver<F>,
    controller: DialogueController,
    transcript: Vec<Message>,
    /// Stage-one candidates currently on display.
    results: Vec<RoundTripPair>,
    /// Stage-two pairs produced by the latest selection.
    pairs: Vec<RoundTripPair>,
}

impl<A: AiProvider + ?Sized, F: FlightProvider + ?Sized> BookingSession<A, F> {
    pub fn new(ai: Arc<A>, flights: Arc<F>, config: &AppConfig) -> Self {
        let include_airlines = Some(config.flights.include_airlines.clone())
            .filter(|airlines| !airlines.is_empty());
        let orchestrator = SearchOrchestrator::new(
            Arc::clone(&flights),
            config.flights.cache_ttl(),
            include_airlines.clone(),
            config.flights.max_parallel_returns,
        );
        let resolver = BookingResolver::new(flights, include_airlines);

        Self {
            session_id: Uuid::new_v4(),
            ai,
            orchestrator,
            resolver,
            controller: DialogueController::new(),
            transcript: Vec::new(),
            results: Vec::new(),
            pairs: Vec::new(),
        }
    }

    /// Opening assistant message for a fresh conversation.
    pub fn greeting(&self) -> &'static str {
        prompt::GREETING
    }

    pub fn phase(&self) -> DialoguePhase {
        self.controller.phase()
    }

    /// The current validated trip request.
    pub fn request(&self) -> &TripRequest {
        self.controller.request()
    }

    /// Stage-one candidates from the last outbound search.
    pub fn results(&self) -> &[RoundTripPair] {
        &self.results
    }

    /// Stage-two pairs from the last selection.
    pub fn pairs(&self) -> &[RoundTripPair] {
        &self.pairs
    }

    /// Processes one free-text user turn.
    ///
    /// Cancellation tokens end the session. Model-provider failures are
    /// reported as a retryable assistant message; the collected parameters
    /// and the phase are untouched either way.
    pub async fn handle_turn(&mut self, user_text: &str) -> Result<TurnReply, SessionError> {
        if self.phase() == DialoguePhase::Exited {
            return Err(SessionError::Ended);
        }

        if DialogueController::is_exit_token(user_text) {
            self.controller.exit();
            info!("session ended by user");
            return Ok(TurnReply {
                message: "Booking process ended. Safe travels!".to_string(),
                accepted: false,
            });
        }

        self.transcript.push(Message::user(user_text));

        let request = CompletionRequest::new(RequestMetadata::new(self.session_id))
            .with_system_prompt(prompt::system_prompt())
            .with_messages(self.transcript.iter().cloned())
            .with_message(
                MessageRole::Assistant,
                prompt::current_parameters(self.controller.request()),
            );

        let response = match self.ai.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "model completion failed");
                return Ok(TurnReply {
                    message: "I'm having trouble reaching the assistant right now. \
                              Please try again in a moment."
                        .to_string(),
                    accepted: false,
                });
            }
        };

        let reply = self.controller.apply_model_response(&response.content);
        self.transcript.push(Message::assistant(&reply.message));
        Ok(reply)
    }

    /// Runs the first-phase search. Requires the explicit user action; an
    /// empty result set or a provider failure drops the dialogue back to
    /// collecting with the error as the explanation.
    pub async fn start_search(&mut self) -> Result<&[RoundTripPair], SessionError> {
        self.controller.request_search()?;

        match self
            .orchestrator
            .search_outbound(self.controller.request())
            .await
        {
            Ok(offers) if offers.is_empty() => {
                self.controller.search_failed()?;
                Err(SessionError::NoFlightsFound)
            }
            Ok(offers) => {
                self.results = OfferPairer::pair_outbound_only(offers);
                self.pairs.clear();
                self.controller.search_succeeded()?;
                info!(count = self.results.len(), "outbound search succeeded");
                Ok(&self.results)
            }
            Err(err) => {
                self.controller.search_failed()?;
                Err(err.into())
            }
        }
    }

    /// Pairs the selected outbound offers (zero-based indices into
    /// [`results`](Self::results)) with their return offers.
    ///
    /// One-way selections pass through unchanged. For round trips the
    /// return searches run concurrently per selected offer; a failure for
    /// one offer is logged and skipped, and only surfaces as the result
    /// when every selection failed.
    pub async fn select(&mut self, indices: &[usize]) -> Result<&[RoundTripPair], SessionError> {
        if self.phase() != DialoguePhase::Results || self.results.is_empty() {
            return Err(SessionError::NoResults);
        }

        let mut chosen = Vec::with_capacity(indices.len());
        for &index in indices {
            let pair = self
                .results
                .get(index)
                .ok_or(SessionError::UnknownOffer { index })?;
            chosen.push(pair.outbound.clone());
        }

        if !self.controller.request().is_round_trip() {
            self.pairs = chosen.into_iter().map(RoundTripPair::outbound_only).collect();
            return Ok(&self.pairs);
        }

        let tokens: Vec<_> = chosen
            .iter()
            .filter_map(|offer| offer.continuation_token.clone())
            .collect();
        if tokens.is_empty() {
            return Err(SearchError::NotPairable.into());
        }

        let results = self
            .orchestrator
            .search_returns_batch(self.controller.request(), &tokens)
            .await;

        let mut pairs = Vec::new();
        let mut first_error = None;
        for (token, result) in results {
            let outbound = chosen
                .iter()
                .find(|offer| offer.continuation_token.as_ref() == Some(&token));
            match (outbound, result) {
                (Some(outbound), Ok(returns)) => {
                    pairs.extend(OfferPairer::pair_with_returns(outbound, returns));
                }
                (_, Err(err)) => {
                    warn!(%err, token = token.as_str(), "return search failed for selection");
                    first_error.get_or_insert(err);
                }
                (None, Ok(_)) => {
                    warn!(token = token.as_str(), "return results for unknown selection");
                }
            }
        }

        if pairs.is_empty() {
            return Err(first_error.unwrap_or(SearchError::NotPairable).into());
        }

        self.pairs = pairs;
        Ok(&self.pairs)
    }

    /// Resolves one selected candidate (zero-based index into
    /// [`pairs`](Self::pairs)) to a booking reference.
    ///
    /// A `BookingUnavailable` failure is soft: the selection is kept so
    /// the user can retry or re-search.
    pub async fn book(&mut self, index: usize) -> Result<BookingReference, SessionError> {
        let pair = self
            .pairs
            .get(index)
            .ok_or(SessionError::UnknownOffer { index })?;

        // The provider puts the whole-trip booking token on the return
        // offer once one is attached; fall back to the outbound leg.
        let offer = match &pair.return_offer {
            Some(return_offer) if return_offer.is_bookable() => return_offer,
            _ => &pair.outbound,
        };

        let reference = self
            .resolver
            .resolve(self.controller.request(), offer)
            .await?;
        info!(vendor = %reference.vendor, "booking resolved");
        Ok(reference)
    }

    /// "New search": discards parameters, transcript, and results.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.transcript.clear();
        self.results.clear();
        self.pairs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAiProvider;
    use crate::adapters::flights::{sample_offer, MockFlightProvider};
    use crate::ports::{OfferPage, ProviderError};

    const ONE_WAY_PAYLOAD: &str = r#"```json
{
  "departure_id": "CDG",
  "arrival_id": "AUS",
  "trip_type": "one_way",
  "outbound_date": "2025-03-10",
  "adults": 2,
  "travel_class": "business",
  "message": "All set. Say 'search' to look for flights.",
  "completion": true
}
```"#;

    const ROUND_TRIP_PAYLOAD: &str = r#"{
  "departure_id": "CDG",
  "arrival_id": "AUS",
  "trip_type": "round_trip",
  "outbound_date": "2025-03-10",
  "return_date": "2025-03-20",
  "adults": 1,
  "travel_class": "economy",
  "completion": true
}"#;

    fn session(
        ai: MockAiProvider,
        flights: MockFlightProvider,
    ) -> BookingSession<MockAiProvider, MockFlightProvider> {
        BookingSession::new(Arc::new(ai), Arc::new(flights), &AppConfig::default())
    }

    #[tokio::test]
    async fn turn_reaches_ready_and_search_produces_results() {
        let ai = MockAiProvider::new().with_response(ONE_WAY_PAYLOAD);
        let flights = MockFlightProvider::new().with_outbound(Ok(OfferPage {
            best: vec![sample_offer("DL 1", 45_000, None, Some("b1"))],
            other: vec![],
        }));
        let mut session = session(ai, flights);

        let reply = session
            .handle_turn("One-way business CDG to AUS on 2025-03-10 for 2 adults")
            .await
            .unwrap();
        assert!(reply.accepted);
        assert_eq!(session.phase(), DialoguePhase::Ready);

        let results = session.start_search().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(session.phase(), DialoguePhase::Results);
    }

    #[tokio::test]
    async fn model_failure_is_a_soft_turn() {
        let ai = MockAiProvider::new(); // empty queue -> Unavailable
        let flights = MockFlightProvider::new();
        let mut session = session(ai, flights);

        let reply = session.handle_turn("hello").await.unwrap();
        assert!(!reply.accepted);
        assert!(reply.message.contains("try again"));
        assert_eq!(session.phase(), DialoguePhase::Collecting);
    }

    #[tokio::test]
    async fn empty_search_drops_back_to_collecting() {
        let ai = MockAiProvider::new().with_response(ONE_WAY_PAYLOAD);
        let flights = MockFlightProvider::new().with_outbound(Ok(OfferPage::default()));
        let mut session = session(ai, flights);

        session.handle_turn("book it").await.unwrap();
        let result = session.start_search().await;
        assert!(matches!(result, Err(SessionError::NoFlightsFound)));
        assert_eq!(session.phase(), DialoguePhase::Collecting);
    }

    #[tokio::test]
    async fn one_way_selection_passes_through_and_books() {
        let ai = MockAiProvider::new().with_response(ONE_WAY_PAYLOAD);
        let flights = MockFlightProvider::new()
            .with_outbound(Ok(OfferPage {
                best: vec![sample_offer("DL 1", 45_000, None, Some("b1"))],
                other: vec![],
            }))
            .with_booking(Ok(BookingReference {
                vendor: "Delta".to_string(),
                url: "https://example.com/book".to_string(),
            }));
        let mut session = session(ai, flights);

        session.handle_turn("book it").await.unwrap();
        session.start_search().await.unwrap();

        let pairs = session.select(&[0]).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(!pairs[0].is_paired());

        let reference = session.book(0).await.unwrap();
        assert_eq!(reference.vendor, "Delta");
    }

    #[tokio::test]
    async fn round_trip_selection_pairs_with_returns() {
        let ai = MockAiProvider::new().with_response(ROUND_TRIP_PAYLOAD);
        let flights = MockFlightProvider::new()
            .with_outbound(Ok(OfferPage {
                best: vec![
                    sample_offer("OUT-1", 45_000, Some("t1"), None),
                    sample_offer("OUT-2", 50_000, Some("t2"), None),
                ],
                other: vec![],
            }))
            .with_return(
                "t1",
                Ok(OfferPage {
                    best: vec![sample_offer("RET-1", 90_000, None, Some("b1"))],
                    other: vec![],
                }),
            );
        let mut session = session(ai, flights);

        session.handle_turn("round trip please").await.unwrap();
        session.start_search().await.unwrap();

        let pairs = session.select(&[0]).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].is_paired());
        assert_eq!(pairs[0].total_price_minor, 90_000);
        // Even split across the two legs.
        assert_eq!(pairs[0].outbound.price_minor, 45_000);
    }

    #[tokio::test]
    async fn booking_unavailable_keeps_the_selection() {
        let ai = MockAiProvider::new().with_response(ONE_WAY_PAYLOAD);
        let flights = MockFlightProvider::new()
            .with_outbound(Ok(OfferPage {
                best: vec![sample_offer("DL 1", 45_000, None, Some("b1"))],
                other: vec![],
            }))
            .with_booking(Err(ProviderError::BookingUnavailable(
                "token expired".to_string(),
            )));
        let mut session = session(ai, flights);

        session.handle_turn("book it").await.unwrap();
        session.start_search().await.unwrap();
        session.select(&[0]).await.unwrap();

        let result = session.book(0).await;
        assert!(matches!(
            result,
            Err(SessionError::Search(SearchError::BookingUnavailable(_)))
        ));
        // Selection survives the soft failure for a retry.
        assert_eq!(session.pairs().len(), 1);
        assert_eq!(session.phase(), DialoguePhase::Results);
    }

    #[tokio::test]
    async fn exit_token_ends_the_session() {
        let ai = MockAiProvider::new();
        let flights = MockFlightProvider::new();
        let mut session = session(ai, flights);

        session.handle_turn("quit").await.unwrap();
        assert_eq!(session.phase(), DialoguePhase::Exited);
        assert!(matches!(
            session.handle_turn("hello").await,
            Err(SessionError::Ended)
        ));
    }

    #[tokio::test]
    async fn reset_clears_results_and_parameters() {
        let ai = MockAiProvider::new().with_response(ONE_WAY_PAYLOAD);
        let flights = MockFlightProvider::new().with_outbound(Ok(OfferPage {
            best: vec![sample_offer("DL 1", 45_000, None, Some("b1"))],
            other: vec![],
        }));
        let mut session = session(ai, flights);

        session.handle_turn("book it").await.unwrap();
        session.start_search().await.unwrap();

        session.reset();
        assert_eq!(session.phase(), DialoguePhase::Collecting);
        assert!(session.results().is_empty());
        assert!(session.request().departure().is_none());
    }

    #[tokio::test]
    async fn selection_requires_results() {
        let ai = MockAiProvider::new();
        let flights = MockFlightProvider::new();
        let mut session = session(ai, flights);

        assert!(matches!(
            session.select(&[0]).await,
            Err(SessionError::NoResults)
        ));
    }
}
