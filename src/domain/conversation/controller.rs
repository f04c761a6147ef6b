//! The dialogue controller: per-turn extract/merge loop and the phase
//! state machine around it.
//!
//! The controller owns the parameter store for one conversation. It never
//! loses previously confirmed fields on a partial turn, and never reaches
//! `Ready` on the strength of the model's self-reported completion flag
//! alone - readiness is decided by the store's recomputed invariants.

use thiserror::Error;

use super::extractor::ResponseExtractor;
use crate::domain::trip::{ParameterStore, TripRequest};

/// Words that end the session, matched case-insensitively.
const EXIT_TOKENS: &[&str] = &["quit", "exit"];

/// Invalid phase transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: DialoguePhase,
    pub to: DialoguePhase,
}

/// Trait for status enums that represent state machines.
///
/// Implementors define valid transitions and get validated transition
/// methods for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Checks if the current state is terminal.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// Phase of the booking dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialoguePhase {
    /// Gathering trip parameters turn by turn.
    Collecting,
    /// All required parameters present; waiting for the user to ask for a
    /// search (they may still revise fields).
    Ready,
    /// First-phase provider search in flight.
    Searching,
    /// Outbound offers on display; selection and booking happen here.
    Results,
    /// Terminal: the user cancelled.
    Exited,
}

impl StateMachine for DialoguePhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DialoguePhase::*;
        match self {
            Collecting => vec![Ready, Exited],
            Ready => vec![Searching, Collecting, Exited],
            Searching => vec![Results, Collecting, Exited],
            // A new search from Results covers both re-search and reset.
            Results => vec![Searching, Collecting, Exited],
            Exited => vec![],
        }
    }
}

/// What one conversational turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Assistant text to show the user.
    pub message: String,
    /// Whether the turn's field updates were applied to the store.
    pub accepted: bool,
}

/// Drives the extract -> merge -> completion loop for one conversation.
#[derive(Debug, Default)]
pub struct DialogueController {
    phase: DialoguePhase,
    store: ParameterStore,
    extractor: ResponseExtractor,
}

impl Default for DialoguePhase {
    fn default() -> Self {
        Self::Collecting
    }
}

impl DialogueController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    /// The current validated trip request.
    pub fn request(&self) -> &TripRequest {
        self.store.current()
    }

    /// True when the input is a recognized cancellation token.
    pub fn is_exit_token(input: &str) -> bool {
        let trimmed = input.trim();
        EXIT_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t))
    }

    /// Consumes the model's raw response for one user turn.
    ///
    /// Extraction or merge failures are non-fatal: they surface as the
    /// assistant message and the phase stays where it was, to be retried
    /// next turn. A successful merge may promote `Collecting` to `Ready`,
    /// or demote `Ready` back to `Collecting` when a revision broke
    /// completeness.
    pub fn apply_model_response(&mut self, raw: &str) -> TurnReply {
        let update = match self.extractor.extract(raw) {
            Ok(update) => update,
            Err(err) => {
                tracing::warn!(%err, "extraction failed; re-prompting");
                return TurnReply {
                    message: "Sorry, I didn't catch that. Could you rephrase?".to_string(),
                    accepted: false,
                };
            }
        };

        let relayed = update.message.clone();

        if let Err(err) = self.store.merge(&update) {
            tracing::warn!(%err, "merge rejected; state unchanged");
            return TurnReply {
                message: err.to_string(),
                accepted: false,
            };
        }

        let complete = self.store.current().is_complete();
        if complete {
            self.advance(DialoguePhase::Ready);
        } else if self.phase == DialoguePhase::Ready {
            self.advance(DialoguePhase::Collecting);
        }

        let message = relayed.unwrap_or_else(|| self.fallback_message(complete));
        TurnReply {
            message,
            accepted: true,
        }
    }

    /// Explicit user request to run the search. Not automatic on
    /// completeness, so parameters can still be revised.
    pub fn request_search(&mut self) -> Result<(), TransitionError> {
        if self.phase != DialoguePhase::Ready && self.phase != DialoguePhase::Results {
            return Err(TransitionError {
                from: self.phase,
                to: DialoguePhase::Searching,
            });
        }
        self.transition(DialoguePhase::Searching)
    }

    /// First-phase search produced offers.
    pub fn search_succeeded(&mut self) -> Result<(), TransitionError> {
        self.transition(DialoguePhase::Results)
    }

    /// First-phase search failed or came back empty; resume collecting.
    pub fn search_failed(&mut self) -> Result<(), TransitionError> {
        self.transition(DialoguePhase::Collecting)
    }

    /// User cancellation; reachable from any phase, idempotent.
    pub fn exit(&mut self) {
        self.phase = DialoguePhase::Exited;
    }

    /// "New search": discard parameters and start collecting again.
    pub fn reset(&mut self) {
        if self.phase != DialoguePhase::Exited {
            self.store.reset();
            self.phase = DialoguePhase::Collecting;
        }
    }

    fn transition(&mut self, target: DialoguePhase) -> Result<(), TransitionError> {
        if self.phase.can_transition_to(&target) {
            self.phase = target;
            Ok(())
        } else {
            Err(TransitionError {
                from: self.phase,
                to: target,
            })
        }
    }

    /// Moves to `target` when valid, otherwise stays put.
    fn advance(&mut self, target: DialoguePhase) {
        if self.phase == target {
            return;
        }
        let _ = self.transition(target);
    }

    fn fallback_message(&self, complete: bool) -> String {
        if complete {
            "All parameters collected. Say 'search' when you're ready to look for flights."
                .to_string()
        } else {
            format!(
                "I still need: {}.",
                self.store.current().missing_fields().join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE_PAYLOAD: &str = r#"{
        "departure_id": "CDG",
        "arrival_id": "AUS",
        "trip_type": "one_way",
        "outbound_date": "2025-03-10",
        "adults": 2,
        "travel_class": "business",
        "message": "Got everything!",
        "completion": true
    }"#;

    mod phase_machine {
        use super::*;

        #[test]
        fn default_phase_is_collecting() {
            assert_eq!(DialoguePhase::default(), DialoguePhase::Collecting);
        }

        #[test]
        fn exited_is_terminal() {
            assert!(DialoguePhase::Exited.is_terminal());
            assert!(!DialoguePhase::Collecting.is_terminal());
        }

        #[test]
        fn exit_reachable_from_every_phase() {
            for phase in [
                DialoguePhase::Collecting,
                DialoguePhase::Ready,
                DialoguePhase::Searching,
                DialoguePhase::Results,
            ] {
                assert!(phase.can_transition_to(&DialoguePhase::Exited));
            }
        }

        #[test]
        fn collecting_cannot_jump_to_searching() {
            assert!(!DialoguePhase::Collecting.can_transition_to(&DialoguePhase::Searching));
        }
    }

    mod exit_tokens {
        use super::*;

        #[test]
        fn recognizes_quit_and_exit_case_insensitively() {
            assert!(DialogueController::is_exit_token("quit"));
            assert!(DialogueController::is_exit_token("  EXIT "));
            assert!(DialogueController::is_exit_token("Quit"));
            assert!(!DialogueController::is_exit_token("quitting time"));
        }
    }

    mod turns {
        use super::*;

        #[test]
        fn complete_payload_promotes_to_ready() {
            let mut controller = DialogueController::new();
            let reply = controller.apply_model_response(COMPLETE_PAYLOAD);

            assert!(reply.accepted);
            assert_eq!(reply.message, "Got everything!");
            assert_eq!(controller.phase(), DialoguePhase::Ready);
            assert!(controller.request().is_complete());
        }

        #[test]
        fn partial_turn_keeps_collecting_and_prior_fields() {
            let mut controller = DialogueController::new();
            controller.apply_model_response(r#"{"departure_id": "CDG", "completion": false}"#);
            controller.apply_model_response(r#"{"arrival_id": "AUS", "completion": false}"#);

            assert_eq!(controller.phase(), DialoguePhase::Collecting);
            assert_eq!(controller.request().departure().unwrap().as_str(), "CDG");
            assert_eq!(controller.request().arrival().unwrap().as_str(), "AUS");
        }

        #[test]
        fn completion_hint_alone_does_not_promote() {
            let mut controller = DialogueController::new();
            let reply = controller.apply_model_response(r#"{"completion": true}"#);

            assert!(reply.accepted);
            assert_eq!(controller.phase(), DialoguePhase::Collecting);
            assert!(!controller.request().is_complete());
        }

        #[test]
        fn extraction_failure_is_non_fatal() {
            let mut controller = DialogueController::new();
            controller.apply_model_response(r#"{"departure_id": "CDG", "completion": false}"#);

            let reply = controller.apply_model_response(r#"{"broken json"#);
            assert!(!reply.accepted);
            assert_eq!(controller.phase(), DialoguePhase::Collecting);
            // Prior field survived the bad turn.
            assert!(controller.request().departure().is_some());
        }

        #[test]
        fn merge_failure_surfaces_message_and_keeps_state() {
            let mut controller = DialogueController::new();
            controller.apply_model_response(
                r#"{"trip_type": "round_trip", "outbound_date": "2025-06-01", "completion": false}"#,
            );

            let reply = controller
                .apply_model_response(r#"{"return_date": "2025-05-20", "completion": false}"#);
            assert!(!reply.accepted);
            assert!(reply.message.contains("cannot be before"));
            assert!(controller.request().return_date().is_none());
        }

        #[test]
        fn revision_that_breaks_completeness_demotes_to_collecting() {
            let mut controller = DialogueController::new();
            controller.apply_model_response(COMPLETE_PAYLOAD);
            assert_eq!(controller.phase(), DialoguePhase::Ready);

            controller.apply_model_response(r#"{"trip_type": "round_trip", "completion": true}"#);
            assert_eq!(controller.phase(), DialoguePhase::Collecting);
        }

        #[test]
        fn fallback_message_lists_missing_fields() {
            let mut controller = DialogueController::new();
            let reply =
                controller.apply_model_response(r#"{"departure_id": "CDG", "completion": false}"#);
            assert!(reply.message.contains("arrival_id"));
            assert!(!reply.message.contains("departure_id"));
        }
    }

    mod search_flow {
        use super::*;

        fn ready_controller() -> DialogueController {
            let mut controller = DialogueController::new();
            controller.apply_model_response(COMPLETE_PAYLOAD);
            controller
        }

        #[test]
        fn search_requires_readiness() {
            let mut controller = DialogueController::new();
            assert!(controller.request_search().is_err());
            assert_eq!(controller.phase(), DialoguePhase::Collecting);
        }

        #[test]
        fn successful_search_reaches_results() {
            let mut controller = ready_controller();
            controller.request_search().unwrap();
            assert_eq!(controller.phase(), DialoguePhase::Searching);
            controller.search_succeeded().unwrap();
            assert_eq!(controller.phase(), DialoguePhase::Results);
        }

        #[test]
        fn failed_search_returns_to_collecting() {
            let mut controller = ready_controller();
            controller.request_search().unwrap();
            controller.search_failed().unwrap();
            assert_eq!(controller.phase(), DialoguePhase::Collecting);
        }

        #[test]
        fn re_search_allowed_from_results() {
            let mut controller = ready_controller();
            controller.request_search().unwrap();
            controller.search_succeeded().unwrap();
            assert!(controller.request_search().is_ok());
        }

        #[test]
        fn reset_clears_parameters_and_phase() {
            let mut controller = ready_controller();
            controller.request_search().unwrap();
            controller.search_succeeded().unwrap();

            controller.reset();
            assert_eq!(controller.phase(), DialoguePhase::Collecting);
            assert!(controller.request().departure().is_none());
        }

        #[test]
        fn exit_is_idempotent_and_final() {
            let mut controller = ready_controller();
            controller.exit();
            controller.exit();
            assert_eq!(controller.phase(), DialoguePhase::Exited);
            assert!(controller.request_search().is_err());
        }
    }
}
