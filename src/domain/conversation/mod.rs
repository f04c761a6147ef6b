//! Conversational core: model-response extraction, prompt construction,
//! and the dialogue phase machine.

mod controller;
mod extractor;
pub mod prompt;

pub use controller::{
    DialogueController, DialoguePhase, StateMachine, TransitionError, TurnReply,
};
pub use extractor::{ExtractionError, ResponseExtractor};
