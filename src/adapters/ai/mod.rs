//! Language-model provider adapters.

mod mock;
mod openai;

pub use mock::{MockAiProvider, MockError, MockResponse};
pub use openai::{OpenAiConfig, OpenAiProvider};
