//! Flight-inventory provider adapters.

mod mock;
mod serpapi;

pub use mock::{sample_offer, MockFlightProvider};
pub use serpapi::{SerpApiConfig, SerpApiProvider};
