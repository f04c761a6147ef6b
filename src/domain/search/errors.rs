//! Error types for the search and booking flow.

use thiserror::Error;

use crate::ports::{IncompleteTrip, ProviderError};

/// Errors surfaced by the orchestrator and booking resolver.
///
/// Everything here is recoverable within the conversation: search errors
/// send the dialogue back to collecting with a message, booking errors
/// leave the selection intact for a retry.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The underlying provider call failed.
    #[error("flight search failed: {0}")]
    Provider(#[from] ProviderError),

    /// Search was attempted before the trip request was complete.
    #[error(transparent)]
    IncompleteTrip(#[from] IncompleteTrip),

    /// The selected outbound offer carries no continuation token and
    /// cannot seed a return search.
    #[error("this outbound offer cannot be paired with a return flight")]
    NotPairable,

    /// The selected offer carries no booking token.
    #[error("this offer cannot be resolved to a booking")]
    NotBookable,

    /// The booking token expired or is unknown. Soft failure: the offer
    /// remains selected so the user can retry or re-search.
    #[error("booking is no longer available: {0}")]
    BookingUnavailable(String),
}
