//! The parameter store: validated, atomic merges of extracted updates.

use tracing::debug;

use super::errors::TripError;
use super::request::TripRequest;
use super::update::ExtractedUpdate;

/// Owns the canonical [`TripRequest`] for one conversation.
///
/// All mutation goes through [`merge`](ParameterStore::merge), which is
/// all-or-nothing: an update that would violate a cross-field invariant is
/// rejected whole and the prior state survives untouched.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    current: TripRequest,
}

impl ParameterStore {
    /// Creates an empty store for a new conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current validated state.
    pub fn current(&self) -> &TripRequest {
        &self.current
    }

    /// Applies an update atomically.
    ///
    /// Only fields explicitly present in the update overwrite state; absent
    /// fields are left untouched. The model's `completion` claim is ignored
    /// and the flag recomputed from invariants. On error the stored state
    /// is unchanged and the error message is suitable for the user.
    pub fn merge(&mut self, update: &ExtractedUpdate) -> Result<(), TripError> {
        let candidate = merged(&self.current, update)?;
        debug!(complete = candidate.is_complete(), "merged trip update");
        self.current = candidate;
        Ok(())
    }

    /// Discards all collected parameters ("new search").
    pub fn reset(&mut self) {
        self.current = TripRequest::default();
    }
}

/// Pure merge: produces the next request version or the violation that
/// rejected the whole update.
pub fn merged(current: &TripRequest, update: &ExtractedUpdate) -> Result<TripRequest, TripError> {
    let mut candidate = current.clone();

    if let Some(code) = &update.departure_id {
        candidate.departure_id = Some(code.clone());
    }
    if let Some(code) = &update.arrival_id {
        candidate.arrival_id = Some(code.clone());
    }
    if let Some(trip_type) = update.trip_type {
        candidate.trip_type = Some(trip_type);
    }
    if let Some(date) = update.outbound_date {
        candidate.outbound_date = Some(date);
    }
    if let Some(date) = update.return_date {
        candidate.return_date = Some(date);
    }
    if let Some(adults) = update.adults {
        candidate.adults = Some(adults);
    }
    if let Some(cabin) = update.travel_class {
        candidate.travel_class = Some(cabin);
    }
    if let Some(window) = &update.outbound_times {
        candidate.outbound_times = Some(window.clone());
    }
    if let Some(window) = &update.return_times {
        candidate.return_times = Some(window.clone());
    }

    candidate.validate()?;
    candidate.recompute_completion();
    Ok(candidate)
}
