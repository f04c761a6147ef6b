//! Priced itineraries returned by the flight provider.
//!
//! Offers are created per search call and never mutated afterwards; a
//! fresh search produces a fresh set.

use serde::{Deserialize, Serialize};

/// Opaque value returned on an outbound offer, required to perform the
/// dependent return-leg search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque value identifying a specific offer for booking resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingToken(String);

impl BookingToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One flight segment of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub carrier: String,
    pub flight_number: String,
    pub departure_airport: String,
    /// Local departure time as reported by the provider.
    pub departure_time: String,
    pub arrival_airport: String,
    /// Local arrival time as reported by the provider.
    pub arrival_time: String,
    pub duration_minutes: u32,
}

/// A stop between segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layover {
    pub airport: String,
    pub duration_minutes: u32,
}

/// A priced, bookable itinerary in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Ordered flight segments for this direction.
    pub legs: Vec<FlightLeg>,
    pub layovers: Vec<Layover>,
    /// Total price in minor currency units.
    pub price_minor: u32,
    pub duration_minutes: u32,
    /// Present only on outbound offers eligible for a return search.
    pub continuation_token: Option<ContinuationToken>,
    /// Present on offers that can be resolved to a booking.
    pub booking_token: Option<BookingToken>,
}

impl Offer {
    /// True when this outbound offer can seed a return-leg search.
    pub fn is_pairable(&self) -> bool {
        self.continuation_token.is_some()
    }

    /// True when this offer can be resolved to a booking reference.
    pub fn is_bookable(&self) -> bool {
        self.booking_token.is_some()
    }

    /// Short route summary, e.g. `CDG -> AMS -> AUS`.
    pub fn route(&self) -> String {
        let mut stops: Vec<&str> = Vec::new();
        for leg in &self.legs {
            if stops.is_empty() {
                stops.push(&leg.departure_airport);
            }
            stops.push(&leg.arrival_airport);
        }
        stops.join(" -> ")
    }
}

/// An outbound offer, optionally paired with its return offer.
///
/// An absent return offer denotes a stage-one candidate still awaiting
/// user selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTripPair {
    pub outbound: Offer,
    pub return_offer: Option<Offer>,
    /// Total price of the pair in minor units. Always equals the
    /// provider's combined figure once a return offer is attached.
    pub total_price_minor: u32,
}

impl RoundTripPair {
    /// Stage-one candidate: outbound only, priced by itself.
    pub fn outbound_only(outbound: Offer) -> Self {
        let total_price_minor = outbound.price_minor;
        Self {
            outbound,
            return_offer: None,
            total_price_minor,
        }
    }

    /// True once both directions are present.
    pub fn is_paired(&self) -> bool {
        self.return_offer.is_some()
    }
}
