//! Error types for trip parameter validation.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that occur during trip value construction or merge.
///
/// Every variant renders as a message suitable for showing to the user;
/// merge failures leave the stored request untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TripError {
    #[error("'{value}' is not a valid airport code (expected 3 letters, e.g. CDG)")]
    InvalidAirportCode { value: String },

    #[error("'{value}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { value: String },

    #[error("time window must contain 2 or 4 hour values, got {count}")]
    InvalidTimeWindowLength { count: usize },

    #[error("time window hour {value} is out of range (0-23)")]
    TimeWindowHourOutOfRange { value: i64 },

    #[error("passenger count {value} is out of range (1-9)")]
    InvalidAdults { value: i64 },

    #[error("return date {return_date} cannot be before the outbound date {outbound_date}")]
    ReturnBeforeOutbound {
        outbound_date: NaiveDate,
        return_date: NaiveDate,
    },
}
