//! Candidate updates decoded from model output.
//!
//! An [`ExtractedUpdate`] mirrors the trip-request fields, every one
//! optional. Decoding is deliberately forgiving: a field that fails its
//! type or range check is dropped on its own (and logged), it never sinks
//! the rest of the update. The model also sends legacy encodings for some
//! fields; those are accepted here.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use super::values::{AirportCode, CabinClass, TimeWindow, TripType};

/// One turn's worth of candidate field updates, plus the model's
/// user-facing message and its advisory completion claim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedUpdate {
    pub departure_id: Option<AirportCode>,
    pub arrival_id: Option<AirportCode>,
    pub trip_type: Option<TripType>,
    pub outbound_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub adults: Option<u8>,
    pub travel_class: Option<CabinClass>,
    pub outbound_times: Option<TimeWindow>,
    pub return_times: Option<TimeWindow>,

    /// Text to relay to the user. Never merged into stored state.
    pub message: Option<String>,

    /// The model's own claim that all parameters are filled.
    /// Advisory only; completion is always recomputed from invariants.
    pub completion_hint: bool,
}

impl ExtractedUpdate {
    /// An update that carries only a user-facing message.
    pub fn message_only(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Default::default()
        }
    }

    /// Decodes an update from a parsed JSON object.
    ///
    /// Unknown keys are ignored for forward compatibility. The caller is
    /// responsible for rejecting a non-boolean `completion` before this
    /// point; anything else that fails to decode is dropped field by field.
    pub fn from_value(value: &Value) -> Self {
        let mut update = Self::default();
        let Some(object) = value.as_object() else {
            return update;
        };

        update.departure_id = parse_airport(object.get("departure_id"), "departure_id");
        update.arrival_id = parse_airport(object.get("arrival_id"), "arrival_id");
        update.trip_type = parse_trip_type(object.get("trip_type"));
        update.outbound_date = parse_date(object.get("outbound_date"), "outbound_date");
        update.return_date = parse_date(object.get("return_date"), "return_date");
        update.adults = parse_adults(object.get("adults"));
        update.travel_class = parse_cabin(object.get("travel_class"));
        update.outbound_times = parse_window(object.get("outbound_times"), "outbound_times");
        update.return_times = parse_window(object.get("return_times"), "return_times");

        update.message = object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty());
        update.completion_hint = object
            .get("completion")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        update
    }

    /// True when the update carries no field changes at all.
    pub fn has_field_updates(&self) -> bool {
        self.departure_id.is_some()
            || self.arrival_id.is_some()
            || self.trip_type.is_some()
            || self.outbound_date.is_some()
            || self.return_date.is_some()
            || self.adults.is_some()
            || self.travel_class.is_some()
            || self.outbound_times.is_some()
            || self.return_times.is_some()
    }
}

fn parse_airport(value: Option<&Value>, field: &'static str) -> Option<AirportCode> {
    let raw = value?.as_str()?;
    match AirportCode::new(raw) {
        Ok(code) => Some(code),
        Err(err) => {
            debug!(field, %err, "dropping invalid airport code");
            None
        }
    }
}

fn parse_trip_type(value: Option<&Value>) -> Option<TripType> {
    match value? {
        Value::String(label) => {
            let parsed = TripType::from_label(label);
            if parsed.is_none() {
                debug!(value = %label, "dropping unrecognized trip_type");
            }
            parsed
        }
        Value::Number(number) => {
            let parsed = number.as_i64().and_then(TripType::from_code);
            if parsed.is_none() {
                debug!(value = %number, "dropping unrecognized trip_type code");
            }
            parsed
        }
        other => {
            debug!(?other, "dropping trip_type of unexpected type");
            None
        }
    }
}

fn parse_date(value: Option<&Value>, field: &'static str) -> Option<NaiveDate> {
    let raw = value?.as_str()?;
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            debug!(field, value = raw, "dropping unparseable date");
            None
        }
    }
}

fn parse_adults(value: Option<&Value>) -> Option<u8> {
    let count = match value? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    if (1..=9).contains(&count) {
        Some(count as u8)
    } else {
        debug!(value = count, "dropping out-of-range adults count");
        None
    }
}

fn parse_cabin(value: Option<&Value>) -> Option<CabinClass> {
    match value? {
        Value::String(label) => {
            let parsed = CabinClass::from_label(label);
            if parsed.is_none() {
                debug!(value = %label, "dropping unrecognized travel_class");
            }
            parsed
        }
        Value::Number(number) => {
            let parsed = number.as_i64().and_then(CabinClass::from_code);
            if parsed.is_none() {
                debug!(value = %number, "dropping unrecognized travel_class code");
            }
            parsed
        }
        other => {
            debug!(?other, "dropping travel_class of unexpected type");
            None
        }
    }
}

fn parse_window(value: Option<&Value>, field: &'static str) -> Option<TimeWindow> {
    let result = match value? {
        Value::Array(items) => {
            let hours: Option<Vec<i64>> = items.iter().map(Value::as_i64).collect();
            match hours {
                Some(hours) => TimeWindow::new(hours),
                None => {
                    debug!(field, "dropping time window with non-integer entries");
                    return None;
                }
            }
        }
        Value::String(csv) => TimeWindow::parse_csv(csv),
        other => {
            debug!(field, ?other, "dropping time window of unexpected type");
            return None;
        }
    };

    match result {
        Ok(window) => Some(window),
        Err(err) => {
            debug!(field, %err, "dropping invalid time window");
            None
        }
    }
}
