//! The canonical trip-request state.
//!
//! A [`TripRequest`] is only ever mutated through the parameter store's
//! validated merge, and its `completion` flag is derived, never assigned
//! from untrusted input.

use chrono::NaiveDate;
use serde::Serialize;

use super::errors::TripError;
use super::values::{AirportCode, CabinClass, TimeWindow, TripType};

/// Validated trip parameters accumulated over the conversation.
///
/// Field names follow the wire schema shown to the language model, so the
/// serialized snapshot and the schema stay in lockstep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) departure_id: Option<AirportCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) arrival_id: Option<AirportCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) trip_type: Option<TripType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) outbound_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) return_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) adults: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) travel_class: Option<CabinClass>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) outbound_times: Option<TimeWindow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) return_times: Option<TimeWindow>,

    /// Derived readiness flag, recomputed after every merge.
    #[serde(rename = "completion")]
    pub(crate) complete: bool,
}

impl TripRequest {
    pub fn departure(&self) -> Option<&AirportCode> {
        self.departure_id.as_ref()
    }

    pub fn arrival(&self) -> Option<&AirportCode> {
        self.arrival_id.as_ref()
    }

    pub fn trip_type(&self) -> Option<TripType> {
        self.trip_type
    }

    pub fn outbound_date(&self) -> Option<NaiveDate> {
        self.outbound_date
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    pub fn adults(&self) -> Option<u8> {
        self.adults
    }

    pub fn travel_class(&self) -> Option<CabinClass> {
        self.travel_class
    }

    pub fn outbound_times(&self) -> Option<&TimeWindow> {
        self.outbound_times.as_ref()
    }

    pub fn return_times(&self) -> Option<&TimeWindow> {
        self.return_times.as_ref()
    }

    /// True when every field required by the current trip type is present.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True when the trip needs a return leg.
    pub fn is_round_trip(&self) -> bool {
        self.trip_type == Some(TripType::RoundTrip)
    }

    /// Checks cross-field invariants on the current state.
    ///
    /// Scalar validity is guaranteed by the value objects; what can still
    /// go wrong is the relationship between fields.
    pub fn validate(&self) -> Result<(), TripError> {
        if let (Some(outbound), Some(ret)) = (self.outbound_date, self.return_date) {
            if ret < outbound {
                return Err(TripError::ReturnBeforeOutbound {
                    outbound_date: outbound,
                    return_date: ret,
                });
            }
        }
        Ok(())
    }

    /// Names of required fields that are still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.departure_id.is_none() {
            missing.push("departure_id");
        }
        if self.arrival_id.is_none() {
            missing.push("arrival_id");
        }
        if self.trip_type.is_none() {
            missing.push("trip_type");
        }
        if self.outbound_date.is_none() {
            missing.push("outbound_date");
        }
        if self.adults.is_none() {
            missing.push("adults");
        }
        if self.travel_class.is_none() {
            missing.push("travel_class");
        }
        if self.is_round_trip() && self.return_date.is_none() {
            missing.push("return_date");
        }
        missing
    }

    /// Recomputes the derived `completion` flag from the current fields.
    pub(crate) fn recompute_completion(&mut self) {
        self.complete = self.missing_fields().is_empty() && self.validate().is_ok();
    }

    /// JSON snapshot of the current parameters, as shown to the user and
    /// embedded in the model prompt.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn filled_one_way() -> TripRequest {
        let mut request = TripRequest {
            departure_id: Some(AirportCode::new("CDG").unwrap()),
            arrival_id: Some(AirportCode::new("AUS").unwrap()),
            trip_type: Some(TripType::OneWay),
            outbound_date: Some(date("2025-03-10")),
            adults: Some(2),
            travel_class: Some(CabinClass::Business),
            ..Default::default()
        };
        request.recompute_completion();
        request
    }

    #[test]
    fn default_request_is_incomplete() {
        let request = TripRequest::default();
        assert!(!request.is_complete());
        assert_eq!(request.missing_fields().len(), 6);
    }

    #[test]
    fn one_way_completes_without_return_date() {
        let request = filled_one_way();
        assert!(request.is_complete());
        assert!(request.missing_fields().is_empty());
    }

    #[test]
    fn round_trip_requires_return_date() {
        let mut request = filled_one_way();
        request.trip_type = Some(TripType::RoundTrip);
        request.recompute_completion();
        assert!(!request.is_complete());
        assert_eq!(request.missing_fields(), vec!["return_date"]);

        request.return_date = Some(date("2025-03-20"));
        request.recompute_completion();
        assert!(request.is_complete());
    }

    #[test]
    fn validate_rejects_return_before_outbound() {
        let mut request = filled_one_way();
        request.trip_type = Some(TripType::RoundTrip);
        request.return_date = Some(date("2025-03-01"));
        assert!(matches!(
            request.validate(),
            Err(TripError::ReturnBeforeOutbound { .. })
        ));

        request.recompute_completion();
        assert!(!request.is_complete());
    }

    #[test]
    fn same_day_return_is_valid() {
        let mut request = filled_one_way();
        request.trip_type = Some(TripType::RoundTrip);
        request.return_date = Some(date("2025-03-10"));
        assert!(request.validate().is_ok());
        request.recompute_completion();
        assert!(request.is_complete());
    }

    #[test]
    fn snapshot_omits_absent_fields_and_carries_completion() {
        let request = TripRequest {
            departure_id: Some(AirportCode::new("CDG").unwrap()),
            ..Default::default()
        };
        let snapshot = request.snapshot();
        assert_eq!(snapshot["departure_id"], "CDG");
        assert_eq!(snapshot["completion"], false);
        assert!(snapshot.get("arrival_id").is_none());
    }

    #[test]
    fn snapshot_serializes_dates_iso() {
        let request = filled_one_way();
        let snapshot = request.snapshot();
        assert_eq!(snapshot["outbound_date"], "2025-03-10");
        assert_eq!(snapshot["trip_type"], "one_way");
        assert_eq!(snapshot["travel_class"], "business");
    }
}
