//! System prompt and extraction schema shown to the language model.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::domain::trip::TripRequest;

/// Greeting for a fresh conversation.
pub const GREETING: &str =
    "Hi! I can help you find and book flights. Where would you like to go?";

/// JSON schema for the structured update the model is asked to return.
///
/// Field names match [`TripRequest`]'s wire serialization so the model sees
/// one consistent vocabulary in the schema, the current-state snapshot, and
/// its own prior answers.
pub static EXTRACTION_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "departure_id": {
                "type": "string",
                "description": "Airport code for departure (e.g. 'CDG')",
                "pattern": "^[A-Z]{3}$"
            },
            "arrival_id": {
                "type": "string",
                "description": "Airport code for arrival (e.g. 'AUS')",
                "pattern": "^[A-Z]{3}$"
            },
            "trip_type": {
                "type": "string",
                "enum": ["round_trip", "one_way"]
            },
            "outbound_date": {
                "type": "string",
                "format": "date",
                "description": "Departure date in YYYY-MM-DD format"
            },
            "return_date": {
                "type": "string",
                "format": "date",
                "description": "Return date in YYYY-MM-DD format (required for round trips)"
            },
            "adults": {
                "type": "integer",
                "minimum": 1,
                "maximum": 9
            },
            "travel_class": {
                "type": "string",
                "enum": ["economy", "premium_economy", "business", "first"]
            },
            "outbound_times": {
                "type": "array",
                "items": { "type": "integer", "minimum": 0, "maximum": 23 },
                "minItems": 2,
                "maxItems": 4,
                "description": "Preferred hour-of-day bounds for the outbound leg"
            },
            "return_times": {
                "type": "array",
                "items": { "type": "integer", "minimum": 0, "maximum": 23 },
                "minItems": 2,
                "maxItems": 4,
                "description": "Preferred hour-of-day bounds for the return leg"
            },
            "message": {
                "type": "string",
                "description": "Message to show the user, e.g. asking for missing information"
            },
            "completion": {
                "type": "boolean",
                "description": "Whether all required parameters are filled"
            }
        },
        "required": ["completion"],
        "additionalProperties": false
    })
});

/// Builds the system prompt embedding the extraction schema.
pub fn system_prompt() -> String {
    format!(
        "You are an assistant collecting flight booking parameters. \
         Analyze the user's input together with the current parameters and \
         return updated values for any field the user provided. \
         Include a 'message' asking for whatever is still missing. \
         Set 'completion' to true only when all required parameters are filled. \
         Respond with a single JSON object adhering to this schema:\n\n{}",
        serde_json::to_string_pretty(&*EXTRACTION_SCHEMA).unwrap_or_default()
    )
}

/// Renders the current parameters for the conversation context, the way the
/// model last saw them.
pub fn current_parameters(request: &TripRequest) -> String {
    format!("Current parameters: {}", request.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_only_completion() {
        let required = EXTRACTION_SCHEMA["required"].as_array().unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "completion");
    }

    #[test]
    fn schema_covers_every_trip_field() {
        let properties = EXTRACTION_SCHEMA["properties"].as_object().unwrap();
        for field in [
            "departure_id",
            "arrival_id",
            "trip_type",
            "outbound_date",
            "return_date",
            "adults",
            "travel_class",
            "outbound_times",
            "return_times",
            "message",
            "completion",
        ] {
            assert!(properties.contains_key(field), "schema missing {field}");
        }
    }

    #[test]
    fn system_prompt_embeds_schema() {
        let prompt = system_prompt();
        assert!(prompt.contains("departure_id"));
        assert!(prompt.contains("completion"));
    }

    #[test]
    fn current_parameters_serializes_snapshot() {
        let text = current_parameters(&TripRequest::default());
        assert!(text.starts_with("Current parameters: "));
        assert!(text.contains("\"completion\":false"));
    }
}
