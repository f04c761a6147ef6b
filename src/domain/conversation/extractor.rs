//! Structured-update extraction from raw model text.
//!
//! The model is asked for JSON but gives no guarantee of well-formedness:
//! payloads arrive fenced in tagged or plain code blocks, buried in prose,
//! or not at all. Extraction runs an ordered chain of decoders and takes
//! the first that yields a parseable JSON object.

use serde_json::Value;
use thiserror::Error;

use crate::domain::trip::ExtractedUpdate;

/// Errors that can occur during extraction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no decodable JSON object found in model response")]
    NoDecodableJson,

    #[error("'completion' must be a boolean")]
    CompletionNotBoolean,
}

/// A single decoding strategy: pick a candidate JSON span out of the text.
struct Decoder {
    name: &'static str,
    decode: fn(&str) -> Option<String>,
}

/// Tried in order; first decoder whose candidate parses as a JSON object
/// wins.
const DECODERS: &[Decoder] = &[
    Decoder {
        name: "tagged-fence",
        decode: decode_tagged_fence,
    },
    Decoder {
        name: "plain-fence",
        decode: decode_plain_fence,
    },
    Decoder {
        name: "balanced-object",
        decode: decode_balanced_object,
    },
];

/// Turns raw model text into a candidate structured update.
///
/// Pure function over the text: identical input always yields an identical
/// result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts a structured update from a raw model response.
    ///
    /// Text without any `{` or `[` is treated as a bare user-facing message
    /// carrying no field updates. Otherwise the decoder chain runs; if no
    /// decoder produces a parseable object the extraction fails and the
    /// caller re-prompts.
    pub fn extract(&self, raw: &str) -> Result<ExtractedUpdate, ExtractionError> {
        let trimmed = raw.trim();

        if !trimmed.contains('{') && !trimmed.contains('[') {
            if trimmed.is_empty() {
                return Ok(ExtractedUpdate::default());
            }
            return Ok(ExtractedUpdate::message_only(trimmed));
        }

        for decoder in DECODERS {
            let Some(candidate) = (decoder.decode)(trimmed) else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(&candidate) else {
                continue;
            };
            if !value.is_object() {
                continue;
            }

            tracing::debug!(decoder = decoder.name, "decoded model payload");

            if let Some(flag) = value.get("completion") {
                if !flag.is_boolean() {
                    return Err(ExtractionError::CompletionNotBoolean);
                }
            }
            return Ok(ExtractedUpdate::from_value(&value));
        }

        Err(ExtractionError::NoDecodableJson)
    }
}

/// JSON inside a language-tagged code block: ```json ... ```
fn decode_tagged_fence(s: &str) -> Option<String> {
    fenced_body(s, &["```json\n", "```json\r\n"])
}

/// JSON inside a plain code block: ``` ... ```
fn decode_plain_fence(s: &str) -> Option<String> {
    fenced_body(s, &["```\n", "```\r\n"])
}

fn fenced_body(s: &str, openers: &[&str]) -> Option<String> {
    for opener in openers {
        if let Some(start) = s.find(opener) {
            let body_start = start + opener.len();
            if let Some(end) = s[body_start..].find("```") {
                return Some(s[body_start..body_start + end].trim().to_string());
            }
        }
    }
    None
}

/// The first balanced top-level `{...}` span, string- and escape-aware.
fn decode_balanced_object(s: &str) -> Option<String> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[start..start + offset + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
