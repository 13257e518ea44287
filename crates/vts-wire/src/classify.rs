use std::fmt;

use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::request::message_types::API_ERROR;

/// Error payload carried by an `APIError` frame (or by any frame whose
/// payload has a truthy `errorID`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiErrorPayload {
    pub error_id: Option<i64>,
    pub message: Option<String>,
    pub response: Value,
}

impl ApiErrorPayload {
    fn from_envelope(envelope: ResponseEnvelope) -> Self {
        let error_id = envelope.data_field("errorID").and_then(Value::as_i64);
        let message = envelope
            .data_field("message")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        Self {
            error_id,
            message,
            response: envelope.into_raw(),
        }
    }
}

impl fmt::Display for ApiErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.error_id, self.message.as_deref()) {
            (Some(id), Some(message)) => write!(f, "API error {id}: {message}"),
            (Some(id), None) => write!(f, "API error {id}"),
            (None, Some(message)) => write!(f, "API error: {message}"),
            (None, None) => write!(f, "API error"),
        }
    }
}

/// Outcome of matching a response against the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Success(Value),
    ApiError(ApiErrorPayload),
    Unexpected(ResponseEnvelope),
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn carries_error_signal(envelope: &ResponseEnvelope) -> bool {
    envelope.is_type(API_ERROR) || envelope.data_field("errorID").is_some_and(is_truthy)
}

/// Classify a response against the expected success `messageType`.
///
/// The error signal wins over the tag: a frame tagged with the expected type
/// but carrying a truthy `errorID` is an error.
pub fn classify(envelope: ResponseEnvelope, expected: &str) -> Classification {
    if carries_error_signal(&envelope) {
        return Classification::ApiError(ApiErrorPayload::from_envelope(envelope));
    }
    if envelope.is_type(expected) {
        return Classification::Success(envelope.data);
    }
    Classification::Unexpected(envelope)
}

/// Classify a response where only an explicit error signal counts as failure.
///
/// Used for hotkey triggers: the host sometimes acknowledges a trigger without
/// any success tag, so every frame lacking an `APIError` tag and a truthy
/// `errorID` is read as success, including an untagged or unfamiliar one.
pub fn classify_error_signal_only(envelope: ResponseEnvelope) -> Classification {
    if carries_error_signal(&envelope) {
        return Classification::ApiError(ApiErrorPayload::from_envelope(envelope));
    }
    Classification::Success(envelope.data)
}
