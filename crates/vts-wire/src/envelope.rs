use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{API_NAME, API_VERSION};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no messageType")]
    MissingMessageType,

    #[error("unexpected {message_type} payload: {reason}")]
    InvalidPayload { message_type: String, reason: String },
}

/// Outgoing request frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEnvelope {
    #[serde(rename = "apiName")]
    pub api_name: &'static str,
    #[serde(rename = "apiVersion")]
    pub api_version: &'static str,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RequestEnvelope {
    pub fn new(request_id: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            api_name: API_NAME,
            api_version: API_VERSION,
            request_id: request_id.into(),
            message_type: message_type.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Build the fixed envelope and serialize it to a JSON text frame.
pub fn encode(
    request_id: &str,
    message_type: &str,
    data: Option<Value>,
) -> Result<String, serde_json::Error> {
    let mut envelope = RequestEnvelope::new(request_id, message_type);
    envelope.data = data;
    envelope.to_json()
}

/// Incoming response frame.
///
/// `message_type` is optional at this level: the host occasionally omits it,
/// and some operations read the payload regardless. Use [`decode`] when the
/// tag is required.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub message_type: Option<String>,
    pub request_id: Option<String>,
    pub data: Value,
    raw: Value,
}

impl ResponseEnvelope {
    /// Parse a frame that must be a JSON object; no other field is required.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let raw: Value = serde_json::from_str(text)?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self, DecodeError> {
        let Some(object) = raw.as_object() else {
            return Err(DecodeError::NotAnObject);
        };
        let message_type = string_field(object, "messageType");
        let request_id = string_field(object, "requestID");
        let data = object.get("data").cloned().unwrap_or(Value::Null);
        Ok(Self {
            message_type,
            request_id,
            data,
            raw,
        })
    }

    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    pub fn is_type(&self, message_type: &str) -> bool {
        self.message_type() == Some(message_type)
    }

    /// Field of the `data` payload, if present.
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.as_object().and_then(|data| data.get(key))
    }

    /// The frame exactly as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Indented rendering used in diagnostics.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }

    /// Deserialize `data` into a typed payload.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_value(self.data.clone()).map_err(|err| DecodeError::InvalidPayload {
            message_type: self
                .message_type
                .clone()
                .unwrap_or_else(|| "<untagged>".to_string()),
            reason: err.to_string(),
        })
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Parse a frame and require a `messageType` tag.
pub fn decode(text: &str) -> Result<ResponseEnvelope, DecodeError> {
    let envelope = ResponseEnvelope::parse(text)?;
    if envelope.message_type.is_none() {
        return Err(DecodeError::MissingMessageType);
    }
    Ok(envelope)
}
