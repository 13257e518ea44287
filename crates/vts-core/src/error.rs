use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use vts_wire::ApiErrorPayload;

use crate::handshake::SessionState;

#[derive(Error, Debug)]
pub enum VtsError {
    #[error("failed to connect to {address}: {reason}")]
    ConnectFailure { address: String, reason: String },

    #[error("authentication token request was not granted (got {})", describe(.response))]
    TokenAcquisitionFailure { response: Value },

    #[error("authentication was rejected (got {})", describe(.response))]
    AuthenticationFailure { response: Value },

    #[error("malformed response to {operation}: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
        raw: String,
    },

    #[error("{operation} failed: {error}")]
    ApiError {
        operation: &'static str,
        error: ApiErrorPayload,
    },

    #[error("{operation} expected {expected}, got {}", describe(.response))]
    Unexpected {
        operation: &'static str,
        expected: &'static str,
        response: Value,
    },

    #[error("transport closed during {operation}: {reason}")]
    TransportClosed {
        operation: &'static str,
        reason: String,
    },

    #[error("session is not ready (state: {state})")]
    NotReady { state: SessionState },

    #[error("credential file {path}: {source}")]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConnectFailure,
    TokenAcquisitionFailure,
    AuthenticationFailure,
    MalformedResponse,
    ApiError,
    Unexpected,
    TransportClosed,
    NotReady,
    Credential,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectFailure => "connect_failure",
            ErrorKind::TokenAcquisitionFailure => "token_acquisition_failure",
            ErrorKind::AuthenticationFailure => "authentication_failure",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::ApiError => "api_error",
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::TransportClosed => "transport_closed",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::Credential => "credential",
            ErrorKind::Serialization => "serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VtsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VtsError::ConnectFailure { .. } => ErrorKind::ConnectFailure,
            VtsError::TokenAcquisitionFailure { .. } => ErrorKind::TokenAcquisitionFailure,
            VtsError::AuthenticationFailure { .. } => ErrorKind::AuthenticationFailure,
            VtsError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            VtsError::ApiError { .. } => ErrorKind::ApiError,
            VtsError::Unexpected { .. } => ErrorKind::Unexpected,
            VtsError::TransportClosed { .. } => ErrorKind::TransportClosed,
            VtsError::NotReady { .. } => ErrorKind::NotReady,
            VtsError::Credential { .. } => ErrorKind::Credential,
            VtsError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// True when the session can no longer be used and a fresh `connect` is
    /// required.
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectFailure
                | ErrorKind::TokenAcquisitionFailure
                | ErrorKind::AuthenticationFailure
                | ErrorKind::TransportClosed
        )
    }

    /// The offending frame, when one was received.
    pub fn raw_response(&self) -> Option<String> {
        match self {
            VtsError::TokenAcquisitionFailure { response }
            | VtsError::AuthenticationFailure { response }
            | VtsError::Unexpected { response, .. } => Some(pretty(response)),
            VtsError::ApiError { error, .. } => Some(pretty(&error.response)),
            VtsError::MalformedResponse { raw, .. } => Some(raw.clone()),
            _ => None,
        }
    }

    pub fn api_error_id(&self) -> Option<i64> {
        match self {
            VtsError::ApiError { error, .. } => error.error_id,
            _ => None,
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn describe(response: &Value) -> String {
    match response.get("messageType").and_then(Value::as_str) {
        Some(message_type) => message_type.to_string(),
        None => "an untagged response".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, VtsError>;
