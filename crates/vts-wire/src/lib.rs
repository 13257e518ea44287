//! Wire-format models for the VTube Studio public API.
//!
//! Every frame on the socket is one JSON object carrying the fixed envelope
//! `{apiName, apiVersion, requestID, messageType, data?}`. Field names are
//! fixed by the host application and are matched byte-for-byte.

mod classify;
mod envelope;
mod models;
mod request;

pub use classify::{
    classify, classify_error_signal_only, is_truthy, ApiErrorPayload, Classification,
};
pub use envelope::{decode, encode, DecodeError, RequestEnvelope, ResponseEnvelope};
pub use models::{
    AuthenticationData, AuthenticationTokenData, AvailableHotkeysData, AvailableModelsData,
    CurrentModelData, Hotkey, HotkeyKind, Model, ModelCatalog, Triggers, UnnamedHotkey,
};
pub use request::{message_types, request_ids, Request};

pub const API_NAME: &str = "VTubeStudioPublicAPI";
pub const API_VERSION: &str = "1.0";
