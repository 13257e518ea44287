use serde_json::{json, Value};

use crate::envelope::RequestEnvelope;

pub mod message_types {
    pub const API_ERROR: &str = "APIError";

    pub const AUTHENTICATION_TOKEN_REQUEST: &str = "AuthenticationTokenRequest";
    pub const AUTHENTICATION_TOKEN_RESPONSE: &str = "AuthenticationTokenResponse";
    pub const AUTHENTICATION_REQUEST: &str = "AuthenticationRequest";
    pub const AUTHENTICATION_RESPONSE: &str = "AuthenticationResponse";
    pub const CURRENT_MODEL_REQUEST: &str = "CurrentModelRequest";
    pub const CURRENT_MODEL_RESPONSE: &str = "CurrentModelResponse";
    pub const AVAILABLE_MODELS_REQUEST: &str = "AvailableModelsRequest";
    pub const AVAILABLE_MODELS_RESPONSE: &str = "AvailableModelsResponse";
    pub const MODEL_LOAD_REQUEST: &str = "ModelLoadRequest";
    pub const MODEL_LOAD_RESPONSE: &str = "ModelLoadResponse";
    pub const HOTKEYS_IN_CURRENT_MODEL_REQUEST: &str = "HotkeysInCurrentModelRequest";
    pub const HOTKEYS_IN_CURRENT_MODEL_RESPONSE: &str = "HotkeysInCurrentModelResponse";
    pub const HOTKEY_TRIGGER_REQUEST: &str = "HotkeyTriggerRequest";
    pub const HOTKEY_TRIGGER_RESPONSE: &str = "HotkeyTriggerResponse";
}

/// Correlation labels sent in `requestID`. The exchange is strictly one
/// request then one reply, so replies are never matched against them.
pub mod request_ids {
    pub const AUTHENTICATION_TOKEN: &str = "AuthenticationTokenRequestID";
    pub const AUTHENTICATION: &str = "AuthenticationRequestID";
    pub const GET_MODEL: &str = "GetModelID";
    pub const LOAD_MODEL: &str = "LoadModelID";
    pub const GET_HOTKEYS: &str = "GetHotkeysID";
    pub const HOTKEY_TRIGGER: &str = "HotkeyTriggerID";
    pub const EXPRESSION_TRIGGER: &str = "ExpressionRequestID";
    pub const ANIMATION_TRIGGER: &str = "AnimationRequestID";
}

use message_types::*;

/// Every request this client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    AuthenticationToken {
        plugin_name: String,
        plugin_developer: String,
    },
    Authentication {
        plugin_name: String,
        plugin_developer: String,
        authentication_token: String,
    },
    CurrentModel,
    AvailableModels,
    ModelLoad {
        model_id: String,
    },
    /// `model_id: None` is sent as JSON `null`; the host decides what that means.
    HotkeysInCurrentModel {
        model_id: Option<String>,
    },
    HotkeyTrigger {
        hotkey_id: String,
    },
}

impl Request {
    pub fn message_type(&self) -> &'static str {
        match self {
            Request::AuthenticationToken { .. } => AUTHENTICATION_TOKEN_REQUEST,
            Request::Authentication { .. } => AUTHENTICATION_REQUEST,
            Request::CurrentModel => CURRENT_MODEL_REQUEST,
            Request::AvailableModels => AVAILABLE_MODELS_REQUEST,
            Request::ModelLoad { .. } => MODEL_LOAD_REQUEST,
            Request::HotkeysInCurrentModel { .. } => HOTKEYS_IN_CURRENT_MODEL_REQUEST,
            Request::HotkeyTrigger { .. } => HOTKEY_TRIGGER_REQUEST,
        }
    }

    /// The one success `messageType` the host answers this request with.
    pub fn response_type(&self) -> &'static str {
        match self {
            Request::AuthenticationToken { .. } => AUTHENTICATION_TOKEN_RESPONSE,
            Request::Authentication { .. } => AUTHENTICATION_RESPONSE,
            Request::CurrentModel => CURRENT_MODEL_RESPONSE,
            Request::AvailableModels => AVAILABLE_MODELS_RESPONSE,
            Request::ModelLoad { .. } => MODEL_LOAD_RESPONSE,
            Request::HotkeysInCurrentModel { .. } => HOTKEYS_IN_CURRENT_MODEL_RESPONSE,
            Request::HotkeyTrigger { .. } => HOTKEY_TRIGGER_RESPONSE,
        }
    }

    pub fn default_request_id(&self) -> &'static str {
        match self {
            Request::AuthenticationToken { .. } => request_ids::AUTHENTICATION_TOKEN,
            Request::Authentication { .. } => request_ids::AUTHENTICATION,
            Request::CurrentModel | Request::AvailableModels => request_ids::GET_MODEL,
            Request::ModelLoad { .. } => request_ids::LOAD_MODEL,
            Request::HotkeysInCurrentModel { .. } => request_ids::GET_HOTKEYS,
            Request::HotkeyTrigger { .. } => request_ids::HOTKEY_TRIGGER,
        }
    }

    /// Variant-specific payload; `None` for parameterless requests.
    pub fn payload(&self) -> Option<Value> {
        match self {
            Request::AuthenticationToken {
                plugin_name,
                plugin_developer,
            } => Some(json!({
                "pluginName": plugin_name,
                "pluginDeveloper": plugin_developer,
            })),
            Request::Authentication {
                plugin_name,
                plugin_developer,
                authentication_token,
            } => Some(json!({
                "pluginName": plugin_name,
                "pluginDeveloper": plugin_developer,
                "authenticationToken": authentication_token,
            })),
            Request::CurrentModel | Request::AvailableModels => None,
            Request::ModelLoad { model_id } => Some(json!({ "modelID": model_id })),
            Request::HotkeysInCurrentModel { model_id } => Some(json!({ "modelID": model_id })),
            Request::HotkeyTrigger { hotkey_id } => Some(json!({ "hotkeyID": hotkey_id })),
        }
    }

    pub fn envelope(&self, request_id: &str) -> RequestEnvelope {
        let envelope = RequestEnvelope::new(request_id, self.message_type());
        match self.payload() {
            Some(data) => envelope.with_data(data),
            None => envelope,
        }
    }

    /// Serialize with the default request label.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        self.encode_with_id(self.default_request_id())
    }

    pub fn encode_with_id(&self, request_id: &str) -> Result<String, serde_json::Error> {
        self.envelope(request_id).to_json()
    }
}
