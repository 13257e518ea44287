use tracing::{debug, info, warn};
use vts_observability::{emit_event, ProtocolEvent};
use vts_wire::message_types::{API_ERROR, CURRENT_MODEL_RESPONSE};
use vts_wire::{
    classify, classify_error_signal_only, decode, request_ids, AvailableHotkeysData,
    AvailableModelsData, Classification, CurrentModelData, ModelCatalog, Request,
    ResponseEnvelope, Triggers,
};

use crate::config::PluginIdentity;
use crate::error::{ErrorKind, Result, VtsError};
use crate::handshake::{round_trip, SessionState};
use crate::transport::{Transport, TransportError, WebSocketTransport};

/// An authenticated connection.
///
/// Every operation sends one request and waits for one reply; the reply is
/// always taken to answer the request just sent. A transport failure closes
/// the session, after which every operation returns `NotReady`.
pub struct Session<T: Transport = WebSocketTransport> {
    transport: Option<T>,
    identity: PluginIdentity,
    state: SessionState,
    /// Label of the request most recently sent, for failure events.
    in_flight: Option<&'static str>,
}

impl<T: Transport> Session<T> {
    pub(crate) fn ready(transport: T, identity: PluginIdentity) -> Self {
        Self {
            transport: Some(transport),
            identity,
            state: SessionState::Ready,
            in_flight: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready && self.transport.is_some()
    }

    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    /// `modelName -> modelID` for every model the host can load.
    pub async fn list_models(&mut self) -> Result<ModelCatalog> {
        let request = Request::AvailableModels;
        let envelope = self.send_tagged(&request, request.default_request_id()).await?;
        let data = self.expect_success(&request, envelope)?;
        let models: AvailableModelsData = self.payload(&request, data)?;
        Ok(ModelCatalog::from_models(models.available_models))
    }

    /// The loaded model's ID, or `None` when no model is loaded.
    ///
    /// The `modelLoaded` payload is honoured even on an untagged reply.
    pub async fn current_model(&mut self) -> Result<Option<String>> {
        let request = Request::CurrentModel;
        let envelope = self.send(&request, request.default_request_id()).await?;
        let data = match classify(envelope, CURRENT_MODEL_RESPONSE) {
            Classification::Success(data) => data,
            Classification::Unexpected(envelope) if envelope.data_field("modelLoaded").is_some() => {
                debug!(
                    "reading modelLoaded from a {} reply",
                    envelope.message_type().unwrap_or("untagged")
                );
                envelope.data
            }
            other => return Err(self.reject(&request, other)),
        };
        let raw = data.to_string();
        let current: CurrentModelData = self.payload(&request, data)?;
        if !current.model_loaded {
            return Ok(None);
        }
        match current.model_id {
            Some(model_id) => Ok(Some(model_id)),
            None => Err(self.report(VtsError::MalformedResponse {
                operation: request.message_type(),
                reason: "modelLoaded is true but modelID is missing".to_string(),
                raw,
            })),
        }
    }

    pub async fn load_model(&mut self, model_id: &str) -> Result<()> {
        let request = Request::ModelLoad {
            model_id: model_id.to_string(),
        };
        let envelope = self.send_tagged(&request, request.default_request_id()).await?;
        self.expect_success(&request, envelope)?;
        info!("model {model_id} loaded");
        Ok(())
    }

    /// Animation and expression trigger names for `model_id`, or for the
    /// loaded model when `None`.
    ///
    /// If no model is loaded the request is still sent with a null `modelID`.
    /// A transport failure yields empty lists instead of an error; the
    /// session is still closed.
    pub async fn list_triggers(&mut self, model_id: Option<&str>) -> Result<Triggers> {
        let model_id = match model_id {
            Some(id) => Some(id.to_string()),
            None => match self.current_model().await {
                Ok(current) => current,
                Err(err) if err.kind() == ErrorKind::TransportClosed => {
                    warn!("hotkey refresh skipped: {err}");
                    return Ok(Triggers::default());
                }
                Err(err) => return Err(err),
            },
        };
        let request = Request::HotkeysInCurrentModel { model_id };
        let envelope = match self.send_tagged(&request, request.default_request_id()).await {
            Ok(envelope) => envelope,
            Err(err) if err.kind() == ErrorKind::TransportClosed => {
                warn!("hotkey refresh skipped: {err}");
                return Ok(Triggers::default());
            }
            Err(err) => return Err(err),
        };
        let data = self.expect_success(&request, envelope)?;
        let raw = data.to_string();
        let hotkeys: AvailableHotkeysData = self.payload(&request, data)?;
        Triggers::partition(&hotkeys.available_hotkeys).map_err(|err| {
            self.report(VtsError::MalformedResponse {
                operation: request.message_type(),
                reason: err.to_string(),
                raw,
            })
        })
    }

    /// Trigger one hotkey. Only an `APIError` tag or a truthy `errorID`
    /// counts as failure; any other reply, tagged or not, is success.
    pub async fn trigger_action(&mut self, hotkey_id: &str) -> Result<()> {
        self.trigger_with_label(hotkey_id, request_ids::HOTKEY_TRIGGER)
            .await
    }

    /// Trigger an expression then an animation hotkey.
    ///
    /// Returns `Ok(false)` without sending anything when neither is given.
    /// A failed expression stops before the animation.
    pub async fn trigger_hotkeys(
        &mut self,
        animation: Option<&str>,
        expression: Option<&str>,
    ) -> Result<bool> {
        if animation.is_none() && expression.is_none() {
            info!("no hotkeys specified");
            return Ok(false);
        }
        if let Some(expression) = expression {
            info!("executing expression hotkey {expression}");
            self.trigger_with_label(expression, request_ids::EXPRESSION_TRIGGER)
                .await?;
        }
        if let Some(animation) = animation {
            info!("executing animation hotkey {animation}");
            self.trigger_with_label(animation, request_ids::ANIMATION_TRIGGER)
                .await?;
        }
        Ok(true)
    }

    async fn trigger_with_label(
        &mut self,
        hotkey_id: &str,
        request_id: &'static str,
    ) -> Result<()> {
        let request = Request::HotkeyTrigger {
            hotkey_id: hotkey_id.to_string(),
        };
        let envelope = self.send(&request, request_id).await?;
        let acknowledged = envelope.is_type(request.response_type());
        let message_type = envelope.message_type.clone();
        match classify_error_signal_only(envelope) {
            Classification::Success(_) => {
                if !acknowledged {
                    debug!(
                        "hotkey {hotkey_id} reply {} has no error signal, treating as success",
                        message_type.as_deref().unwrap_or("<untagged>")
                    );
                }
                info!("hotkey {hotkey_id} executed");
                Ok(())
            }
            other => Err(self.reject(&request, other)),
        }
    }

    /// Close the transport. Errors are ignored; the session is unusable
    /// afterwards either way.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close().await {
                debug!("ignoring close error: {err}");
            }
            info!("disconnected");
        }
        self.state = SessionState::Disconnected;
    }

    /// Send and parse a reply that only needs to be a JSON object.
    async fn send(
        &mut self,
        request: &Request,
        request_id: &'static str,
    ) -> Result<ResponseEnvelope> {
        let raw = self.exchange(request, request_id).await?;
        ResponseEnvelope::parse(&raw).map_err(|err| {
            self.report(VtsError::MalformedResponse {
                operation: request.message_type(),
                reason: err.to_string(),
                raw,
            })
        })
    }

    /// Send and parse a reply that must carry a `messageType`.
    async fn send_tagged(
        &mut self,
        request: &Request,
        request_id: &'static str,
    ) -> Result<ResponseEnvelope> {
        let raw = self.exchange(request, request_id).await?;
        decode(&raw).map_err(|err| {
            self.report(VtsError::MalformedResponse {
                operation: request.message_type(),
                reason: err.to_string(),
                raw,
            })
        })
    }

    async fn exchange(&mut self, request: &Request, request_id: &'static str) -> Result<String> {
        let operation = request.message_type();
        self.in_flight = Some(request_id);
        if !self.is_ready() {
            return Err(self.report(VtsError::NotReady { state: self.state }));
        }
        let frame = request.encode_with_id(request_id)?;
        debug!("sending {operation} ({request_id})");
        let outcome = match self.transport.as_mut() {
            Some(transport) => round_trip(transport, &frame).await,
            None => Err(TransportError::Closed(None)),
        };
        match outcome {
            Ok(raw) => Ok(raw),
            Err(err) => {
                self.invalidate().await;
                Err(self.report(VtsError::TransportClosed {
                    operation,
                    reason: err.to_string(),
                }))
            }
        }
    }

    async fn invalidate(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.close().await;
        }
        self.state = SessionState::Disconnected;
    }

    fn expect_success(
        &self,
        request: &Request,
        envelope: ResponseEnvelope,
    ) -> Result<serde_json::Value> {
        match classify(envelope, request.response_type()) {
            Classification::Success(data) => Ok(data),
            other => Err(self.reject(request, other)),
        }
    }

    fn reject(&self, request: &Request, classification: Classification) -> VtsError {
        let operation = request.message_type();
        let err = match classification {
            Classification::ApiError(error) => VtsError::ApiError { operation, error },
            Classification::Unexpected(envelope) => VtsError::Unexpected {
                operation,
                expected: request.response_type(),
                response: envelope.into_raw(),
            },
            Classification::Success(data) => VtsError::Unexpected {
                operation,
                expected: request.response_type(),
                response: data,
            },
        };
        self.report(err)
    }

    fn payload<D: serde::de::DeserializeOwned>(
        &self,
        request: &Request,
        data: serde_json::Value,
    ) -> Result<D> {
        serde_json::from_value(data.clone()).map_err(|err| {
            self.report(VtsError::MalformedResponse {
                operation: request.message_type(),
                reason: err.to_string(),
                raw: data.to_string(),
            })
        })
    }

    /// Log a failure with the offending frame and hand it back.
    fn report(&self, err: VtsError) -> VtsError {
        warn!("{err}");
        let detail = err.raw_response();
        emit_event(failure_event(&err, self.in_flight, detail.as_deref()));
        err
    }
}

fn failure_event<'a>(
    err: &'a VtsError,
    request_id: Option<&'a str>,
    detail: Option<&'a str>,
) -> ProtocolEvent<'a> {
    ProtocolEvent {
        event: "operation.failed",
        component: "vts.session",
        operation: operation_of(err),
        request_id,
        message_type: matches!(err, VtsError::ApiError { .. }).then_some(API_ERROR),
        status: Some(err.kind().as_str()),
        error_id: err.api_error_id(),
        detail,
    }
}

fn operation_of(err: &VtsError) -> Option<&'static str> {
    match err {
        VtsError::MalformedResponse { operation, .. }
        | VtsError::ApiError { operation, .. }
        | VtsError::Unexpected { operation, .. }
        | VtsError::TransportClosed { operation, .. } => Some(*operation),
        _ => None,
    }
}
