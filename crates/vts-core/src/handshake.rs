//! Connection handshake.
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingToken -> Authenticating -> Ready
//!                      \              \                \
//!                       +--------------+----------------+--> Failed(kind)
//! ```
//!
//! A stored token skips the token request; otherwise exactly one
//! `AuthenticationTokenRequest` is sent and the granted token is persisted
//! before authenticating.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};
use vts_observability::{emit_event, ProtocolEvent};
use vts_wire::message_types::{AUTHENTICATION_RESPONSE, AUTHENTICATION_TOKEN_RESPONSE};
use vts_wire::{AuthenticationData, AuthenticationTokenData, Request, ResponseEnvelope};

use crate::config::{ClientConfig, PluginIdentity};
use crate::credential::{Credential, CredentialStore};
use crate::error::{ErrorKind, Result, VtsError};
use crate::session::Session;
use crate::transport::{Transport, TransportError, WebSocketTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "kind")]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingToken,
    Authenticating,
    Ready,
    Failed(ErrorKind),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::AwaitingToken => f.write_str("awaiting_token"),
            SessionState::Authenticating => f.write_str("authenticating"),
            SessionState::Ready => f.write_str("ready"),
            SessionState::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Resolve the address, open the socket and authenticate.
pub async fn connect(
    config: &ClientConfig,
    store: &CredentialStore,
) -> Result<Session<WebSocketTransport>> {
    let url = config.websocket_url();
    let mut tracker = StateTracker::default();
    tracker.advance(SessionState::Connecting);
    let transport = match WebSocketTransport::open(&url, config.connect_timeout).await {
        Ok(transport) => transport,
        Err(err) => return Err(tracker.fail(err)),
    };
    Session::establish(transport, config.identity.clone(), store).await
}

impl<T: Transport> Session<T> {
    /// Run token acquisition and authentication over an open transport.
    ///
    /// On failure the transport is closed best-effort and the error carries
    /// the offending response.
    pub async fn establish(
        mut transport: T,
        identity: PluginIdentity,
        store: &CredentialStore,
    ) -> Result<Self> {
        let mut tracker = StateTracker {
            state: SessionState::Connecting,
        };
        match run_handshake(&mut transport, &identity, store, &mut tracker).await {
            Ok(()) => {
                tracker.advance(SessionState::Ready);
                info!("plugin authenticated for the duration of this session");
                Ok(Session::ready(transport, identity))
            }
            Err(err) => {
                let err = tracker.fail(err);
                if let Err(close_err) = transport.close().await {
                    debug!("ignoring close error after failed handshake: {close_err}");
                }
                Err(err)
            }
        }
    }
}

#[derive(Debug)]
struct StateTracker {
    state: SessionState,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnected,
        }
    }
}

impl StateTracker {
    fn advance(&mut self, next: SessionState) {
        debug!("session state {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: VtsError) -> VtsError {
        let failed = SessionState::Failed(err.kind());
        warn!("session state {} -> {}: {err}", self.state, failed);
        self.state = failed;
        let detail = err.raw_response();
        emit_event(ProtocolEvent {
            event: "handshake.failed",
            component: "vts.handshake",
            status: Some(err.kind().as_str()),
            error_id: err.api_error_id(),
            detail: detail.as_deref(),
            ..ProtocolEvent::default()
        });
        err
    }
}

async fn run_handshake<T: Transport>(
    transport: &mut T,
    identity: &PluginIdentity,
    store: &CredentialStore,
    tracker: &mut StateTracker,
) -> Result<()> {
    tracker.advance(SessionState::AwaitingToken);
    let token = match store.load() {
        Some(token) => token,
        None => {
            info!("no authentication token found, requesting one");
            let token = request_token(transport, identity).await?;
            if let Err(err) = store.save(&token) {
                warn!("continuing with an unsaved authentication token: {err}");
            }
            token
        }
    };

    tracker.advance(SessionState::Authenticating);
    authenticate(transport, identity, &token).await
}

async fn request_token<T: Transport>(
    transport: &mut T,
    identity: &PluginIdentity,
) -> Result<Credential> {
    let request = Request::AuthenticationToken {
        plugin_name: identity.plugin_name.clone(),
        plugin_developer: identity.plugin_developer.clone(),
    };
    let response = exchange(transport, &request).await?;
    if !response.is_type(AUTHENTICATION_TOKEN_RESPONSE) {
        return Err(VtsError::TokenAcquisitionFailure {
            response: response.into_raw(),
        });
    }
    match response.payload::<AuthenticationTokenData>() {
        Ok(data) if !data.authentication_token.trim().is_empty() => {
            Ok(Credential::new(data.authentication_token))
        }
        _ => Err(VtsError::TokenAcquisitionFailure {
            response: response.into_raw(),
        }),
    }
}

async fn authenticate<T: Transport>(
    transport: &mut T,
    identity: &PluginIdentity,
    token: &Credential,
) -> Result<()> {
    info!("sending authentication request");
    let request = Request::Authentication {
        plugin_name: identity.plugin_name.clone(),
        plugin_developer: identity.plugin_developer.clone(),
        authentication_token: token.expose().to_string(),
    };
    let response = exchange(transport, &request).await?;
    let authenticated = response.is_type(AUTHENTICATION_RESPONSE)
        && response
            .payload::<AuthenticationData>()
            .is_ok_and(|data| data.authenticated);
    if authenticated {
        Ok(())
    } else {
        Err(VtsError::AuthenticationFailure {
            response: response.into_raw(),
        })
    }
}

/// One handshake round trip. Handshake frames only need to be JSON objects;
/// the tag is checked by the caller so a wrong reply surfaces whole.
async fn exchange<T: Transport>(transport: &mut T, request: &Request) -> Result<ResponseEnvelope> {
    let operation = request.message_type();
    let frame = request.encode()?;
    let raw = round_trip(transport, &frame)
        .await
        .map_err(|err| VtsError::TransportClosed {
            operation,
            reason: err.to_string(),
        })?;
    ResponseEnvelope::parse(&raw).map_err(|err| VtsError::MalformedResponse {
        operation,
        reason: err.to_string(),
        raw,
    })
}

pub(crate) async fn round_trip<T: Transport>(
    transport: &mut T,
    frame: &str,
) -> std::result::Result<String, TransportError> {
    transport.send_text(frame).await?;
    transport.recv_text().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_state_names_its_kind() {
        assert_eq!(
            SessionState::Failed(ErrorKind::AuthenticationFailure).to_string(),
            "failed(authentication_failure)"
        );
        assert_eq!(SessionState::AwaitingToken.to_string(), "awaiting_token");
    }

    #[test]
    fn tracker_records_failure_kind() {
        let mut tracker = StateTracker::default();
        tracker.advance(SessionState::Connecting);
        let err = tracker.fail(VtsError::ConnectFailure {
            address: "ws://nowhere:8001".into(),
            reason: "refused".into(),
        });
        assert_eq!(err.kind(), ErrorKind::ConnectFailure);
        assert_eq!(
            tracker.state,
            SessionState::Failed(ErrorKind::ConnectFailure)
        );
    }
}
