//! In-memory stand-in for the host application.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use vts_core::{Transport, TransportError};

pub enum Reply {
    Frame(Value),
    Text(String),
    /// Drop the connection instead of answering.
    Hangup,
}

type Responder = Box<dyn FnMut(&Value) -> Reply + Send>;

/// Every frame the client sent, in order.
#[derive(Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Value>>>);

impl SentLog {
    pub fn message_types(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .map(|frame| frame["messageType"].as_str().unwrap_or("").to_string())
            .collect()
    }

    pub fn frames(&self) -> Vec<Value> {
        self.0.lock().clone()
    }

    pub fn count(&self, message_type: &str) -> usize {
        self.message_types()
            .iter()
            .filter(|t| t.as_str() == message_type)
            .count()
    }
}

pub struct ScriptedHost {
    responder: Responder,
    pending: VecDeque<Result<String, TransportError>>,
    sent: SentLog,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedHost {
    pub fn new(responder: impl FnMut(&Value) -> Reply + Send + 'static) -> (Self, SentLog) {
        let sent = SentLog::default();
        let host = Self {
            responder: Box::new(responder),
            pending: VecDeque::new(),
            sent: sent.clone(),
            closed: Arc::new(Mutex::new(false)),
        };
        (host, sent)
    }

    pub fn closed_flag(&self) -> Arc<Mutex<bool>> {
        self.closed.clone()
    }
}

#[async_trait]
impl Transport for ScriptedHost {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if *self.closed.lock() {
            return Err(TransportError::Closed(None));
        }
        let frame: Value = serde_json::from_str(text).expect("client sent invalid JSON");
        self.sent.0.lock().push(frame.clone());
        let reply = match (self.responder)(&frame) {
            Reply::Frame(value) => Ok(value.to_string()),
            Reply::Text(text) => Ok(text),
            Reply::Hangup => Err(TransportError::Closed(Some("host went away".into()))),
        };
        self.pending.push_back(reply);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        self.pending
            .pop_front()
            .unwrap_or(Err(TransportError::Closed(None)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        *self.closed.lock() = true;
        Ok(())
    }
}

pub fn response(message_type: &str, data: Value) -> Reply {
    Reply::Frame(json!({
        "apiName": "VTubeStudioPublicAPI",
        "apiVersion": "1.0",
        "requestID": "reply",
        "messageType": message_type,
        "data": data
    }))
}

pub fn api_error(error_id: i64, message: &str) -> Reply {
    response(
        "APIError",
        json!({ "errorID": error_id, "message": message }),
    )
}

/// Answers both handshake steps successfully, then defers to `rest`.
pub fn with_handshake(
    mut rest: impl FnMut(&Value) -> Reply + Send + 'static,
) -> impl FnMut(&Value) -> Reply + Send + 'static {
    move |frame: &Value| match frame["messageType"].as_str() {
        Some("AuthenticationTokenRequest") => response(
            "AuthenticationTokenResponse",
            json!({ "authenticationToken": "tok-123" }),
        ),
        Some("AuthenticationRequest") => {
            response("AuthenticationResponse", json!({ "authenticated": true }))
        }
        _ => rest(frame),
    }
}

/// JSON log lines written while the returned guard is alive on this thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Lines emitted on the `vts.obs` target.
    pub fn protocol_events(&self) -> Vec<Value> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|line| line["target"] == "vts.obs")
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
