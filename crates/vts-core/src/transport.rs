//! Duplex text-frame channel to the host application.
//!
//! The client never sends keepalive pings: the host does not answer
//! protocol-level pings and a ping timeout would drop a healthy session.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::{Result, VtsError};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection closed{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed(Option<String>),

    #[error("transport failure: {0}")]
    Failed(String),
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed(None)
            }
            other => TransportError::Failed(other.to_string()),
        }
    }
}

/// One JSON text frame per call, strictly one request in flight.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: &str) -> std::result::Result<(), TransportError>;

    /// Wait for the next text frame. Control frames are skipped.
    async fn recv_text(&mut self) -> std::result::Result<String, TransportError>;

    async fn close(&mut self) -> std::result::Result<(), TransportError>;
}

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
}

impl WebSocketTransport {
    /// Open the socket, failing with `ConnectFailure` on error or timeout.
    pub async fn open(url: &str, connect_timeout: Duration) -> Result<Self> {
        info!("connecting to {url}");
        let attempt = tokio_tungstenite::connect_async(url);
        let (stream, _response) = match tokio::time::timeout(connect_timeout, attempt).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(err)) => {
                return Err(VtsError::ConnectFailure {
                    address: url.to_string(),
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                return Err(VtsError::ConnectFailure {
                    address: url.to_string(),
                    reason: format!("timed out after {}s", connect_timeout.as_secs_f32()),
                })
            }
        };
        info!("connected to {url}");
        Ok(Self {
            stream,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: &str) -> std::result::Result<(), TransportError> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> std::result::Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes).map_err(|err| {
                        TransportError::Failed(format!("binary frame is not UTF-8: {err}"))
                    })
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(TransportError::Closed(
                        frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty()),
                    ))
                }
                Some(Ok(other)) => {
                    debug!("skipping {} byte control frame", other.len());
                    continue;
                }
                Some(Err(err)) => return Err(err.into()),
                None => return Err(TransportError::Closed(None)),
            }
        }
    }

    async fn close(&mut self) -> std::result::Result<(), TransportError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
