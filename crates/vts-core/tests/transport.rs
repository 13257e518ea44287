use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use vts_core::{
    connect, ClientConfig, CredentialStore, ErrorKind, SessionState, Transport, TransportError,
    WebSocketTransport,
};

async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

fn local_config(url: &str, dir: &TempDir) -> ClientConfig {
    ClientConfig {
        host: Some(url.to_string()),
        token_path: dir.path().join("auth_token.txt"),
        connect_timeout: Duration::from_millis(500),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn refused_connection_is_connect_failure() {
    let (listener, url) = local_listener().await;
    drop(listener);

    let err = WebSocketTransport::open(&url, Duration::from_secs(2))
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::ConnectFailure);
    assert!(err.to_string().contains(&url));
}

#[tokio::test]
async fn silent_server_times_out_as_connect_failure() {
    // accepts TCP via the backlog but never answers the upgrade
    let (_listener, url) = local_listener().await;

    let err = WebSocketTransport::open(&url, Duration::from_millis(200))
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::ConnectFailure);
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn connect_surfaces_connect_failure() {
    let dir = TempDir::new().unwrap();
    let (listener, url) = local_listener().await;
    drop(listener);
    let config = local_config(&url, &dir);

    let err = connect(&config, &CredentialStore::new(&config.token_path))
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::ConnectFailure);
    assert!(err.invalidates_session());
}

#[tokio::test]
async fn recv_skips_control_frames_and_accepts_utf8_binary() {
    let (listener, url) = local_listener().await;
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let request = ws.next().await.unwrap().unwrap();
        ws.send(Message::Ping(b"keepalive".to_vec())).await.unwrap();
        ws.send(Message::Binary(
            br#"{"messageType":"StatisticsResponse"}"#.to_vec(),
        ))
        .await
        .unwrap();
        ws.send(Message::Binary(vec![0xff, 0xfe])).await.unwrap();
        ws.send(Message::Text(r#"{"data":{}}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        })))
        .await
        .unwrap();
        // drain until the client goes away
        while let Some(Ok(_)) = ws.next().await {}
        request
    });

    let mut transport = WebSocketTransport::open(&url, Duration::from_secs(2))
        .await
        .unwrap();
    transport.send_text(r#"{"messageType":"Ping"}"#).await.unwrap();

    assert_eq!(
        transport.recv_text().await.unwrap(),
        r#"{"messageType":"StatisticsResponse"}"#
    );
    assert!(matches!(
        transport.recv_text().await,
        Err(TransportError::Failed(reason)) if reason.contains("not UTF-8")
    ));
    assert_eq!(transport.recv_text().await.unwrap(), r#"{"data":{}}"#);
    assert!(matches!(
        transport.recv_text().await,
        Err(TransportError::Closed(Some(reason))) if reason == "bye"
    ));
    drop(transport);

    let request = server.await.unwrap();
    assert_eq!(request, Message::Text(r#"{"messageType":"Ping"}"#.to_string()));
}

#[tokio::test]
async fn connect_authenticates_over_websocket() {
    let dir = TempDir::new().unwrap();
    let (listener, url) = local_listener().await;
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let mut seen = Vec::new();
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let frame: Value = serde_json::from_str(&text).unwrap();
            let message_type = frame["messageType"].as_str().unwrap_or("").to_string();
            let (reply_type, data) = match message_type.as_str() {
                "AuthenticationTokenRequest" => (
                    "AuthenticationTokenResponse",
                    json!({"authenticationToken": "socket-token"}),
                ),
                "AuthenticationRequest" => {
                    ("AuthenticationResponse", json!({"authenticated": true}))
                }
                _ => break,
            };
            seen.push(message_type);
            let reply = json!({
                "apiName": "VTubeStudioPublicAPI",
                "apiVersion": "1.0",
                "requestID": frame["requestID"],
                "messageType": reply_type,
                "data": data
            });
            ws.send(Message::Text(reply.to_string())).await.unwrap();
        }
        seen
    });
    let config = local_config(&url, &dir);
    let store = CredentialStore::new(&config.token_path);

    let mut session = connect(&config, &store).await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(store.load().unwrap().expose(), "socket-token");
    session.disconnect().await;
    assert_eq!(
        server.await.unwrap(),
        vec!["AuthenticationTokenRequest", "AuthenticationRequest"]
    );
}
