//! Shared helpers: boot the real router on a random port and drive it with
//! WebSocket clients.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use socktalk::api::build_app;
use socktalk::app_state::AppState;
use socktalk::config::AppConfig;
use socktalk::domain::{Account, InMemoryAccountStore};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// How long a test waits for an expected frame.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A WebSocket test client.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running server and the state behind it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
}

impl TestServer {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Opens a WebSocket and waits until the server has registered it.
    pub async fn connect(&self) -> Client {
        let before = self.state.registry.len();
        let Ok((client, _)) = tokio_tungstenite::connect_async(format!("ws://{}/ws", self.addr)).await
        else {
            panic!("websocket handshake failed");
        };
        self.wait_for_connections(before + 1).await;
        client
    }

    /// Waits until exactly `n` connections are registered.
    pub async fn wait_for_connections(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while self.state.registry.len() != n {
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "expected {n} registered connections, found {}",
                    self.state.registry.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn signup(&self, username: &str) -> Account {
        let Ok(account) = self.state.accounts.signup(username, "secret_pw").await else {
            panic!("signup of {username} failed");
        };
        account
    }
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(AppConfig::default()).await
}

pub async fn spawn_server_with(config: AppConfig) -> TestServer {
    let state = AppState::new(Arc::new(InMemoryAccountStore::new()), &config);
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    let app = build_app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestServer { addr, state }
}

pub async fn send_json(client: &mut Client, value: &Value) {
    send_text(client, value.to_string()).await;
}

pub async fn send_text(client: &mut Client, text: String) {
    let Ok(()) = client.send(Message::text(text)).await else {
        panic!("client send failed");
    };
}

pub fn send_message(api_key: &str, message: &str) -> Value {
    serde_json::json!({
        "action": "send_message",
        "api_key": api_key,
        "message": message,
    })
}

/// Receives the next text frame as JSON, skipping control frames.
pub async fn recv_json(client: &mut Client) -> Value {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let Ok(value) = serde_json::from_str(text.as_str()) else {
                    panic!("server sent non-JSON text: {text}");
                };
                return value;
            }
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(other) => panic!("unexpected frame or stream end: {other:?}"),
            Err(_) => panic!("timed out waiting for a frame"),
        }
    }
}

/// Asserts that no text frame arrives within `window`.
pub async fn expect_silence(client: &mut Client, window: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(window, client.next()).await {
        panic!("unexpected frame: {text}");
    }
}

/// Returns `true` for an ack envelope.
pub fn is_ack(value: &Value) -> bool {
    value.get("status").is_some() && value.get("sender").is_none()
}
