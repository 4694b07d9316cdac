//! WebSocket session lifecycle.
//!
//! One session per upgraded socket:
//!
//! 1. register a [`ConnectionHandle`] in the registry,
//! 2. read frames until the peer leaves, the transport fails, or a
//!    broadcaster asks the connection to close,
//! 3. deregister (via the [`Registration`](crate::domain::Registration)
//!    guard) and stop the writer task.
//!
//! Every outbound frame, acks included, goes through the connection's
//! bounded queue and is written to the socket by a dedicated writer task.
//! Identity is resolved from the `api_key` of each inbound envelope; the
//! session itself stores none.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::messages::{Ack, InboundEnvelope, SEND_MESSAGE};
use crate::app_state::AppState;
use crate::domain::{ConnectionHandle, ConnectionId};
use crate::error::SessionError;

/// Runs one WebSocket session from registration to cleanup.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, outbox) = ConnectionHandle::new(state.outbound_queue_capacity);
    let registration = state.registry.register(handle.clone());
    let conn_id = registration.id();
    let send_timeout = state.broadcaster.send_timeout();
    tracing::info!(%conn_id, connections = state.registry.len(), "client connected");

    // Stops the writer even if this future is dropped before cleanup runs.
    let _stop_writer = handle.shutdown_token().drop_guard();
    let mut writer = tokio::spawn(write_loop(ws_tx, outbox, handle.shutdown_token()));

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let ack = match msg {
                    Some(Ok(Message::Text(text))) => handle_text_message(&text, conn_id, &state).await,
                    Some(Ok(Message::Binary(_))) => {
                        Ack::from(&SessionError::Protocol("binary frame".to_string()))
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "ws receive failed");
                        break;
                    }
                };
                let json = match serde_json::to_string(&ack) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "failed to serialize ack");
                        continue;
                    }
                };
                if let Err(e) = handle.send(Arc::from(json), send_timeout).await {
                    tracing::debug!(%conn_id, error = %e, "ack not delivered");
                    break;
                }
            }
            () = handle.closing() => {
                tracing::debug!(%conn_id, "connection closed by server");
                break;
            }
        }
    }

    drop(registration);
    handle.close();
    if tokio::time::timeout(send_timeout, &mut writer).await.is_err() {
        writer.abort();
    }
    tracing::info!(%conn_id, connections = state.registry.len(), "client disconnected");
}

/// Handles one text frame and returns the ack for the sender.
pub async fn handle_text_message(text: &str, conn_id: ConnectionId, state: &AppState) -> Ack {
    match dispatch(text, conn_id, state).await {
        Ok(()) => Ack::sent(),
        Err(e) => {
            tracing::debug!(%conn_id, error = ?e, status = e.status(), "message rejected");
            Ack::from(&e)
        }
    }
}

async fn dispatch(text: &str, conn_id: ConnectionId, state: &AppState) -> Result<(), SessionError> {
    let envelope = InboundEnvelope::parse(text)?;
    let account = state.auth.authenticate(envelope.api_key.as_deref()).await?;

    match envelope.action.as_deref() {
        Some(SEND_MESSAGE) => {
            let message = envelope
                .message_text()
                .ok_or(SessionError::MissingMessage)?;
            let report = state
                .broadcaster
                .broadcast(conn_id, &account, message, &envelope.extra)
                .await;
            if report.failed > 0 {
                tracing::info!(%conn_id, sent = report.sent, failed = report.failed, "broadcast partially delivered");
            }
            Ok(())
        }
        other => Err(SessionError::UnsupportedAction(other.map(str::to_string))),
    }
}

/// Drains the outbound queue into the socket until the queue closes, a
/// write fails, or `shutdown` is cancelled. Queued frames are flushed
/// before a requested close. Cancels `shutdown` on exit so the session
/// notices a dead writer.
async fn write_loop<S>(
    mut ws_tx: S,
    mut outbox: mpsc::Receiver<Arc<str>>,
    shutdown: CancellationToken,
) where
    S: Sink<Message> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            frame = outbox.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                if ws_tx.send(Message::text(&*frame)).await.is_err() {
                    break;
                }
            }
            () = shutdown.cancelled() => {
                while let Ok(frame) = outbox.try_recv() {
                    if ws_tx.send(Message::text(&*frame)).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    let _ = ws_tx.close().await;
    shutdown.cancel();
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio_util::sync::PollSender;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{Account, AccountStore, InMemoryAccountStore};

    async fn setup() -> (AppState, Account) {
        let store = Arc::new(InMemoryAccountStore::new());
        let account = Account::new("alice".to_string(), "pw");
        let Ok(()) = store.insert(account.clone()).await else {
            panic!("insert failed");
        };
        let config = AppConfig {
            send_timeout: Duration::from_millis(50),
            ..AppConfig::default()
        };
        (AppState::new(store, &config), account)
    }

    fn join(state: &AppState) -> (ConnectionHandle, mpsc::Receiver<Arc<str>>) {
        let (handle, rx) = ConnectionHandle::new(8);
        state.registry.add(handle.clone());
        (handle, rx)
    }

    fn send_message(api_key: &str, message: &str) -> String {
        serde_json::json!({
            "action": "send_message",
            "api_key": api_key,
            "message": message,
        })
        .to_string()
    }

    #[tokio::test]
    async fn valid_message_is_acked_and_broadcast() {
        let (state, account) = setup().await;
        let (sender, _sender_rx) = join(&state);
        let (_, mut peer_rx) = join(&state);

        let ack = handle_text_message(&send_message(&account.api_key, "hi"), sender.id(), &state).await;
        assert_eq!(ack, Ack::sent());

        let Ok(frame) = peer_rx.try_recv() else {
            panic!("peer missed the broadcast");
        };
        let Ok(value) = serde_json::from_str::<Value>(&frame) else {
            panic!("broadcast is not JSON");
        };
        assert_eq!(value["sender"]["username"], "alice");
        assert_eq!(value["message"], "hi");
        assert!(value.get("api_key").is_none());
        assert!(value.get("action").is_none());
    }

    #[tokio::test]
    async fn invalid_key_gets_401_without_broadcast() {
        let (state, _) = setup().await;
        let (sender, _sender_rx) = join(&state);
        let (_, mut peer_rx) = join(&state);

        let ack = handle_text_message(&send_message("wrong", "hi"), sender.id(), &state).await;
        assert_eq!(ack.status, 401);
        assert_eq!(ack.message, "Invalid API key.");
        assert!(peer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_message_gets_400_without_broadcast() {
        let (state, account) = setup().await;
        let (sender, _sender_rx) = join(&state);
        let (_, mut peer_rx) = join(&state);

        let empty = handle_text_message(&send_message(&account.api_key, ""), sender.id(), &state).await;
        let absent = serde_json::json!({"action": "send_message", "api_key": account.api_key});
        let absent = handle_text_message(&absent.to_string(), sender.id(), &state).await;

        for ack in [empty, absent] {
            assert_eq!(ack.status, 400);
            assert_eq!(ack.message, "Message field is required.");
        }
        assert!(peer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn auth_is_checked_before_action() {
        let (state, account) = setup().await;
        let (sender, _sender_rx) = join(&state);

        let bad_key = serde_json::json!({"action": "dance", "api_key": "nope"}).to_string();
        let ack = handle_text_message(&bad_key, sender.id(), &state).await;
        assert_eq!(ack.status, 401);

        let good_key = serde_json::json!({"action": "dance", "api_key": account.api_key}).to_string();
        let ack = handle_text_message(&good_key, sender.id(), &state).await;
        assert_eq!(ack.status, 400);
        assert_eq!(ack.message, "Unsupported action.");
    }

    #[tokio::test]
    async fn malformed_payload_gets_400() {
        let (state, _) = setup().await;
        let (sender, _sender_rx) = join(&state);
        let ack = handle_text_message("{not json", sender.id(), &state).await;
        assert_eq!(ack.status, 400);
        assert_eq!(ack.message, "Malformed payload.");
    }

    #[tokio::test]
    async fn rotated_key_fails_on_next_message() {
        let (state, account) = setup().await;
        let (sender, _sender_rx) = join(&state);

        let first = handle_text_message(&send_message(&account.api_key, "1"), sender.id(), &state).await;
        assert_eq!(first.status, 200);

        let Ok(rotated) = state.accounts.rotate_api_key(&account.api_key).await else {
            panic!("rotation failed");
        };
        let stale = handle_text_message(&send_message(&account.api_key, "2"), sender.id(), &state).await;
        assert_eq!(stale.status, 401);
        let fresh = handle_text_message(&send_message(&rotated.api_key, "3"), sender.id(), &state).await;
        assert_eq!(fresh.status, 200);
        assert!(state.registry.contains(sender.id()));
    }

    const WRITER_EXIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn writer_flushes_queue_then_stops_on_close() {
        let (handle, outbox) = ConnectionHandle::new(8);
        let (sink_tx, mut sink_rx) = mpsc::channel::<Message>(8);
        let sink = PollSender::new(sink_tx);
        let writer = tokio::spawn(write_loop(sink, outbox, handle.shutdown_token()));

        let Ok(()) = handle.send(Arc::from("one"), WRITER_EXIT).await else {
            panic!("queue rejected frame");
        };
        let Ok(()) = handle.send(Arc::from("two"), WRITER_EXIT).await else {
            panic!("queue rejected frame");
        };
        handle.close();

        let Ok(Ok(())) = tokio::time::timeout(WRITER_EXIT, writer).await else {
            panic!("writer did not stop");
        };
        assert_eq!(sink_rx.recv().await, Some(Message::text("one")));
        assert_eq!(sink_rx.recv().await, Some(Message::text("two")));
        assert_eq!(sink_rx.recv().await, None);
    }

    #[tokio::test]
    async fn writer_stops_when_session_is_dropped_while_handles_live_on() {
        let (handle, outbox) = ConnectionHandle::new(8);
        let (sink_tx, mut sink_rx) = mpsc::channel::<Message>(8);
        let sink = PollSender::new(sink_tx);
        let writer = tokio::spawn(write_loop(sink, outbox, handle.shutdown_token()));

        let guard = handle.shutdown_token().drop_guard();
        let session = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        session.abort();
        let _ = session.await;

        // `handle` still owns a sender, so the queue never reports closed.
        let Ok(Ok(())) = tokio::time::timeout(WRITER_EXIT, writer).await else {
            panic!("writer outlived its session");
        };
        assert!(handle.is_closing());
        assert_eq!(sink_rx.recv().await, None);
    }

    #[tokio::test]
    async fn failed_socket_write_signals_session() {
        let (handle, outbox) = ConnectionHandle::new(8);
        let (sink_tx, sink_rx) = mpsc::channel::<Message>(1);
        drop(sink_rx);
        let sink = PollSender::new(sink_tx);
        let writer = tokio::spawn(write_loop(sink, outbox, handle.shutdown_token()));

        let Ok(()) = handle.send(Arc::from("lost"), WRITER_EXIT).await else {
            panic!("queue rejected frame");
        };
        let Ok(()) = tokio::time::timeout(WRITER_EXIT, handle.closing()).await else {
            panic!("session was not told the writer died");
        };
        let Ok(Ok(())) = tokio::time::timeout(WRITER_EXIT, writer).await else {
            panic!("writer did not stop");
        };
    }
}
