//! Live connection handle.
//!
//! A [`ConnectionHandle`] is what the registry stores for one open
//! WebSocket: an opaque [`ConnectionId`], the sending half of the
//! connection's bounded outbound queue, and a shutdown token. It caches
//! no account identity.
//!
//! The receiving half of the queue is drained by the connection's writer
//! task, which owns the socket sink. Once that task stops, every send
//! through the handle fails with [`TransportError::Closed`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// Opaque identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cloneable handle to a live connection's outbound side.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbox: mpsc::Sender<Arc<str>>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Creates a handle with an outbound queue of `capacity` frames and
    /// returns the queue's receiving half for the writer task.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            outbox,
            shutdown: CancellationToken::new(),
        };
        (handle, rx)
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues one text frame, waiting at most `timeout` for queue space.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the writer task is gone and
    /// [`TransportError::TimedOut`] if the queue stayed full.
    pub async fn send(&self, frame: Arc<str>, timeout: Duration) -> Result<(), TransportError> {
        match tokio::time::timeout(timeout, self.outbox.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::TimedOut(timeout)),
        }
    }

    /// Asks the owning session to shut the connection down.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Completes when [`close`](Self::close) is called on any clone.
    pub async fn closing(&self) {
        self.shutdown.cancelled().await;
    }

    /// Returns the token cancelled by [`close`](Self::close).
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
