//! Fan-out of one chat message to every other live connection.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::domain::{Account, ConnectionId, ConnectionRegistry};
use crate::ws::messages::{BroadcastEnvelope, ExtraFields};

/// Result of one broadcast, used for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the envelope was queued for.
    pub sent: usize,
    /// Peers that failed and were pruned.
    pub failed: usize,
}

/// Best-effort broadcaster over the [`ConnectionRegistry`].
///
/// Every call serializes the envelope once, sends it to a registry snapshot
/// concurrently with a per-peer timeout, then prunes the peers that failed.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
}

impl Broadcaster {
    /// Creates a broadcaster bounding each peer send by `send_timeout`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Returns the per-peer send timeout.
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Sends `message` from `sender_account` to every registered
    /// connection except `sender`.
    ///
    /// Failed peers (closed writer or send timeout) are removed from the
    /// registry after all sends have finished and are asked to close.
    pub async fn broadcast(
        &self,
        sender: ConnectionId,
        sender_account: &Account,
        message: &str,
        extra: &ExtraFields,
    ) -> BroadcastReport {
        let envelope = BroadcastEnvelope::new(&sender_account.username, message, extra);
        let frame: Arc<str> = match serde_json::to_string(&envelope) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize broadcast envelope");
                return BroadcastReport::default();
            }
        };

        let peers: Vec<_> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|peer| peer.id() != sender)
            .collect();

        let results = join_all(peers.iter().map(|peer| {
            let frame = Arc::clone(&frame);
            async move { (peer, peer.send(frame, self.send_timeout).await) }
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (peer, result) in results {
            match result {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    let removed = self.registry.remove(peer.id());
                    peer.close();
                    tracing::warn!(conn_id = %peer.id(), error = %e, removed, "pruned peer after failed send");
                }
            }
        }

        tracing::debug!(
            conn_id = %sender,
            username = %sender_account.username,
            sent = report.sent,
            failed = report.failed,
            "broadcast complete"
        );
        report
    }
}
