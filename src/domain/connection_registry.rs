//! Process-wide set of live connections.
//!
//! [`ConnectionRegistry`] keeps every open connection in a `HashMap`
//! behind a single [`std::sync::RwLock`]. The lock is never held across an
//! `.await`: fan-out iterates over a copied [`snapshot`](ConnectionRegistry::snapshot)
//! so sessions can join and leave while a broadcast is in flight.
//!
//! Sessions join through [`ConnectionRegistry::register`], whose
//! [`Registration`] guard removes the connection when dropped. That makes
//! deregistration happen exactly once on every exit path of a session,
//! including early returns and panics.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{ConnectionHandle, ConnectionId};

/// Shared registry of live connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection. Re-adding an existing id replaces the handle.
    pub fn add(&self, handle: ConnectionHandle) {
        let mut map = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.insert(handle.id(), handle);
    }

    /// Removes a connection. Returns `true` if it was a member.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut map = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.remove(&id).is_some()
    }

    /// Returns a point-in-time copy of all registered handles.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        let map = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.values().cloned().collect()
    }

    /// Returns `true` if `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `handle` and returns a guard that removes it when dropped.
    #[must_use = "dropping the registration deregisters the connection immediately"]
    pub fn register(self: &Arc<Self>, handle: ConnectionHandle) -> Registration {
        let id = handle.id();
        self.add(handle);
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }
}

/// Scoped membership of one connection in a [`ConnectionRegistry`].
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Registration {
    /// Returns the registered connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
