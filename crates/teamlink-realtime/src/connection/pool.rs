//! Connection pool: tracks all live connections indexed by user ID.

use std::sync::Arc;

use dashmap::DashMap;

use teamlink_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all live connections.
#[derive(Debug)]
pub struct ConnectionPool {
    /// User ID → connection handles, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self {
            by_user: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    /// Adds a connection. Returns the user's live connection count.
    pub fn add(&self, handle: Arc<ConnectionHandle>) -> usize {
        self.by_id.insert(handle.id.clone(), Arc::clone(&handle));
        let mut connections = self.by_user.entry(handle.user_id.clone()).or_default();
        connections.push(handle);
        connections.len()
    }

    /// Removes a connection.
    ///
    /// Returns the handle and the user's remaining connection count, or
    /// `None` if another caller already removed it.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<(Arc<ConnectionHandle>, usize)> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        let remaining = match self.by_user.get_mut(&handle.user_id) {
            Some(mut connections) => {
                connections.retain(|c| c.id != *conn_id);
                connections.len()
            }
            None => 0,
        };
        if remaining == 0 {
            // A concurrent add may have refilled the list; only drop it empty.
            self.by_user.remove_if(&handle.user_id, |_, v| v.is_empty());
        }
        Some((handle, remaining))
    }

    /// Gets all connections for a user (snapshot).
    pub fn get_user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of live connections for a user.
    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.by_user.get(user_id).map_or(0, |entry| entry.len())
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connection handles (snapshot).
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Returns all connected user IDs.
    pub fn connected_user_ids(&self) -> Vec<UserId> {
        self.by_user.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}
