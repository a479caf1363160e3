//! Connection registry: connection lifecycle and outbound routing.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use teamlink_core::config::RealtimeConfig;
use teamlink_core::error::AppError;
use teamlink_core::events::ConnectionEvent;
use teamlink_core::traits::auth::Identity;
use teamlink_core::types::{ConnectionId, UserId};

use crate::bus::EventBus;
use crate::message::types::OutboundMessage;
use crate::message::validator::validate_group_name;
use crate::metrics::RealtimeMetrics;
use crate::presence::PresenceTracker;

use super::groups::GroupRegistry;
use super::handle::{ConnectionHandle, ConnectionInfo, SendFailure};
use super::pool::ConnectionPool;

/// Manages all live connections.
///
/// Every removal path (explicit close, failed send, reaper, eviction) goes
/// through one routine, so presence and `Closed` notifications fire exactly
/// once per connection.
///
/// Opens and closes for one user are serialized: the pool change, the
/// presence transition and the connection event are applied under the
/// user's lifecycle lock, so the tracker always sees counts in pool order.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Connection pool.
    pool: ConnectionPool,
    /// Group memberships.
    groups: GroupRegistry,
    /// Per-user lifecycle locks.
    lifecycle: DashMap<UserId, Arc<Mutex<()>>>,
    /// Presence tracker.
    presence: Arc<PresenceTracker>,
    /// Event bus.
    bus: Arc<EventBus>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionRegistry {
    /// Creates a new connection registry.
    pub fn new(
        config: RealtimeConfig,
        presence: Arc<PresenceTracker>,
        bus: Arc<EventBus>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            groups: GroupRegistry::new(),
            lifecycle: DashMap::new(),
            presence,
            bus,
            metrics,
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Returns the connection handle and the receiver the transport drains.
    /// When the user is over the per-user cap, the oldest connection is
    /// evicted after the new one is in place.
    pub fn register(
        &self,
        identity: &Identity,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(
            identity.user_id.clone(),
            identity.username.clone(),
            tx,
        ));

        let live = self.with_lifecycle(&identity.user_id, || {
            let live = self.pool.add(Arc::clone(&handle));
            self.presence.on_connection_opened(&identity.user_id, live);
            self.bus.publish(ConnectionEvent::Opened {
                connection_id: handle.id.clone(),
                user_id: identity.user_id.clone(),
                live_connections: live,
            });
            live
        });
        RealtimeMetrics::inc(&self.metrics.connections_opened);

        info!(
            conn_id = %handle.id,
            user_id = %identity.user_id,
            live,
            "Connection registered"
        );

        let max = self.config.max_connections_per_user.max(1);
        if live > max {
            let existing = self.pool.get_user_connections(&identity.user_id);
            let excess = existing.len().saturating_sub(max);
            for oldest in existing.iter().filter(|c| c.id != handle.id).take(excess) {
                warn!(
                    user_id = %identity.user_id,
                    conn_id = %oldest.id,
                    max,
                    "User at max connections, evicting oldest"
                );
                self.remove_connection(&oldest.id, false);
            }
        }

        (handle, rx)
    }

    /// Unregisters a connection. Returns the user's remaining connection
    /// count, or `None` if it was already removed.
    pub fn unregister(&self, conn_id: &ConnectionId) -> Option<usize> {
        self.remove_connection(conn_id, false)
    }

    /// Removes a connection whose transport failed.
    pub fn mark_failed(&self, conn_id: &ConnectionId) -> Option<usize> {
        self.remove_connection(conn_id, true)
    }

    /// Run `f` holding the user's lifecycle lock.
    ///
    /// Sync bus handlers run inside `f`; they must not open or close
    /// connections of the same user.
    fn with_lifecycle<T>(&self, user_id: &UserId, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.lifecycle.entry(user_id.clone()).or_default().value());
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        if self.pool.user_connection_count(user_id) == 0 {
            self.lifecycle
                .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
        }
        result
    }

    fn remove_connection(&self, conn_id: &ConnectionId, failed: bool) -> Option<usize> {
        let user_id = self.pool.get(conn_id)?.user_id.clone();
        let (handle, remaining) = self.with_lifecycle(&user_id, || {
            let (handle, remaining) = self.pool.remove(conn_id)?;
            handle.mark_dead();
            self.groups.leave_all(conn_id);
            self.presence.on_connection_closed(&handle.user_id, remaining);
            self.bus.publish(ConnectionEvent::Closed {
                connection_id: conn_id.clone(),
                user_id: handle.user_id.clone(),
                remaining,
                failed,
            });
            Some((handle, remaining))
        })?;

        RealtimeMetrics::inc(&self.metrics.connections_closed);
        if failed {
            RealtimeMetrics::inc(&self.metrics.connections_failed);
        }

        if failed {
            warn!(conn_id = %conn_id, user_id = %handle.user_id, remaining, "Connection removed after failure");
        } else {
            info!(conn_id = %conn_id, user_id = %handle.user_id, remaining, "Connection unregistered");
        }
        Some(remaining)
    }

    /// Queue a frame on one handle, removing the connection if it is closed.
    fn deliver(&self, handle: &ConnectionHandle, msg: OutboundMessage) -> bool {
        match handle.send(msg) {
            Ok(()) => {
                RealtimeMetrics::inc(&self.metrics.frames_sent);
                true
            }
            Err(SendFailure::Closed) => {
                self.remove_connection(&handle.id, true);
                false
            }
            Err(SendFailure::Full) => false,
        }
    }

    /// Sends a frame to every live connection of a user.
    ///
    /// Returns how many connections accepted it. Failed connections are
    /// removed; a failure on one connection does not affect the others.
    pub fn send_to_user(&self, user_id: &UserId, msg: &OutboundMessage) -> usize {
        let connections = self.pool.get_user_connections(user_id);
        let mut reached = 0;
        for conn in &connections {
            if self.deliver(conn, msg.clone()) {
                reached += 1;
            }
        }
        debug!(user_id = %user_id, frame = msg.frame_type(), reached, "Sent to user");
        reached
    }

    /// Sends a frame to one connection.
    pub fn send_to_connection(&self, conn_id: &ConnectionId, msg: OutboundMessage) -> bool {
        match self.pool.get(conn_id) {
            Some(handle) => self.deliver(&handle, msg),
            None => false,
        }
    }

    /// Sends a frame to every member of a group.
    pub fn send_to_group(&self, group: &str, msg: &OutboundMessage) -> usize {
        let mut reached = 0;
        for conn_id in self.groups.members(group) {
            if let Some(handle) = self.pool.get(&conn_id)
                && self.deliver(&handle, msg.clone())
            {
                reached += 1;
            }
        }
        debug!(group, frame = msg.frame_type(), reached, "Sent to group");
        reached
    }

    /// Sends a frame to every live connection except the excluded ones.
    pub fn send_to_all(&self, msg: &OutboundMessage, excluded: &[ConnectionId]) -> usize {
        let mut reached = 0;
        for conn in self.pool.all_connections() {
            if excluded.contains(&conn.id) {
                continue;
            }
            if self.deliver(&conn, msg.clone()) {
                reached += 1;
            }
        }
        reached
    }

    /// Adds a connection to a named group.
    pub fn join_group(&self, conn_id: &ConnectionId, group: &str) -> Result<bool, AppError> {
        validate_group_name(group)?;
        if self.pool.get(conn_id).is_none() {
            return Err(AppError::not_found(format!("Connection {conn_id} not found")));
        }
        let current = self.groups.group_count(conn_id);
        if current >= self.config.max_groups_per_connection {
            return Err(AppError::validation(format!(
                "Maximum groups ({}) reached",
                self.config.max_groups_per_connection
            )));
        }
        let added = self.groups.join(group, conn_id);
        debug!(conn_id = %conn_id, group, "Joined group");
        Ok(added)
    }

    /// Removes a connection from a named group.
    pub fn leave_group(&self, conn_id: &ConnectionId, group: &str) -> bool {
        self.groups.leave(group, conn_id)
    }

    /// Removes every connection already marked dead. Returns how many.
    pub fn reap_dead_connections(&self) -> usize {
        let dead: Vec<ConnectionId> = self
            .pool
            .all_connections()
            .into_iter()
            .filter(|c| !c.is_alive())
            .map(|c| c.id.clone())
            .collect();

        let reaped = dead
            .iter()
            .filter(|id| self.remove_connection(id, true).is_some())
            .count();
        if reaped > 0 {
            info!(reaped, "Reaped dead connections");
        }
        reaped
    }

    /// Closes all connections.
    pub fn close_all(&self) -> usize {
        let all = self.pool.all_connections();
        let closed = all
            .iter()
            .filter(|c| self.remove_connection(&c.id, false).is_some())
            .count();
        info!(count = closed, "All connections closed");
        closed
    }

    /// Gets a connection handle.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Snapshot of a connection's metadata.
    pub fn connection_info(&self, conn_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.pool
            .get(conn_id)
            .map(|handle| handle.info(self.groups.groups_of(conn_id)))
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Returns the number of non-empty groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns all connected user IDs.
    pub fn connected_user_ids(&self) -> Vec<UserId> {
        self.pool.connected_user_ids()
    }

    /// Checks if a user has at least one live connection.
    pub fn is_user_connected(&self, user_id: &UserId) -> bool {
        self.pool.user_connection_count(user_id) > 0
    }

    /// Number of live connections for a user.
    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.pool.user_connection_count(user_id)
    }

    /// Realtime configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use teamlink_core::events::{EventKind, EventPayload};
    use teamlink_core::types::PresenceStatus;

    use crate::message::builder::build_ping;

    struct Fixture {
        registry: ConnectionRegistry,
        presence: Arc<PresenceTracker>,
        closed: Arc<Mutex<Vec<(ConnectionId, usize, bool)>>>,
    }

    fn fixture(max_per_user: usize) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let closed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&closed);
        bus.subscribe(EventKind::ConnectionClosed, move |event| {
            if let EventPayload::Connection(ConnectionEvent::Closed {
                connection_id,
                remaining,
                failed,
                ..
            }) = &event.payload
            {
                sink.lock()
                    .unwrap()
                    .push((connection_id.clone(), *remaining, *failed));
            }
            Ok(())
        });

        let presence = Arc::new(PresenceTracker::new(
            Arc::clone(&bus),
            Duration::from_secs(300),
        ));
        let config = RealtimeConfig {
            max_connections_per_user: max_per_user,
            channel_buffer_size: 8,
            ..RealtimeConfig::default()
        };
        let registry = ConnectionRegistry::new(
            config,
            Arc::clone(&presence),
            bus,
            Arc::new(RealtimeMetrics::new()),
        );
        Fixture {
            registry,
            presence,
            closed,
        }
    }

    fn identity(user: &str) -> Identity {
        Identity {
            user_id: UserId::new(user),
            username: user.to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_to_user_reaches_every_connection() {
        let f = fixture(5);
        let (_h1, mut rx1) = f.registry.register(&identity("alice"));
        let (_h2, mut rx2) = f.registry.register(&identity("alice"));

        let reached = f.registry.send_to_user(&UserId::new("alice"), &build_ping());
        assert_eq!(reached, 2);
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
        assert_eq!(f.registry.send_to_user(&UserId::new("nobody"), &build_ping()), 0);
    }

    #[tokio::test]
    async fn test_failed_connection_removed_others_unaffected() {
        let f = fixture(5);
        let (h1, rx1) = f.registry.register(&identity("bob"));
        let (_h2, mut rx2) = f.registry.register(&identity("bob"));
        drop(rx1);

        let reached = f.registry.send_to_user(&UserId::new("bob"), &build_ping());
        assert_eq!(reached, 1);
        assert!(rx2.recv().await.is_some());
        assert!(f.registry.get(&h1.id).is_none());
        assert_eq!(f.registry.user_connection_count(&UserId::new("bob")), 1);

        let closed = f.closed.lock().unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0], (h1.id.clone(), 1, true));
    }

    #[tokio::test]
    async fn test_double_unregister_notifies_once() {
        let f = fixture(5);
        let (h1, _rx) = f.registry.register(&identity("carol"));
        assert_eq!(f.registry.unregister(&h1.id), Some(0));
        assert_eq!(f.registry.unregister(&h1.id), None);
        assert_eq!(f.closed.lock().unwrap().len(), 1);
        assert_eq!(
            f.presence.get_status(&UserId::new("carol")),
            PresenceStatus::Offline
        );
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest_without_going_offline() {
        let f = fixture(1);
        let (first, _rx1) = f.registry.register(&identity("dave"));
        let (second, _rx2) = f.registry.register(&identity("dave"));

        assert!(f.registry.get(&first.id).is_none());
        assert!(f.registry.get(&second.id).is_some());
        assert!(!first.is_alive());
        assert_eq!(
            f.presence.get_status(&UserId::new("dave")),
            PresenceStatus::Online
        );
        assert_eq!(f.closed.lock().unwrap()[0], (first.id.clone(), 1, false));
    }

    #[tokio::test]
    async fn test_groups_and_reaper() {
        let f = fixture(5);
        let (h1, mut rx1) = f.registry.register(&identity("erin"));
        let (h2, _rx2) = f.registry.register(&identity("frank"));

        assert!(f.registry.join_group(&h1.id, "ops").unwrap());
        assert!(f.registry.join_group(&h2.id, "ops").unwrap());
        assert!(f.registry.join_group(&h1.id, "bad name").is_err());
        assert_eq!(f.registry.send_to_group("ops", &build_ping()), 2);
        assert!(rx1.recv().await.is_some());

        h2.mark_dead();
        assert_eq!(f.registry.reap_dead_connections(), 1);
        assert_eq!(f.registry.send_to_group("ops", &build_ping()), 1);
        assert_eq!(
            f.registry.connection_info(&h1.id).unwrap().groups,
            vec!["ops".to_string()]
        );

        assert_eq!(f.registry.close_all(), 1);
        assert_eq!(f.registry.connection_count(), 0);
        assert_eq!(f.registry.group_count(), 0);
    }

    #[test]
    fn test_concurrent_open_and_close_keep_presence_consistent() {
        let f = Arc::new(fixture(5));
        let grace = UserId::new("grace");

        for round in 0..2_000 {
            let (old, _old_rx) = f.registry.register(&identity("grace"));
            for n in 0..20 {
                f.registry
                    .join_group(&old.id, &format!("room-{n}"))
                    .unwrap();
            }

            let barrier = Arc::new(std::sync::Barrier::new(2));
            let closer = {
                let f = Arc::clone(&f);
                let barrier = Arc::clone(&barrier);
                let old_id = old.id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    f.registry.unregister(&old_id);
                })
            };
            let opener = {
                let f = Arc::clone(&f);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    f.registry.register(&identity("grace"))
                })
            };
            closer.join().unwrap();
            let (new, _new_rx) = opener.join().unwrap();

            let record = f.presence.get_presence(&grace);
            assert_eq!(record.live_connections, 1, "round {round}");
            assert_eq!(record.status, PresenceStatus::Online, "round {round}");

            f.registry.unregister(&new.id);
            assert_eq!(f.presence.get_status(&grace), PresenceStatus::Offline);
        }

        // Every close in this test left the user with zero or one connection.
        let closed = f.closed.lock().unwrap();
        assert_eq!(closed.len(), 4_000);
        assert!(closed.iter().all(|(_, remaining, _)| *remaining <= 1));
    }
}
