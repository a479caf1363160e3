//! Top-level real-time engine that ties together all subsystems.

use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use teamlink_core::config::{AppConfig, DeliveryConfig, RealtimeConfig};
use teamlink_core::error::AppError;
use teamlink_core::events::{ConnectionEvent, EventKind, EventPayload, PresenceEvent, RealtimeEvent};
use teamlink_core::result::AppResult;
use teamlink_core::traits::auth::Identity;
use teamlink_core::traits::cache::CacheProvider;
use teamlink_core::types::{ConnectionId, MessageId, PresenceStatus, UserId};

use crate::bus::EventBus;
use crate::connection::heartbeat::{HeartbeatConfig, run_heartbeat};
use crate::connection::{ConnectionHandle, ConnectionRegistry};
use crate::delivery::{DeliveryProtocol, SendReceipt, SendRequest};
use crate::message::builder::{build_app_error, build_error, build_presence};
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::{validate_inbound, validate_message};
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::PresenceTracker;
use crate::store::{MessageStore, PendingMirror};
use crate::task::spawn_supervised;

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Live connections.
    pub connections: usize,
    /// Users with at least one live connection.
    pub connected_users: usize,
    /// Users whose status is not Offline.
    pub online_users: usize,
    /// Non-empty groups.
    pub groups: usize,
    /// Messages in the pending store.
    pub pending_messages: usize,
    /// Outstanding ack waits.
    pub pending_acks: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

/// Central real-time engine that coordinates all subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Event bus.
    pub bus: Arc<EventBus>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Pending-message store.
    pub store: Arc<MessageStore>,
    /// Delivery protocol.
    pub delivery: Arc<DeliveryProtocol>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    realtime_config: RealtimeConfig,
    delivery_config: DeliveryConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

/// Push the user's current presence to every live connection.
async fn broadcast_presence(
    registry: Weak<ConnectionRegistry>,
    presence: Weak<PresenceTracker>,
    event: RealtimeEvent,
) -> AppResult<()> {
    let (Some(registry), Some(presence)) = (registry.upgrade(), presence.upgrade()) else {
        return Ok(());
    };
    let user_id = match &event.payload {
        EventPayload::Presence(PresenceEvent::StatusChanged { user_id, .. })
        | EventPayload::Presence(PresenceEvent::AvailabilityChanged { user_id, .. }) => user_id,
        _ => return Ok(()),
    };

    let frame = build_presence(&presence.get_presence(user_id));
    let reached = registry.send_to_all(&frame, &[]);
    debug!(user_id = %user_id, reached, "Presence broadcast");
    Ok(())
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    ///
    /// `side_store` mirrors pending messages when `delivery.persist_pending`
    /// is set.
    pub fn new(config: &AppConfig, side_store: Option<Arc<dyn CacheProvider>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(RealtimeMetrics::new());
        let presence = Arc::new(PresenceTracker::new(
            Arc::clone(&bus),
            config.presence.inactivity_threshold(),
        ));
        let registry = Arc::new(ConnectionRegistry::new(
            config.realtime.clone(),
            Arc::clone(&presence),
            Arc::clone(&bus),
            Arc::clone(&metrics),
        ));

        let mirror = match side_store {
            Some(cache) if config.delivery.persist_pending => Some(PendingMirror::new(cache)),
            _ => None,
        };
        let store = Arc::new(MessageStore::new(
            config.delivery.default_ttl(),
            mirror,
            Arc::clone(&bus),
            Arc::clone(&metrics),
        ));
        let delivery = Arc::new(DeliveryProtocol::new(
            config.delivery.clone(),
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&metrics),
        ));

        // Handlers hold weak references; the bus is owned by the components.
        let (weak_registry, weak_presence) = (Arc::downgrade(&registry), Arc::downgrade(&presence));
        let presence_broadcast =
            move |event| broadcast_presence(weak_registry.clone(), weak_presence.clone(), event);
        bus.subscribe_async(EventKind::StatusChanged, presence_broadcast.clone());
        bus.subscribe_async(EventKind::AvailabilityChanged, presence_broadcast);

        let weak_delivery = Arc::downgrade(&delivery);
        bus.subscribe(EventKind::ConnectionClosed, move |event| {
            if let EventPayload::Connection(ConnectionEvent::Closed {
                user_id,
                remaining: 0,
                ..
            }) = &event.payload
                && let Some(delivery) = weak_delivery.upgrade()
            {
                delivery.forget_recipient(user_id);
            }
            Ok(())
        });

        info!(
            persist_pending = config.delivery.persist_pending,
            max_connections_per_user = config.realtime.max_connections_per_user,
            "Real-time engine initialized"
        );

        Self {
            bus,
            presence,
            registry,
            store,
            delivery,
            metrics,
            realtime_config: config.realtime.clone(),
            delivery_config: config.delivery.clone(),
            shutdown_tx,
        }
    }

    /// Reload pending messages mirrored before a restart.
    pub async fn restore(&self) -> AppResult<usize> {
        self.store.restore().await
    }

    /// Register an authenticated connection and start draining the user's
    /// pending messages.
    ///
    /// The drain runs in the background; the caller must start reading the
    /// connection's inbound frames so acks can arrive.
    pub fn connect(
        &self,
        identity: &Identity,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (handle, rx) = self.registry.register(identity);

        let delivery = Arc::clone(&self.delivery);
        let user_id = identity.user_id.clone();
        spawn_supervised("drain-pending", async move {
            delivery.drain(&user_id).await;
        });

        (handle, rx)
    }

    /// Start the heartbeat loop for a connection.
    pub fn spawn_heartbeat(&self, handle: Arc<ConnectionHandle>) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let config = HeartbeatConfig::from(&self.realtime_config);
        spawn_supervised("heartbeat", run_heartbeat(handle, registry, config))
    }

    /// Unregister a connection.
    pub fn disconnect(&self, conn_id: &ConnectionId) {
        self.registry.unregister(conn_id);
    }

    /// Send a message on behalf of an already-authenticated sender.
    pub async fn send(&self, request: SendRequest) -> AppResult<SendReceipt> {
        self.delivery.send(request).await
    }

    fn reply(&self, conn_id: &ConnectionId, frame: OutboundMessage) {
        self.registry.send_to_connection(conn_id, frame);
    }

    /// Process one inbound frame from a client connection.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.registry.get(conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };

        if let Err(e) = validate_inbound(raw, self.realtime_config.max_frame_bytes) {
            self.reply(conn_id, build_app_error(&e));
            return;
        }
        let msg = match deserialize_inbound(raw) {
            Ok(m) => m,
            Err(e) => {
                self.reply(
                    conn_id,
                    build_error("INVALID_MESSAGE", &format!("Failed to parse frame: {e}")),
                );
                return;
            }
        };

        handle.touch();
        RealtimeMetrics::inc(&self.metrics.frames_received);
        // Heartbeat pongs are automatic and do not count as user activity.
        if !matches!(msg, InboundMessage::Pong { .. }) {
            self.presence.record_activity(&handle.user_id);
        }

        let user_id = handle.user_id.clone();
        match msg {
            InboundMessage::Message {
                id,
                to,
                content,
                message_type,
                requires_ack,
                correlation_id,
                reply_to,
                queue_if_offline,
            } => {
                if let Err(e) = validate_message(user_id.as_str(), &to, &content) {
                    self.reply(conn_id, build_app_error(&e));
                    return;
                }
                let mut request = SendRequest::new(user_id, UserId::new(to), content)
                    .with_type(message_type)
                    .requires_ack(requires_ack)
                    .queue_if_offline(
                        queue_if_offline.unwrap_or(self.delivery_config.queue_if_offline_default),
                    );
                request.id = id;
                request.reply_to = reply_to;
                self.spawn_send(conn_id.clone(), request, correlation_id);
            }
            InboundMessage::Ack { correlation_id, .. } => {
                if self.delivery.handle_ack(&user_id, &correlation_id).is_none() {
                    debug!(conn_id = %conn_id, correlation_id, "Late or unknown ack");
                }
            }
            InboundMessage::Receipt { id, status } => {
                if let Err(e) = self.delivery.handle_receipt(&user_id, &id, status).await {
                    self.reply(conn_id, build_app_error(&e));
                }
            }
            InboundMessage::Pong { .. } => handle.record_pong(),
            InboundMessage::Presence { status, message } => match PresenceStatus::parse(&status) {
                Some(status) => {
                    self.presence.update_status(&user_id, status, message);
                }
                None => self.reply(
                    conn_id,
                    build_app_error(&AppError::validation(format!(
                        "Unknown presence status '{status}'"
                    ))),
                ),
            },
            InboundMessage::Availability { is_available } => {
                self.presence.set_availability_for_chat(&user_id, is_available);
            }
            InboundMessage::Activity => {}
            InboundMessage::JoinGroup { group } => match self.registry.join_group(conn_id, &group) {
                Ok(_) => self.reply(conn_id, OutboundMessage::Joined { group }),
                Err(e) => self.reply(conn_id, build_app_error(&e)),
            },
            InboundMessage::LeaveGroup { group } => {
                self.registry.leave_group(conn_id, &group);
                self.reply(conn_id, OutboundMessage::Left { group });
            }
        }
    }

    /// Run a client send in the background and report its outcome to the
    /// sending connection, so ack waits never block that connection's reads.
    fn spawn_send(
        &self,
        conn_id: ConnectionId,
        request: SendRequest,
        correlation_id: Option<String>,
    ) {
        let delivery = Arc::clone(&self.delivery);
        let registry = Arc::clone(&self.registry);
        spawn_supervised("client-send", async move {
            let frame = match delivery.send(request).await {
                Ok(receipt) => OutboundMessage::Accepted {
                    id: receipt.message_id,
                    correlation_id,
                    outcome: receipt.outcome.as_str().to_string(),
                    reached: receipt.reached,
                },
                Err(e) => build_app_error(&e),
            };
            registry.send_to_connection(&conn_id, frame);
        });
    }

    /// Look up whether a message is still pending.
    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.store.get(id).is_some()
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connections: self.registry.connection_count(),
            connected_users: self.registry.user_count(),
            online_users: self.presence.online_count(),
            groups: self.registry.group_count(),
            pending_messages: self.store.pending_count(),
            pending_acks: self.delivery.pending_acks(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        // Receivers may all be gone already.
        let _ = self.shutdown_tx.send(());
        let closed = self.registry.close_all();

        info!(closed, "Real-time engine shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine() -> RealtimeEngine {
        RealtimeEngine::new(&AppConfig::default(), None)
    }

    fn identity(user: &str) -> Identity {
        Identity {
            user_id: UserId::new(user),
            username: user.to_string(),
        }
    }

    async fn next_of_type(
        rx: &mut mpsc::Receiver<OutboundMessage>,
        frame_type: &str,
    ) -> OutboundMessage {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let frame = rx.recv().await.expect("connection closed");
                if frame.frame_type() == frame_type {
                    return frame;
                }
            }
        })
        .await
        .expect("frame did not arrive")
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error() {
        let engine = engine();
        let (handle, mut rx) = engine.connect(&identity("alice"));

        engine.handle_inbound(&handle.id, "{not json").await;
        match next_of_type(&mut rx, "error").await {
            OutboundMessage::Error { code, .. } => assert_eq!(code, "INVALID_MESSAGE"),
            other => panic!("unexpected frame: {other:?}"),
        }

        engine
            .handle_inbound(&handle.id, r#"{"type":"presence","status":"sleepy"}"#)
            .await;
        match next_of_type(&mut rx, "error").await {
            OutboundMessage::Error { code, .. } => assert_eq!(code, "VALIDATION"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_message_frame_round_trip_between_clients() {
        let engine = engine();
        let (alice, mut alice_rx) = engine.connect(&identity("alice"));
        let (bob, mut bob_rx) = engine.connect(&identity("bob"));

        engine
            .handle_inbound(
                &alice.id,
                r#"{"type":"message","to":"bob","content":"hi","requiresAck":true,"correlationId":"c-1"}"#,
            )
            .await;

        let envelope = match next_of_type(&mut bob_rx, "message").await {
            OutboundMessage::Message(envelope) => envelope,
            other => panic!("unexpected frame: {other:?}"),
        };
        assert_eq!(envelope.from, UserId::new("alice"));

        let ack = format!(r#"{{"type":"ack","correlationId":"{}"}}"#, envelope.correlation_id);
        engine.handle_inbound(&bob.id, &ack).await;

        match next_of_type(&mut alice_rx, "accepted").await {
            OutboundMessage::Accepted {
                id,
                correlation_id,
                outcome,
                ..
            } => {
                assert_eq!(id, envelope.id);
                assert_eq!(correlation_id.as_deref(), Some("c-1"));
                assert_eq!(outcome, "delivered");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(!engine.is_pending(&envelope.id));
    }

    #[tokio::test]
    async fn test_status_change_is_broadcast() {
        let engine = engine();
        let (alice, _alice_rx) = engine.connect(&identity("alice"));
        let (_bob, mut bob_rx) = engine.connect(&identity("bob"));

        engine
            .handle_inbound(&alice.id, r#"{"type":"presence","status":"Busy","message":"call"}"#)
            .await;

        let frame = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let OutboundMessage::Presence {
                    user_id, status, ..
                } = bob_rx.recv().await.expect("connection closed")
                    && user_id == UserId::new("alice")
                    && status == PresenceStatus::Busy
                {
                    return status;
                }
            }
        })
        .await
        .expect("presence frame did not arrive");
        assert_eq!(frame, PresenceStatus::Busy);
    }

    #[tokio::test]
    async fn test_groups_via_frames_and_stats() {
        let engine = engine();
        let (alice, mut alice_rx) = engine.connect(&identity("alice"));

        engine
            .handle_inbound(&alice.id, r#"{"type":"join_group","group":"ops"}"#)
            .await;
        assert!(matches!(
            next_of_type(&mut alice_rx, "joined").await,
            OutboundMessage::Joined { .. }
        ));

        let stats = engine.stats();
        assert_eq!(stats.connections, 1);
        assert_eq!(stats.groups, 1);
        assert_eq!(stats.online_users, 1);

        engine.shutdown().await.unwrap();
        assert_eq!(engine.stats().connections, 0);
    }
}
