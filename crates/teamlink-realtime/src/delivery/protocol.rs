//! Delivery protocol: transmit, await ack, fall back to the pending store.
//!
//! A message is, at any instant, in exactly one of: in flight (transmitted,
//! awaiting ack), stored pending, or delivered. Transmissions to one
//! recipient are serialized so drained messages keep their stored order.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use teamlink_core::config::DeliveryConfig;
use teamlink_core::error::AppError;
use teamlink_core::events::{ConnectionEvent, DeliveryEvent, EventKind, EventPayload};
use teamlink_core::result::AppResult;
use teamlink_core::types::{DeliveryStatus, MessageId, UserId};

use super::ack::{AckOutcome, AckTracker};
use super::request::{SendOutcome, SendReceipt, SendRequest, Target};
use crate::bus::EventBus;
use crate::connection::ConnectionRegistry;
use crate::message::builder::build_receipt;
use crate::message::envelope::DeliveryEnvelope;
use crate::message::validator::{validate_group_name, validate_message};
use crate::metrics::RealtimeMetrics;
use crate::store::{MessageStore, PendingMessage};

/// Upper bound on remembered message routes.
const ROUTE_CAPACITY: u64 = 100_000;

/// Sender and recipient of a message that was transmitted to its recipient.
#[derive(Debug, Clone)]
struct MessageRoute {
    sender: UserId,
    recipient: UserId,
}

/// Result of draining a user's pending messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Messages transmitted.
    pub attempted: usize,
    /// Messages acknowledged and removed from the store.
    pub delivered: usize,
}

/// Ack-based message delivery with store-and-forward fallback.
#[derive(Debug)]
pub struct DeliveryProtocol {
    registry: Arc<ConnectionRegistry>,
    store: Arc<MessageStore>,
    acks: Arc<AckTracker>,
    bus: Arc<EventBus>,
    metrics: Arc<RealtimeMetrics>,
    config: DeliveryConfig,
    /// Serializes transmissions per recipient.
    recipient_locks: DashMap<UserId, Arc<Mutex<()>>>,
    /// Stored messages currently transmitted and awaiting ack.
    in_flight: DashMap<MessageId, ()>,
    /// Routes of transmitted messages, so receipts can be checked and
    /// forwarded after the message left the pending store.
    routes: Cache<MessageId, MessageRoute>,
}

impl DeliveryProtocol {
    /// Create the protocol and subscribe it to connection closures, so
    /// ack waits end as soon as a recipient's last connection closes.
    pub fn new(
        config: DeliveryConfig,
        registry: Arc<ConnectionRegistry>,
        store: Arc<MessageStore>,
        bus: Arc<EventBus>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        let acks = Arc::new(AckTracker::new());
        let watcher = Arc::clone(&acks);
        bus.subscribe(EventKind::ConnectionClosed, move |event| {
            if let EventPayload::Connection(ConnectionEvent::Closed {
                user_id,
                remaining: 0,
                ..
            }) = &event.payload
            {
                watcher.cancel_for_user(user_id);
            }
            Ok(())
        });

        let routes = Cache::builder()
            .max_capacity(ROUTE_CAPACITY)
            .time_to_live(config.default_ttl())
            .build();

        Self {
            registry,
            store,
            acks,
            bus,
            metrics,
            config,
            recipient_locks: DashMap::new(),
            in_flight: DashMap::new(),
            routes,
        }
    }

    async fn remember_route(&self, message: &PendingMessage) {
        self.routes
            .insert(
                message.id.clone(),
                MessageRoute {
                    sender: message.sender.clone(),
                    recipient: message.recipient.clone(),
                },
            )
            .await;
    }

    fn recipient_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        Arc::clone(self.recipient_locks.entry(user_id.clone()).or_default().value())
    }

    /// Send a message.
    ///
    /// Validation failures are returned as errors. Transport failures never
    /// are: an unreachable or unresponsive recipient yields `StoredPending`
    /// (or `Dropped` when queueing was not requested).
    pub async fn send(&self, request: SendRequest) -> AppResult<SendReceipt> {
        validate_message(request.from.as_str(), request.to.as_str(), &request.content)?;
        if request.from.is_broadcast() {
            return Err(AppError::validation("Sender cannot be the broadcast address"));
        }

        match request.target() {
            Target::Broadcast => Ok(self.fan_out(&request, None)),
            Target::Group(group) => {
                validate_group_name(&group)?;
                Ok(self.fan_out(&request, Some(&group)))
            }
            Target::User(recipient) => self.send_to_user(&request, recipient).await,
        }
    }

    /// Fire-and-forget fan-out; never stored, never acked.
    fn fan_out(&self, request: &SendRequest, group: Option<&str>) -> SendReceipt {
        let message = request.to_pending();
        let frame = DeliveryEnvelope::for_message(&message, false).into_frame();
        let reached = match group {
            Some(group) => self.registry.send_to_group(group, &frame),
            None => self.registry.send_to_all(&frame, &[]),
        };
        debug!(message_id = %message.id, group, reached, "Fan-out sent");

        SendReceipt {
            message_id: message.id,
            outcome: if reached > 0 {
                SendOutcome::Transmitted
            } else {
                SendOutcome::Dropped
            },
            reached,
        }
    }

    async fn send_to_user(&self, request: &SendRequest, recipient: UserId) -> AppResult<SendReceipt> {
        let message = request.to_pending();

        if !self.registry.is_user_connected(&recipient) {
            debug!(message_id = %message.id, recipient = %recipient, "Recipient offline");
            return self.fall_back(message, request, 0).await;
        }

        let envelope = DeliveryEnvelope::for_message(&message, request.requires_ack);
        let correlation_id = envelope.correlation_id.clone();
        self.remember_route(&message).await;
        // Registered before transmission so a fast ack cannot be missed.
        let ack_rx = request
            .requires_ack
            .then(|| self.acks.register(&correlation_id, &recipient, &message.id));

        let reached = {
            let lock = self.recipient_lock(&recipient);
            let _guard = lock.lock().await;
            self.registry.send_to_user(&recipient, &envelope.into_frame())
        };

        if reached == 0 {
            self.acks.forget(&correlation_id);
            debug!(message_id = %message.id, recipient = %recipient, "Transmission reached no connection");
            return self.fall_back(message, request, 0).await;
        }

        let Some(rx) = ack_rx else {
            return Ok(SendReceipt {
                message_id: message.id,
                outcome: SendOutcome::Transmitted,
                reached,
            });
        };

        match self
            .acks
            .wait(&correlation_id, rx, self.config.ack_timeout())
            .await
        {
            AckOutcome::Acknowledged => {
                RealtimeMetrics::inc(&self.metrics.messages_delivered);
                self.bus.publish(DeliveryEvent::Delivered {
                    message_id: message.id.clone(),
                    recipient,
                });
                Ok(SendReceipt {
                    message_id: message.id,
                    outcome: SendOutcome::Delivered,
                    reached,
                })
            }
            AckOutcome::TimedOut => {
                RealtimeMetrics::inc(&self.metrics.ack_timeouts);
                warn!(message_id = %message.id, recipient = %recipient, "Ack timed out");
                self.bus.publish(DeliveryEvent::AckTimedOut {
                    message_id: message.id.clone(),
                    recipient,
                });
                self.fall_back(message, request, reached).await
            }
            AckOutcome::Cancelled => {
                debug!(message_id = %message.id, recipient = %recipient, "Recipient disconnected before ack");
                self.fall_back(message, request, reached).await
            }
        }
    }

    async fn fall_back(
        &self,
        message: PendingMessage,
        request: &SendRequest,
        reached: usize,
    ) -> AppResult<SendReceipt> {
        if !request.queue_if_offline {
            let outcome = if reached > 0 {
                SendOutcome::Transmitted
            } else {
                RealtimeMetrics::inc(&self.metrics.messages_dropped);
                SendOutcome::Dropped
            };
            return Ok(SendReceipt {
                message_id: message.id,
                outcome,
                reached,
            });
        }

        let ttl = request.ttl.unwrap_or_else(|| self.config.default_ttl());
        let message_id = self.store.store_message(message, Some(ttl)).await?;
        Ok(SendReceipt {
            message_id,
            outcome: SendOutcome::StoredPending,
            reached,
        })
    }

    /// Transmit a user's pending messages in stored order and remove each
    /// one its recipient acknowledges.
    ///
    /// Drained frames always require an ack. Messages left unacknowledged
    /// while the user still holds a connection are transmitted again, so a
    /// device that connected during the wait is not starved. Messages still
    /// unacknowledged once the user is gone stay pending for the next
    /// connection.
    pub async fn drain(&self, user_id: &UserId) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let (pass, unacknowledged) = self.drain_pass(user_id).await;
            report.attempted += pass.attempted;
            report.delivered += pass.delivered;

            if unacknowledged == 0 || !self.registry.is_user_connected(user_id) {
                break;
            }
            debug!(user_id = %user_id, unacknowledged, "Retransmitting unacknowledged messages");
        }

        if report.attempted > 0 {
            info!(
                user_id = %user_id,
                attempted = report.attempted,
                delivered = report.delivered,
                "Pending messages drained"
            );
        }
        report
    }

    /// One transmission of every pending message not already in flight.
    /// Returns the report and how many transmitted messages went unacknowledged.
    async fn drain_pass(&self, user_id: &UserId) -> (DrainReport, usize) {
        let mut waits = Vec::new();
        {
            let lock = self.recipient_lock(user_id);
            let _guard = lock.lock().await;
            for message in self.store.get_pending_messages_for_user(user_id) {
                if self.in_flight.insert(message.id.clone(), ()).is_some() {
                    continue;
                }
                let envelope = DeliveryEnvelope::for_message(&message, true);
                let correlation_id = envelope.correlation_id.clone();
                let rx = self.acks.register(&correlation_id, user_id, &message.id);
                self.remember_route(&message).await;

                if self.registry.send_to_user(user_id, &envelope.into_frame()) == 0 {
                    self.acks.forget(&correlation_id);
                    self.in_flight.remove(&message.id);
                    break;
                }
                waits.push((message.id, correlation_id, rx));
            }
        }

        let attempted = waits.len();
        if attempted == 0 {
            return (DrainReport::default(), 0);
        }

        let timeout = self.config.ack_timeout();
        let acks = &self.acks;
        let outcomes = join_all(waits.into_iter().map(|(id, correlation_id, rx)| async move {
            let outcome = acks.wait(&correlation_id, rx, timeout).await;
            (id, outcome)
        }))
        .await;

        let mut delivered = 0;
        let mut unacknowledged = 0;
        for (id, outcome) in outcomes {
            match outcome {
                AckOutcome::Acknowledged => match self.store.mark_as_delivered(&id).await {
                    Ok(Some(_)) => delivered += 1,
                    Ok(None) => debug!(message_id = %id, "Drained message already removed"),
                    Err(e) => warn!(message_id = %id, error = %e, "Failed to remove drained message"),
                },
                AckOutcome::TimedOut => {
                    unacknowledged += 1;
                    RealtimeMetrics::inc(&self.metrics.ack_timeouts);
                    self.bus.publish(DeliveryEvent::AckTimedOut {
                        message_id: id.clone(),
                        recipient: user_id.clone(),
                    });
                }
                AckOutcome::Cancelled => unacknowledged += 1,
            }
            self.in_flight.remove(&id);
        }

        (
            DrainReport {
                attempted,
                delivered,
            },
            unacknowledged,
        )
    }

    /// Resolve an `ack` frame from a recipient.
    pub fn handle_ack(&self, from: &UserId, correlation_id: &str) -> Option<MessageId> {
        self.acks.acknowledge(correlation_id, from)
    }

    /// Apply a Delivered/Read receipt and forward it to the original sender.
    ///
    /// Only the message's recipient may report on it, and only for a message
    /// that is pending or was transmitted to them. A confirming receipt
    /// removes the message from the pending store. Returns whether the
    /// receipt was forwarded.
    pub async fn handle_receipt(
        &self,
        from: &UserId,
        message_id: &MessageId,
        status: DeliveryStatus,
    ) -> AppResult<bool> {
        if message_id.is_blank() {
            return Err(AppError::validation("Message ID is required"));
        }

        let route = match self.store.get(message_id) {
            Some(pending) => Some(MessageRoute {
                sender: pending.sender,
                recipient: pending.recipient,
            }),
            None => self.routes.get(message_id).await,
        };
        let Some(route) = route else {
            debug!(message_id = %message_id, from = %from, "Receipt for an unknown message");
            return Ok(false);
        };
        if route.recipient != *from {
            warn!(message_id = %message_id, from = %from, "Receipt from a user who is not the recipient");
            return Ok(false);
        }

        if status.confirms_delivery() {
            self.store.mark_as_delivered(message_id).await?;
        }

        self.bus.publish(DeliveryEvent::ReceiptReceived {
            message_id: message_id.clone(),
            from: from.clone(),
            status,
        });

        if route.sender == *from || route.sender.is_blank() {
            return Ok(false);
        }
        let frame = build_receipt(message_id.clone(), from.clone(), status);
        Ok(self.registry.send_to_user(&route.sender, &frame) > 0)
    }

    /// Drop per-recipient bookkeeping for a user with no connections left.
    pub fn forget_recipient(&self, user_id: &UserId) {
        self.recipient_locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Outstanding ack waits.
    pub fn pending_acks(&self) -> usize {
        self.acks.pending_count()
    }

    /// The pending store.
    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }
}
