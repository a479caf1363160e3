//! In-memory pending-message store keyed by message ID, indexed by recipient.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use teamlink_core::error::AppError;
use teamlink_core::events::DeliveryEvent;
use teamlink_core::result::AppResult;
use teamlink_core::types::{MessageId, UserId};

use super::pending::PendingMessage;
use super::persistence::PendingMirror;
use crate::bus::EventBus;
use crate::metrics::RealtimeMetrics;

/// Holds messages not yet acknowledged by their recipient.
///
/// Storing an existing ID overwrites it. Removing a missing ID succeeds.
/// Expired messages are never returned and are discarded by the sweep.
#[derive(Debug)]
pub struct MessageStore {
    /// Message ID → message.
    messages: DashMap<MessageId, PendingMessage>,
    /// Recipient → message IDs.
    by_recipient: DashMap<UserId, HashSet<MessageId>>,
    /// Tiebreaker for messages sharing a timestamp.
    sequence: AtomicU64,
    /// TTL used when the caller gives none.
    default_ttl: Duration,
    /// Optional restart-survival mirror.
    mirror: Option<PendingMirror>,
    /// Event bus.
    bus: Arc<EventBus>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
}

fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl MessageStore {
    /// Create a store.
    pub fn new(
        default_ttl: Duration,
        mirror: Option<PendingMirror>,
        bus: Arc<EventBus>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            messages: DashMap::new(),
            by_recipient: DashMap::new(),
            sequence: AtomicU64::new(1),
            default_ttl,
            mirror,
            bus,
            metrics,
        }
    }

    /// Store (or overwrite) a pending message.
    ///
    /// Assigns an ID when blank and sets the expiry to now + `ttl` (or the
    /// default TTL). A TTL of zero stores an already-expired message.
    pub async fn store_message(
        &self,
        mut message: PendingMessage,
        ttl: Option<Duration>,
    ) -> AppResult<MessageId> {
        if message.sender.is_blank() {
            return Err(AppError::validation("Sender is required"));
        }
        if message.recipient.is_blank() {
            return Err(AppError::validation("Recipient is required"));
        }
        if message.id.is_blank() {
            message.id = MessageId::generate();
        }

        message.expires_at = expiry_from(Utc::now(), ttl.unwrap_or(self.default_ttl));
        let id = message.id.clone();
        let recipient = message.recipient.clone();

        let previous = {
            let mut slot = self.messages.entry(id.clone()).or_insert_with(|| {
                let mut fresh = message.clone();
                fresh.sequence = 0;
                fresh
            });
            // Overwrites keep the original position in the recipient's order.
            if slot.sequence == 0 {
                message.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            } else {
                message.sequence = slot.sequence;
                message.created_at = slot.created_at;
            }
            std::mem::replace(slot.value_mut(), message.clone())
        };

        if previous.sequence != 0 && previous.recipient != recipient {
            self.unindex(&previous.recipient, &id);
        }
        self.by_recipient
            .entry(recipient.clone())
            .or_default()
            .insert(id.clone());

        if let Some(mirror) = &self.mirror {
            mirror.save(&message).await;
        }

        RealtimeMetrics::inc(&self.metrics.messages_stored);
        self.bus.publish(DeliveryEvent::Stored {
            message_id: id.clone(),
            recipient: recipient.clone(),
        });
        debug!(message_id = %id, recipient = %recipient, expires_at = %message.expires_at, "Message stored");
        Ok(id)
    }

    /// Remove a message once delivery is confirmed.
    ///
    /// Returns the removed message, or `None` when it was not pending.
    pub async fn mark_as_delivered(&self, id: &MessageId) -> AppResult<Option<PendingMessage>> {
        if id.is_blank() {
            return Err(AppError::validation("Message ID is required"));
        }

        let Some((_, removed)) = self.messages.remove(id) else {
            debug!(message_id = %id, "Delivered message was not pending");
            return Ok(None);
        };
        self.unindex(&removed.recipient, id);

        if let Some(mirror) = &self.mirror {
            mirror.remove(id).await;
        }

        RealtimeMetrics::inc(&self.metrics.messages_delivered);
        self.bus.publish(DeliveryEvent::Delivered {
            message_id: id.clone(),
            recipient: removed.recipient.clone(),
        });
        debug!(message_id = %id, "Pending message delivered");
        Ok(Some(removed))
    }

    fn unindex(&self, recipient: &UserId, id: &MessageId) {
        if let Some(mut ids) = self.by_recipient.get_mut(recipient) {
            ids.remove(id);
        }
        self.by_recipient.remove_if(recipient, |_, ids| ids.is_empty());
    }

    /// Unexpired pending messages for a recipient, oldest first.
    pub fn get_pending_messages_for_user(&self, user_id: &UserId) -> Vec<PendingMessage> {
        let ids: Vec<MessageId> = match self.by_recipient.get(user_id) {
            Some(ids) => ids.iter().cloned().collect(),
            None => return Vec::new(),
        };

        let now = Utc::now();
        let mut pending: Vec<PendingMessage> = ids
            .iter()
            .filter_map(|id| self.messages.get(id).map(|m| m.value().clone()))
            .filter(|m| m.recipient == *user_id && !m.is_expired_at(now))
            .collect();
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        pending
    }

    /// Discard every message whose expiry has passed. Returns how many.
    pub async fn cleanup_expired_messages(&self) -> usize {
        let now = Utc::now();
        let candidates: Vec<MessageId> = self
            .messages
            .iter()
            .filter(|m| m.is_expired_at(now))
            .map(|m| m.key().clone())
            .collect();

        let mut removed = Vec::new();
        for id in candidates {
            // A concurrent overwrite may have extended the expiry.
            if let Some((_, message)) = self.messages.remove_if(&id, |_, m| m.is_expired_at(now)) {
                self.unindex(&message.recipient, &id);
                removed.push(id);
            }
        }

        // Drop index entries whose message is gone.
        self.by_recipient
            .retain(|_, ids| {
                ids.retain(|id| self.messages.contains_key(id));
                !ids.is_empty()
            });

        if let Some(mirror) = &self.mirror {
            for id in &removed {
                mirror.remove(id).await;
            }
        }

        let count = removed.len();
        if count > 0 {
            RealtimeMetrics::add(&self.metrics.messages_expired, count as u64);
            self.bus.publish(DeliveryEvent::Expired { count });
            info!(count, "Expired pending messages removed");
        }
        count
    }

    /// Reload mirrored messages after a restart. Returns how many.
    pub async fn restore(&self) -> AppResult<usize> {
        let Some(mirror) = &self.mirror else {
            return Ok(0);
        };

        let now = Utc::now();
        let mut loaded = mirror.load_all().await?;
        loaded.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.sequence.cmp(&b.sequence))
        });

        let mut restored = 0;
        for mut message in loaded {
            if message.is_expired_at(now) || message.id.is_blank() || message.recipient.is_blank() {
                mirror.remove(&message.id).await;
                continue;
            }
            if self.messages.contains_key(&message.id) {
                continue;
            }
            message.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            self.by_recipient
                .entry(message.recipient.clone())
                .or_default()
                .insert(message.id.clone());
            self.messages.insert(message.id.clone(), message);
            restored += 1;
        }

        info!(restored, "Pending messages restored from side store");
        Ok(restored)
    }

    /// Look up a pending message.
    pub fn get(&self, id: &MessageId) -> Option<PendingMessage> {
        self.messages.get(id).map(|m| m.value().clone())
    }

    /// Total pending messages (including expired ones not yet swept).
    pub fn pending_count(&self) -> usize {
        self.messages.len()
    }

    /// Recipients with at least one pending message.
    pub fn recipient_count(&self) -> usize {
        self.by_recipient.len()
    }
}
