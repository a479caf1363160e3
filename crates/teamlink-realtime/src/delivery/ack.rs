//! Outstanding acknowledgement waits keyed by correlation ID.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use teamlink_core::types::{MessageId, UserId};

/// How an ack wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The recipient acknowledged the frame.
    Acknowledged,
    /// No ack arrived within the timeout.
    TimedOut,
    /// The recipient disconnected before acknowledging.
    Cancelled,
}

#[derive(Debug)]
struct Waiter {
    recipient: UserId,
    message_id: MessageId,
    tx: oneshot::Sender<AckOutcome>,
}

/// Tracks frames awaiting an `ack` from their recipient.
#[derive(Debug, Default)]
pub struct AckTracker {
    waiters: DashMap<String, Waiter>,
}

impl AckTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wait before the frame is transmitted.
    pub fn register(
        &self,
        correlation_id: &str,
        recipient: &UserId,
        message_id: &MessageId,
    ) -> oneshot::Receiver<AckOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(
            correlation_id.to_string(),
            Waiter {
                recipient: recipient.clone(),
                message_id: message_id.clone(),
                tx,
            },
        );
        rx
    }

    /// Resolve a wait. Only the recipient the frame was sent to may ack it.
    ///
    /// Returns the acknowledged message ID, or `None` for an unknown,
    /// already-resolved, or foreign correlation ID.
    pub fn acknowledge(&self, correlation_id: &str, from: &UserId) -> Option<MessageId> {
        let Some((_, waiter)) = self
            .waiters
            .remove_if(correlation_id, |_, w| w.recipient == *from)
        else {
            debug!(correlation_id, from = %from, "Ack matched no outstanding frame");
            return None;
        };
        // The waiting side may already have given up.
        let _ = waiter.tx.send(AckOutcome::Acknowledged);
        Some(waiter.message_id)
    }

    /// Cancel every wait addressed to a user. Returns how many.
    pub fn cancel_for_user(&self, user_id: &UserId) -> usize {
        let keys: Vec<String> = self
            .waiters
            .iter()
            .filter(|w| w.recipient == *user_id)
            .map(|w| w.key().clone())
            .collect();

        let mut cancelled = 0;
        for key in keys {
            if let Some((_, waiter)) = self.waiters.remove(&key) {
                let _ = waiter.tx.send(AckOutcome::Cancelled);
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(user_id = %user_id, cancelled, "Cancelled ack waits");
        }
        cancelled
    }

    /// Drop a wait without resolving it.
    pub fn forget(&self, correlation_id: &str) {
        self.waiters.remove(correlation_id);
    }

    /// Wait for a registered frame to be acknowledged.
    pub async fn wait(
        &self,
        correlation_id: &str,
        rx: oneshot::Receiver<AckOutcome>,
        timeout: Duration,
    ) -> AckOutcome {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => AckOutcome::Cancelled,
            Err(_) => {
                self.forget(correlation_id);
                AckOutcome::TimedOut
            }
        }
    }

    /// Number of outstanding waits.
    pub fn pending_count(&self) -> usize {
        self.waiters.len()
    }
}
