//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Frames handed to a connection's outbound queue
    pub frames_sent: AtomicU64,
    /// Inbound frames accepted from clients
    pub frames_received: AtomicU64,
    /// Connections ever registered
    pub connections_opened: AtomicU64,
    /// Connections removed (any reason)
    pub connections_closed: AtomicU64,
    /// Connections removed after a transmission failure or missed heartbeat
    pub connections_failed: AtomicU64,
    /// Messages written to the pending store
    pub messages_stored: AtomicU64,
    /// Messages confirmed by ack or receipt
    pub messages_delivered: AtomicU64,
    /// Messages discarded by the expiry sweep
    pub messages_expired: AtomicU64,
    /// Sends dropped because the recipient was offline and queueing was off
    pub messages_dropped: AtomicU64,
    /// Ack waits that timed out
    pub ack_timeouts: AtomicU64,
}

impl RealtimeMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to a counter
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment a counter
    pub fn inc(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_failed: self.connections_failed.load(Ordering::Relaxed),
            messages_stored: self.messages_stored.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_expired: self.messages_expired.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            ack_timeouts: self.ack_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Frames handed to a connection's outbound queue
    pub frames_sent: u64,
    /// Inbound frames accepted from clients
    pub frames_received: u64,
    /// Connections ever registered
    pub connections_opened: u64,
    /// Connections removed
    pub connections_closed: u64,
    /// Connections removed after a failure
    pub connections_failed: u64,
    /// Messages written to the pending store
    pub messages_stored: u64,
    /// Messages confirmed delivered
    pub messages_delivered: u64,
    /// Messages discarded by expiry
    pub messages_expired: u64,
    /// Messages dropped for offline recipients
    pub messages_dropped: u64,
    /// Ack waits that timed out
    pub ack_timeouts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = RealtimeMetrics::new();
        RealtimeMetrics::inc(&metrics.frames_sent);
        RealtimeMetrics::inc(&metrics.frames_sent);
        RealtimeMetrics::add(&metrics.messages_expired, 3);

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.messages_expired, 3);
        assert_eq!(snap.ack_timeouts, 0);
    }
}
