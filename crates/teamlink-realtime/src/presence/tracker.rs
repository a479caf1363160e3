//! Presence tracker: manages user online/away/offline state.
//!
//! State machine per user:
//! - Offline → Online when a first connection registers
//! - Online → Away after the inactivity threshold (sweep)
//! - Away → Online on activity
//! - Online/Away → Busy/DoNotDisturb on explicit set (sticky)
//! - any → Offline when the last connection closes
//!
//! Events are published after every map guard is released.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use teamlink_core::events::PresenceEvent;
use teamlink_core::types::{PresenceStatus, UserId};

use super::record::PresenceRecord;
use crate::bus::EventBus;

/// Tracks presence state for all users.
#[derive(Debug)]
pub struct PresenceTracker {
    /// User ID → presence record
    records: DashMap<UserId, PresenceRecord>,
    /// Event bus for status notifications
    bus: Arc<EventBus>,
    /// Inactivity before Online becomes Away
    inactivity_threshold: chrono::Duration,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new(bus: Arc<EventBus>, inactivity_threshold: Duration) -> Self {
        Self {
            records: DashMap::new(),
            bus,
            inactivity_threshold: chrono::Duration::from_std(inactivity_threshold)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
        }
    }

    /// Record user activity.
    ///
    /// Refreshes the activity timestamp and publishes an activity ping. An
    /// Away user returns to Online. Returns whether the status changed.
    pub fn record_activity(&self, user_id: &UserId) -> bool {
        let now = Utc::now();
        let transition = {
            let mut record = self
                .records
                .entry(user_id.clone())
                .or_insert_with(|| PresenceRecord::offline(user_id.clone()));
            record.last_activity = Some(now);
            if record.status == PresenceStatus::Away {
                record.status = PresenceStatus::Online;
                Some(record.status_message.clone())
            } else {
                None
            }
        };

        self.bus.publish(PresenceEvent::ActivityPing {
            user_id: user_id.clone(),
        });

        match transition {
            Some(message) => {
                debug!(user_id = %user_id, "User returned from away");
                self.bus.publish(PresenceEvent::StatusChanged {
                    user_id: user_id.clone(),
                    old_status: PresenceStatus::Away,
                    new_status: PresenceStatus::Online,
                    message,
                });
                true
            }
            None => false,
        }
    }

    /// Explicitly set a user's status and status message.
    ///
    /// Always publishes a status change, even when the status is unchanged.
    /// A user with live connections cannot be set Offline, and a user without
    /// live connections stays Offline; in both cases only the message is
    /// recorded.
    pub fn update_status(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        message: Option<String>,
    ) -> PresenceRecord {
        let (old_status, snapshot) = {
            let mut record = self
                .records
                .entry(user_id.clone())
                .or_insert_with(|| PresenceRecord::offline(user_id.clone()));
            let old_status = record.status;

            if status == PresenceStatus::Offline && record.is_connected() {
                warn!(
                    user_id = %user_id,
                    live = record.live_connections,
                    "Ignoring explicit offline while connections are live"
                );
            } else if status != PresenceStatus::Offline && !record.is_connected() {
                debug!(user_id = %user_id, requested = %status, "User not connected; status stays offline");
            } else {
                record.status = status;
            }
            record.status_message = message;
            record.last_activity = Some(Utc::now());
            (old_status, record.clone())
        };

        info!(
            user_id = %user_id,
            from = %old_status,
            to = %snapshot.status,
            "Presence status set"
        );
        self.bus.publish(PresenceEvent::StatusChanged {
            user_id: user_id.clone(),
            old_status,
            new_status: snapshot.status,
            message: snapshot.status_message.clone(),
        });
        snapshot
    }

    /// Set whether a user is available for chat.
    pub fn set_availability_for_chat(&self, user_id: &UserId, is_available: bool) -> PresenceRecord {
        let snapshot = {
            let mut record = self
                .records
                .entry(user_id.clone())
                .or_insert_with(|| PresenceRecord::offline(user_id.clone()));
            record.is_available_for_chat = is_available;
            record.clone()
        };

        self.bus.publish(PresenceEvent::AvailabilityChanged {
            user_id: user_id.clone(),
            is_available,
        });
        snapshot
    }

    /// A connection for the user was registered; `live` is the new count.
    pub fn on_connection_opened(&self, user_id: &UserId, live: usize) {
        let transition = {
            let mut record = self
                .records
                .entry(user_id.clone())
                .or_insert_with(|| PresenceRecord::offline(user_id.clone()));
            record.live_connections = live;
            record.last_activity = Some(Utc::now());
            match record.status {
                PresenceStatus::Offline | PresenceStatus::Away => {
                    let old = record.status;
                    record.status = PresenceStatus::Online;
                    Some((old, record.status_message.clone()))
                }
                _ => None,
            }
        };

        if let Some((old_status, message)) = transition {
            info!(user_id = %user_id, live, "User online");
            self.bus.publish(PresenceEvent::StatusChanged {
                user_id: user_id.clone(),
                old_status,
                new_status: PresenceStatus::Online,
                message,
            });
        }
    }

    /// A connection for the user was removed; `remaining` is the new count.
    pub fn on_connection_closed(&self, user_id: &UserId, remaining: usize) {
        let transition = match self.records.get_mut(user_id) {
            Some(mut record) => {
                record.live_connections = remaining;
                if remaining == 0 && record.status != PresenceStatus::Offline {
                    let old = record.status;
                    record.status = PresenceStatus::Offline;
                    Some((old, record.status_message.clone()))
                } else {
                    None
                }
            }
            None => None,
        };

        if let Some((old_status, message)) = transition {
            info!(user_id = %user_id, "User offline");
            self.bus.publish(PresenceEvent::StatusChanged {
                user_id: user_id.clone(),
                old_status,
                new_status: PresenceStatus::Offline,
                message,
            });
        }
    }

    /// Move Online users idle past the threshold to Away.
    ///
    /// Candidates are snapshotted first and re-checked under their entry lock,
    /// so activity recorded during the sweep wins. Returns how many changed.
    pub fn check_inactive_users(&self) -> usize {
        let cutoff = Utc::now() - self.inactivity_threshold;
        let is_idle = |record: &PresenceRecord| {
            record.status == PresenceStatus::Online
                && record.last_activity.is_none_or(|at| at < cutoff)
        };

        let candidates: Vec<UserId> = self
            .records
            .iter()
            .filter(|r| is_idle(r.value()))
            .map(|r| r.key().clone())
            .collect();

        let mut changed = Vec::new();
        for user_id in candidates {
            if let Some(mut record) = self.records.get_mut(&user_id)
                && is_idle(&record)
            {
                record.status = PresenceStatus::Away;
                changed.push((user_id.clone(), record.status_message.clone()));
            }
        }

        let count = changed.len();
        for (user_id, message) in changed {
            self.bus.publish(PresenceEvent::StatusChanged {
                user_id,
                old_status: PresenceStatus::Online,
                new_status: PresenceStatus::Away,
                message,
            });
        }
        if count > 0 {
            info!(count, "Marked inactive users away");
        }
        count
    }

    /// Records of every user whose status is not Offline.
    pub fn get_online_users(&self) -> Vec<PresenceRecord> {
        self.records
            .iter()
            .filter(|r| r.is_online())
            .map(|r| r.value().clone())
            .collect()
    }

    /// Records for the given users; unknown users are reported Offline.
    pub fn get_users_presence(&self, user_ids: &[UserId]) -> Vec<PresenceRecord> {
        user_ids.iter().map(|id| self.get_presence(id)).collect()
    }

    /// Record for one user; unknown users are reported Offline.
    pub fn get_presence(&self, user_id: &UserId) -> PresenceRecord {
        self.records
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| PresenceRecord::offline(user_id.clone()))
    }

    /// Current status of a user.
    pub fn get_status(&self, user_id: &UserId) -> PresenceStatus {
        self.records
            .get(user_id)
            .map(|r| r.status)
            .unwrap_or(PresenceStatus::Offline)
    }

    /// Number of users not Offline.
    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_online()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use teamlink_core::events::{EventKind, EventPayload};

    type Transitions = Arc<Mutex<Vec<(PresenceStatus, PresenceStatus)>>>;

    fn tracker_with_log(threshold: Duration) -> (PresenceTracker, Transitions) {
        let bus = Arc::new(EventBus::new());
        let log: Transitions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        bus.subscribe(EventKind::StatusChanged, move |event| {
            if let EventPayload::Presence(PresenceEvent::StatusChanged {
                old_status,
                new_status,
                ..
            }) = &event.payload
            {
                sink.lock().unwrap().push((*old_status, *new_status));
            }
            Ok(())
        });
        (PresenceTracker::new(bus, threshold), log)
    }

    #[test]
    fn test_connect_and_disconnect_transitions() {
        let (tracker, log) = tracker_with_log(Duration::from_secs(300));
        let user = UserId::new("alice");

        tracker.on_connection_opened(&user, 1);
        tracker.on_connection_opened(&user, 2);
        assert_eq!(tracker.get_status(&user), PresenceStatus::Online);

        tracker.on_connection_closed(&user, 1);
        assert_eq!(tracker.get_status(&user), PresenceStatus::Online);
        tracker.on_connection_closed(&user, 0);
        assert_eq!(tracker.get_status(&user), PresenceStatus::Offline);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (PresenceStatus::Offline, PresenceStatus::Online),
                (PresenceStatus::Online, PresenceStatus::Offline),
            ]
        );
    }

    #[test]
    fn test_inactive_sweep_then_activity_restores_online() {
        let (tracker, log) = tracker_with_log(Duration::ZERO);
        let user = UserId::new("bob");
        tracker.on_connection_opened(&user, 1);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.check_inactive_users(), 1);
        assert_eq!(tracker.get_status(&user), PresenceStatus::Away);
        assert_eq!(tracker.check_inactive_users(), 0);

        assert!(tracker.record_activity(&user));
        assert_eq!(tracker.get_status(&user), PresenceStatus::Online);
        assert!(!tracker.record_activity(&user));

        let log = log.lock().unwrap();
        assert_eq!(log[1], (PresenceStatus::Online, PresenceStatus::Away));
        assert_eq!(log[2], (PresenceStatus::Away, PresenceStatus::Online));
    }

    #[test]
    fn test_sticky_status_survives_sweep_and_reconnect() {
        let (tracker, _) = tracker_with_log(Duration::ZERO);
        let user = UserId::new("carol");
        tracker.on_connection_opened(&user, 1);
        tracker.update_status(&user, PresenceStatus::DoNotDisturb, Some("focus".into()));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.check_inactive_users(), 0);
        tracker.on_connection_opened(&user, 2);
        assert_eq!(tracker.get_status(&user), PresenceStatus::DoNotDisturb);
        assert_eq!(
            tracker.get_presence(&user).status_message.as_deref(),
            Some("focus")
        );
    }

    #[test]
    fn test_update_status_always_emits() {
        let (tracker, log) = tracker_with_log(Duration::from_secs(300));
        let user = UserId::new("dave");
        tracker.on_connection_opened(&user, 1);
        tracker.update_status(&user, PresenceStatus::Online, None);
        tracker.update_status(&user, PresenceStatus::Online, None);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_offline_only_without_connections() {
        let (tracker, _) = tracker_with_log(Duration::from_secs(300));
        let user = UserId::new("erin");
        tracker.on_connection_opened(&user, 1);

        let record = tracker.update_status(&user, PresenceStatus::Offline, None);
        assert_eq!(record.status, PresenceStatus::Online);

        let ghost = UserId::new("ghost");
        let record = tracker.update_status(&ghost, PresenceStatus::Busy, None);
        assert_eq!(record.status, PresenceStatus::Offline);
    }

    #[test]
    fn test_queries_default_unknown_users_to_offline() {
        let (tracker, _) = tracker_with_log(Duration::from_secs(300));
        let online = UserId::new("frank");
        tracker.on_connection_opened(&online, 1);
        tracker.set_availability_for_chat(&online, false);

        let records = tracker.get_users_presence(&[online.clone(), UserId::new("nobody")]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, PresenceStatus::Online);
        assert!(!records[0].is_available_for_chat);
        assert_eq!(records[1].status, PresenceStatus::Offline);

        let online_users = tracker.get_online_users();
        assert_eq!(online_users.len(), 1);
        assert_eq!(online_users[0].user_id, online);
        assert_eq!(tracker.online_count(), 1);
    }
}
