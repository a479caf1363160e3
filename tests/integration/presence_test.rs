//! Presence lifecycle driven through connections and inbound frames.

use std::time::Duration;

use teamlink_core::types::{PresenceStatus, UserId};
use teamlink_realtime::message::types::OutboundMessage;

use crate::helpers::{TestClient, engine_with, test_config};

#[tokio::test]
async fn test_status_follows_connection_count() {
    let engine = engine_with(&test_config());
    let alice = UserId::new("alice");

    assert_eq!(engine.presence.get_status(&alice), PresenceStatus::Offline);

    let first = TestClient::connect(&engine, "alice");
    let second = TestClient::connect(&engine, "alice");
    assert_eq!(engine.presence.get_status(&alice), PresenceStatus::Online);
    assert_eq!(engine.presence.get_presence(&alice).live_connections, 2);

    engine.disconnect(&first.handle.id);
    assert_eq!(engine.presence.get_status(&alice), PresenceStatus::Online);

    engine.disconnect(&second.handle.id);
    assert_eq!(engine.presence.get_status(&alice), PresenceStatus::Offline);
    assert!(!engine.registry.is_user_connected(&alice));
}

#[tokio::test]
async fn test_sweep_demotes_idle_users_but_not_busy_ones() {
    let mut config = test_config();
    config.presence.inactivity_threshold_seconds = 0;
    let engine = engine_with(&config);

    let alice = TestClient::connect(&engine, "alice");
    let bob = TestClient::connect(&engine, "bob");
    engine
        .handle_inbound(&alice.handle.id, r#"{"type":"presence","status":"Busy","message":"in a call"}"#)
        .await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(engine.presence.check_inactive_users(), 1);
    assert_eq!(engine.presence.get_status(&UserId::new("alice")), PresenceStatus::Busy);
    assert_eq!(engine.presence.get_status(&UserId::new("bob")), PresenceStatus::Away);

    // Any non-heartbeat frame is activity.
    engine
        .handle_inbound(&bob.handle.id, r#"{"type":"activity"}"#)
        .await;
    assert_eq!(engine.presence.get_status(&UserId::new("bob")), PresenceStatus::Online);

    // A heartbeat pong is not.
    tokio::time::sleep(Duration::from_millis(5)).await;
    engine.presence.check_inactive_users();
    engine
        .handle_inbound(&bob.handle.id, r#"{"type":"pong"}"#)
        .await;
    assert_eq!(engine.presence.get_status(&UserId::new("bob")), PresenceStatus::Away);
}

#[tokio::test]
async fn test_explicit_offline_is_ignored_while_connected() {
    let engine = engine_with(&test_config());
    let alice = TestClient::connect(&engine, "alice");

    engine
        .handle_inbound(&alice.handle.id, r#"{"type":"presence","status":"Offline","message":"brb"}"#)
        .await;

    let record = engine.presence.get_presence(&UserId::new("alice"));
    assert_eq!(record.status, PresenceStatus::Online);
    assert_eq!(record.status_message.as_deref(), Some("brb"));
}

#[tokio::test]
async fn test_changes_are_broadcast_to_other_connections() {
    let engine = engine_with(&test_config());
    let alice = TestClient::connect(&engine, "alice");
    let mut carol = TestClient::connect(&engine, "carol");

    engine
        .handle_inbound(&alice.handle.id, r#"{"type":"availability","isAvailable":false}"#)
        .await;

    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let OutboundMessage::Presence {
                user_id,
                is_available,
                ..
            } = carol.next_of_type("presence").await
                && user_id == UserId::new("alice")
                && !is_available
            {
                return is_available;
            }
        }
    })
    .await;

    assert_eq!(frame, Ok(false));
    assert!(!engine.presence.get_presence(&UserId::new("alice")).is_available_for_chat);
}
