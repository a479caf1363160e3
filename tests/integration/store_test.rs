//! Pending-store expiry and side-store restore across engine instances.

use std::sync::Arc;
use std::time::Duration;

use teamlink_cache::keys::pending_message;
use teamlink_core::traits::cache::CacheProvider;
use teamlink_core::types::{MessageId, UserId};
use teamlink_realtime::RealtimeEngine;
use teamlink_realtime::delivery::{SendOutcome, SendRequest};

use crate::helpers::{TestClient, engine_with, eventually, memory_cache, test_config};

async fn is_mirrored(cache: &Arc<dyn CacheProvider>, id: &MessageId) -> bool {
    !cache
        .get_pattern(&pending_message(id.as_str()))
        .await
        .unwrap()
        .is_empty()
}

#[tokio::test]
async fn test_expired_messages_are_hidden_then_swept() {
    let engine = engine_with(&test_config());
    let bob = UserId::new("bob");

    let receipt = engine
        .send(
            SendRequest::new(UserId::new("alice"), bob.clone(), "stale")
                .with_ttl(Duration::ZERO),
        )
        .await
        .unwrap();
    assert_eq!(receipt.outcome, SendOutcome::StoredPending);

    assert!(engine.store.get_pending_messages_for_user(&bob).is_empty());
    assert_eq!(engine.store.cleanup_expired_messages().await, 1);
    assert_eq!(engine.store.pending_count(), 0);
    assert_eq!(engine.stats().metrics.messages_expired, 1);
}

#[tokio::test]
async fn test_pending_messages_survive_restart_through_side_store() {
    let config = test_config();
    let cache = memory_cache();

    let before = RealtimeEngine::new(&config, Some(Arc::clone(&cache)));
    let receipt = before
        .send(SendRequest::new(UserId::new("alice"), UserId::new("bob"), "survive"))
        .await
        .unwrap();
    assert!(is_mirrored(&cache, &receipt.message_id).await);
    drop(before);

    let after = Arc::new(RealtimeEngine::new(&config, Some(Arc::clone(&cache))));
    assert_eq!(after.restore().await.unwrap(), 1);
    assert!(after.is_pending(&receipt.message_id));

    let mut bob = TestClient::connect(&after, "bob");
    let envelope = bob.next_envelope().await;
    assert_eq!(envelope.content, "survive");
    bob.ack(&after, &envelope).await;

    assert!(eventually(|| !after.is_pending(&receipt.message_id)).await);
    // The mirror entry is removed once delivered.
    let mut removed = false;
    for _ in 0..50 {
        if !is_mirrored(&cache, &receipt.message_id).await {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(removed);
}

#[tokio::test]
async fn test_mirroring_can_be_disabled() {
    let mut config = test_config();
    config.delivery.persist_pending = false;
    let cache = memory_cache();

    let engine = RealtimeEngine::new(&config, Some(Arc::clone(&cache)));
    let receipt = engine
        .send(SendRequest::new(UserId::new("alice"), UserId::new("bob"), "local"))
        .await
        .unwrap();

    assert!(engine.is_pending(&receipt.message_id));
    assert!(!is_mirrored(&cache, &receipt.message_id).await);
}
