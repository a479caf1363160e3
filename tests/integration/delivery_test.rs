//! End-to-end delivery through the engine: store-and-forward, acks, receipts,
//! ordering, idempotent retries, and fan-out.

use std::sync::Arc;
use std::time::Duration;

use teamlink_core::types::{DeliveryStatus, MessageId, UserId};
use teamlink_realtime::delivery::{SendOutcome, SendRequest};
use teamlink_realtime::message::types::OutboundMessage;

use crate::helpers::{TestClient, engine_with, eventually, test_config};

fn request(from: &str, to: &str, content: &str) -> SendRequest {
    SendRequest::new(UserId::new(from), UserId::new(to), content)
}

#[tokio::test]
async fn test_offline_message_is_delivered_on_connect_and_receipt_reaches_sender() {
    let engine = engine_with(&test_config());

    let receipt = engine.send(request("alice", "bob", "hello")).await.unwrap();
    assert_eq!(receipt.outcome, SendOutcome::StoredPending);
    assert_eq!(receipt.reached, 0);
    assert!(engine.is_pending(&receipt.message_id));

    let mut alice = TestClient::connect(&engine, "alice");
    let mut bob = TestClient::connect(&engine, "bob");

    let envelope = bob.next_envelope().await;
    assert_eq!(envelope.id, receipt.message_id);
    assert_eq!(envelope.from, UserId::new("alice"));
    assert_eq!(envelope.content, "hello");
    assert!(envelope.requires_ack);

    bob.ack(&engine, &envelope).await;
    assert!(eventually(|| !engine.is_pending(&receipt.message_id)).await);

    let read = serde_json::json!({
        "type": "receipt",
        "id": envelope.id,
        "status": "Read",
    });
    engine.handle_inbound(&bob.handle.id, &read.to_string()).await;

    match alice.next_of_type("receipt").await {
        OutboundMessage::Receipt {
            id, from, status, ..
        } => {
            assert_eq!(id, receipt.message_id);
            assert_eq!(from, UserId::new("bob"));
            assert_eq!(status, DeliveryStatus::Read);
        }
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn test_second_device_receives_message_left_unacked_by_first() {
    let engine = engine_with(&test_config());
    let receipt = engine.send(request("alice", "bob", "hello")).await.unwrap();
    assert_eq!(receipt.outcome, SendOutcome::StoredPending);

    // The phone gets the drained message but never acks it.
    let mut phone = TestClient::connect(&engine, "bob");
    assert_eq!(phone.next_envelope().await.id, receipt.message_id);

    // The laptop connects while the phone's ack wait is still open, then
    // the phone goes away.
    let mut laptop = TestClient::connect(&engine, "bob");
    engine.disconnect(&phone.handle.id);

    let envelope = laptop.next_envelope().await;
    assert_eq!(envelope.id, receipt.message_id);
    laptop.ack(&engine, &envelope).await;
    assert!(eventually(|| !engine.is_pending(&receipt.message_id)).await);
}

#[tokio::test]
async fn test_receipts_are_checked_against_the_delivered_message() {
    let engine = engine_with(&test_config());
    let mut alice = TestClient::connect(&engine, "alice");
    let mut bob = TestClient::connect(&engine, "bob");
    let mallory = TestClient::connect(&engine, "mallory");

    let sender = Arc::clone(&engine);
    let send = tokio::spawn(async move { sender.send(request("alice", "bob", "ping")).await });
    let envelope = bob.next_envelope().await;
    bob.ack(&engine, &envelope).await;
    assert_eq!(send.await.unwrap().unwrap().outcome, SendOutcome::Delivered);

    // A forged receipt for the delivered message is not forwarded to alice.
    let read = serde_json::json!({ "type": "receipt", "id": envelope.id, "status": "Read" });
    engine.handle_inbound(&mallory.handle.id, &read.to_string()).await;
    let forged = serde_json::json!({ "type": "receipt", "id": "made-up", "status": "Read" });
    engine.handle_inbound(&mallory.handle.id, &forged.to_string()).await;

    // The recipient's read receipt still reaches the sender after delivery.
    engine.handle_inbound(&bob.handle.id, &read.to_string()).await;
    match alice.next_of_type("receipt").await {
        OutboundMessage::Receipt { id, from, status, .. } => {
            assert_eq!(id, envelope.id);
            assert_eq!(from, UserId::new("bob"));
            assert_eq!(status, DeliveryStatus::Read);
        }
        other => panic!("unexpected frame: {other:?}"),
    }
    let extra = tokio::time::timeout(Duration::from_millis(200), alice.next_of_type("receipt")).await;
    assert!(extra.is_err(), "only the recipient's receipt is forwarded");
}

#[tokio::test]
async fn test_online_send_waits_for_ack() {
    let engine = engine_with(&test_config());
    let mut bob = TestClient::connect(&engine, "bob");

    let sender = Arc::clone(&engine);
    let send = tokio::spawn(async move { sender.send(request("alice", "bob", "ping")).await });

    let envelope = bob.next_envelope().await;
    bob.ack(&engine, &envelope).await;

    let receipt = send.await.unwrap().unwrap();
    assert_eq!(receipt.outcome, SendOutcome::Delivered);
    assert_eq!(receipt.reached, 1);
    assert!(!engine.is_pending(&receipt.message_id));
    assert_eq!(engine.stats().metrics.messages_delivered, 1);
}

#[tokio::test]
async fn test_unacked_send_falls_back_to_store() {
    let engine = engine_with(&test_config());
    let mut bob = TestClient::connect(&engine, "bob");

    let receipt = engine.send(request("alice", "bob", "are you there")).await.unwrap();

    // The frame reached bob's connection, but without an ack the message stays pending.
    assert_eq!(bob.next_envelope().await.id, receipt.message_id);
    assert_eq!(receipt.outcome, SendOutcome::StoredPending);
    assert!(engine.is_pending(&receipt.message_id));
    assert_eq!(engine.stats().metrics.ack_timeouts, 1);
}

#[tokio::test]
async fn test_pending_messages_arrive_in_send_order() {
    let engine = engine_with(&test_config());
    let mut sent = Vec::new();
    for i in 0..5 {
        let receipt = engine
            .send(request("alice", "bob", &format!("m{i}")))
            .await
            .unwrap();
        sent.push(receipt.message_id);
    }

    let mut bob = TestClient::connect(&engine, "bob");
    let received = bob.receive_and_ack(&engine, sent.len()).await;

    let received_ids: Vec<MessageId> = received.iter().map(|e| e.id.clone()).collect();
    assert_eq!(received_ids, sent);
    let contents: Vec<&str> = received.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);

    assert!(eventually(|| engine.store.pending_count() == 0).await);
}

#[tokio::test]
async fn test_retry_with_same_id_is_delivered_once() {
    let engine = engine_with(&test_config());
    let id = MessageId::new("client-msg-1");

    engine
        .send(request("alice", "bob", "draft").with_id(id.clone()))
        .await
        .unwrap();
    let retry = engine
        .send(request("alice", "bob", "final").with_id(id.clone()))
        .await
        .unwrap();
    assert_eq!(retry.message_id, id);
    assert_eq!(engine.store.pending_count(), 1);

    let mut bob = TestClient::connect(&engine, "bob");
    let envelope = bob.next_envelope().await;
    assert_eq!(envelope.id, id);
    assert_eq!(envelope.content, "final");
    bob.ack(&engine, &envelope).await;

    let second = tokio::time::timeout(Duration::from_millis(300), bob.next_envelope()).await;
    assert!(second.is_err(), "retry must not be delivered twice");
}

#[tokio::test]
async fn test_offline_without_queueing_is_dropped() {
    let engine = engine_with(&test_config());

    let receipt = engine
        .send(request("alice", "bob", "ephemeral").queue_if_offline(false))
        .await
        .unwrap();

    assert_eq!(receipt.outcome, SendOutcome::Dropped);
    assert_eq!(engine.store.pending_count(), 0);
    assert_eq!(engine.stats().metrics.messages_dropped, 1);
}

#[tokio::test]
async fn test_concurrent_senders_to_offline_user() {
    let engine = engine_with(&test_config());

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .send(request(&format!("sender-{i}"), "bob", &format!("msg {i}")))
                    .await
            })
        })
        .collect();

    let mut ids = std::collections::HashSet::new();
    for task in tasks {
        let receipt = task.await.unwrap().unwrap();
        assert_eq!(receipt.outcome, SendOutcome::StoredPending);
        ids.insert(receipt.message_id);
    }

    assert_eq!(ids.len(), 50);
    let pending = engine.store.get_pending_messages_for_user(&UserId::new("bob"));
    assert_eq!(pending.len(), 50);
    assert!(pending.iter().all(|m| ids.contains(&m.id)));
}

#[tokio::test]
async fn test_group_and_broadcast_sends_are_never_stored() {
    let engine = engine_with(&test_config());
    let mut alice = TestClient::connect(&engine, "alice");
    let mut carol = TestClient::connect(&engine, "carol");

    engine
        .handle_inbound(&alice.handle.id, r#"{"type":"join_group","group":"ops"}"#)
        .await;
    alice.next_of_type("joined").await;

    let group = engine.send(request("bob", "group:ops", "deploy")).await.unwrap();
    assert_eq!(group.outcome, SendOutcome::Transmitted);
    assert_eq!(group.reached, 1);
    assert_eq!(alice.next_envelope().await.content, "deploy");

    let empty = engine.send(request("bob", "group:nobody", "hello?")).await.unwrap();
    assert_eq!(empty.outcome, SendOutcome::Dropped);

    let everyone = engine.send(request("bob", "*", "maintenance")).await.unwrap();
    assert_eq!(everyone.outcome, SendOutcome::Transmitted);
    assert_eq!(everyone.reached, 2);
    assert_eq!(carol.next_envelope().await.content, "maintenance");

    assert_eq!(engine.store.pending_count(), 0);
}
