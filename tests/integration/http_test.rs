//! HTTP surface through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use teamlink_core::types::{PresenceStatus, UserId};

use crate::helpers::TestApp;

async fn upgrade_status(app: &TestApp, uri: &str) -> StatusCode {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("Connection", "upgrade")
        .header("Upgrade", "websocket")
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .expect("Failed to build request");

    app.router
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request")
        .status()
}

#[tokio::test]
async fn test_ws_upgrade_requires_valid_token() {
    let app = TestApp::new();

    assert_eq!(upgrade_status(&app, "/ws").await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        upgrade_status(&app, "/ws?token=not-a-jwt").await,
        StatusCode::UNAUTHORIZED
    );

    // A valid token passes authentication; the in-process request cannot
    // actually be upgraded, so axum rejects it afterwards.
    let token = app.token("alice");
    let status = upgrade_status(&app, &format!("/ws?token={token}")).await;
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.engine.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");

    let response = app.request("GET", "/api/health/detailed", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["cache"], "connected");
    assert_eq!(response.body["data"]["engine"]["connections"], 0);
}

#[tokio::test]
async fn test_send_and_list_pending_over_http() {
    let app = TestApp::new();
    let alice = app.token("alice");
    let bob = app.token("bob");

    let unauthorized = app
        .request("POST", "/api/messages", Some(json!({"to": "bob", "content": "hi"})), None)
        .await;
    assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unauthorized.body["error"], "UNAUTHORIZED");

    let invalid = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({"to": "bob", "content": "   "})),
            Some(&alice),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let sent = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({"id": "http-1", "to": "bob", "content": "hi bob"})),
            Some(&alice),
        )
        .await;
    assert_eq!(sent.status, StatusCode::ACCEPTED);
    assert_eq!(sent.body["data"]["messageId"], "http-1");
    assert_eq!(sent.body["data"]["outcome"], "stored_pending");

    let pending = app
        .request("GET", "/api/messages/pending", None, Some(&bob))
        .await;
    assert_eq!(pending.status, StatusCode::OK);
    let items = pending.body["data"].as_array().expect("pending list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "http-1");
    assert_eq!(items[0]["sender"], "alice");

    let none_for_alice = app
        .request("GET", "/api/messages/pending", None, Some(&alice))
        .await;
    assert_eq!(none_for_alice.body["data"], json!([]));
}

#[tokio::test]
async fn test_presence_endpoints() {
    let app = TestApp::new();
    let alice = app.token("alice");
    // Held so the connection stays registered.
    let _connection = app.engine.connect(&crate::helpers::identity("alice"));

    let busy = app
        .request(
            "PUT",
            "/api/presence/status",
            Some(json!({"status": "busy", "message": "focus time"})),
            Some(&alice),
        )
        .await;
    assert_eq!(busy.status, StatusCode::OK);
    assert_eq!(busy.body["data"]["status"], "Busy");
    assert_eq!(
        app.engine.presence.get_status(&UserId::new("alice")),
        PresenceStatus::Busy
    );

    let unknown = app
        .request(
            "PUT",
            "/api/presence/status",
            Some(json!({"status": "napping"})),
            Some(&alice),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let availability = app
        .request(
            "PUT",
            "/api/presence/availability",
            Some(json!({"isAvailable": false})),
            Some(&alice),
        )
        .await;
    assert_eq!(availability.body["data"]["isAvailableForChat"], false);

    let online = app
        .request("GET", "/api/presence/online", None, Some(&alice))
        .await;
    assert_eq!(online.body["data"].as_array().map(Vec::len), Some(1));

    let query = app
        .request(
            "POST",
            "/api/presence/query",
            Some(json!({"userIds": ["alice", "ghost"]})),
            Some(&alice),
        )
        .await;
    let records = query.body["data"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["status"], "Offline");
}
