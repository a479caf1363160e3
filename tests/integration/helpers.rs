//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use teamlink_auth::{JwtEncoder, JwtVerifier};
use teamlink_cache::memory::MemoryCacheProvider;
use teamlink_core::config::AppConfig;
use teamlink_core::config::cache::MemoryCacheConfig;
use teamlink_core::traits::auth::Identity;
use teamlink_core::traits::cache::CacheProvider;
use teamlink_core::types::UserId;
use teamlink_realtime::RealtimeEngine;
use teamlink_realtime::connection::ConnectionHandle;
use teamlink_realtime::message::DeliveryEnvelope;
use teamlink_realtime::message::types::OutboundMessage;

/// Configuration tuned for fast tests.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.delivery.ack_timeout_ms = 300;
    config.delivery.persist_pending = true;
    config
}

/// An in-memory side-store.
pub fn memory_cache() -> Arc<dyn CacheProvider> {
    Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()))
}

/// Engine with an in-memory side-store.
pub fn engine_with(config: &AppConfig) -> Arc<RealtimeEngine> {
    Arc::new(RealtimeEngine::new(config, Some(memory_cache())))
}

/// Identity for a plain user ID.
pub fn identity(user: &str) -> Identity {
    Identity {
        user_id: UserId::new(user),
        username: user.to_string(),
    }
}

/// A connected client driving the engine directly.
pub struct TestClient {
    /// Registry handle
    pub handle: Arc<ConnectionHandle>,
    /// Frames pushed to this connection
    pub rx: mpsc::Receiver<OutboundMessage>,
}

impl TestClient {
    /// Register a connection for `user`.
    pub fn connect(engine: &RealtimeEngine, user: &str) -> Self {
        let (handle, rx) = engine.connect(&identity(user));
        Self { handle, rx }
    }

    /// Wait for the next frame of the given type, skipping others.
    pub async fn next_of_type(&mut self, frame_type: &str) -> OutboundMessage {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let frame = self.rx.recv().await.expect("connection closed");
                if frame.frame_type() == frame_type {
                    return frame;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no '{frame_type}' frame arrived"))
    }

    /// Wait for the next delivered message envelope.
    pub async fn next_envelope(&mut self) -> DeliveryEnvelope {
        match self.next_of_type("message").await {
            OutboundMessage::Message(envelope) => envelope,
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    /// Acknowledge an envelope through the inbound frame path.
    pub async fn ack(&self, engine: &RealtimeEngine, envelope: &DeliveryEnvelope) {
        let frame = serde_json::json!({
            "type": "ack",
            "correlationId": envelope.correlation_id,
            "id": envelope.id,
        });
        engine.handle_inbound(&self.handle.id, &frame.to_string()).await;
    }

    /// Drain `count` envelopes, acking each, and return them in arrival order.
    pub async fn receive_and_ack(
        &mut self,
        engine: &RealtimeEngine,
        count: usize,
    ) -> Vec<DeliveryEnvelope> {
        let mut received = Vec::with_capacity(count);
        for _ in 0..count {
            let envelope = self.next_envelope().await;
            self.ack(engine, &envelope).await;
            received.push(envelope);
        }
        received
    }
}

/// Poll until `check` holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: Arc<RealtimeEngine>,
    /// Token issuer matching the router's verifier
    pub encoder: JwtEncoder,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let config = test_config();
        let cache = memory_cache();
        let engine = Arc::new(RealtimeEngine::new(&config, Some(Arc::clone(&cache))));
        let state = teamlink_api::AppState::new(
            Arc::new(config.clone()),
            Some(cache),
            Arc::new(JwtVerifier::new(&config.auth)),
            Arc::clone(&engine),
        );

        Self {
            router: teamlink_api::build_app(state),
            engine,
            encoder: JwtEncoder::new(&config.auth),
        }
    }

    /// A valid access token for `user`.
    pub fn token(&self, user: &str) -> String {
        self.encoder
            .issue(user, user, chrono::Duration::hours(1))
            .expect("Failed to issue token")
    }

    /// Send a request through the router
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
