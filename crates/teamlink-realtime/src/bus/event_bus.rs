//! Typed in-process event bus.
//!
//! Handlers subscribe per [`EventKind`]. Synchronous handlers run inline on
//! the publisher's task, in registration order. Asynchronous handlers are
//! spawned onto the current Tokio runtime and never block the publisher.
//! A failing or panicking handler is logged and never reaches the publisher
//! or the other handlers.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use teamlink_core::events::{EventKind, RealtimeEvent};
use teamlink_core::result::AppResult;

type SyncHandler = Arc<dyn Fn(&RealtimeEvent) -> AppResult<()> + Send + Sync>;
type AsyncHandler = Arc<dyn Fn(RealtimeEvent) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

/// Token returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe hub for [`RealtimeEvent`]s.
pub struct EventBus {
    sync_handlers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, SyncHandler)>>>,
    async_handlers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, AsyncHandler)>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            sync_handlers: RwLock::new(HashMap::new()),
            async_handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a handler that runs inline, in registration order.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&RealtimeEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.sync_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(?kind, subscription = id.0, "Sync handler subscribed");
        id
    }

    /// Register a handler that is spawned as an independent task per event.
    pub fn subscribe_async<F, Fut>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(RealtimeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        let id = self.allocate_id();
        let handler: AsyncHandler = Arc::new(move |event| handler(event).boxed());
        self.async_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .push((id, handler));
        debug!(?kind, subscription = id.0, "Async handler subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for list in self
            .sync_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .values_mut()
        {
            let before = list.len();
            list.retain(|(sid, _)| *sid != id);
            removed |= list.len() != before;
        }
        for list in self
            .async_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .values_mut()
        {
            let before = list.len();
            list.retain(|(sid, _)| *sid != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Number of handlers (sync and async) registered for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let sync = self
            .sync_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map_or(0, Vec::len);
        let asynchronous = self
            .async_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map_or(0, Vec::len);
        sync + asynchronous
    }

    /// Publish an event. Sync handlers complete before this returns; async
    /// handlers are spawned and left running.
    pub fn publish(&self, event: impl Into<RealtimeEvent>) {
        let event = event.into();
        self.run_sync(&event);
        drop(self.spawn_async(&event));
    }

    /// Publish an event and wait for every async handler it spawned.
    pub async fn publish_and_wait(&self, event: impl Into<RealtimeEvent>) {
        let event = event.into();
        self.run_sync(&event);
        for result in futures::future::join_all(self.spawn_async(&event)).await {
            if let Err(e) = result {
                error!(kind = ?event.kind(), error = %e, "Async event handler task failed");
            }
        }
    }

    fn run_sync(&self, event: &RealtimeEvent) {
        let kind = event.kind();
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<SyncHandler> = match self
            .sync_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
        {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return,
        };

        for handler in handlers {
            match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(?kind, event_id = %event.id, error = %e, "Event handler failed");
                }
                Err(_) => {
                    error!(?kind, event_id = %event.id, "Event handler panicked");
                }
            }
        }
    }

    fn spawn_async(&self, event: &RealtimeEvent) -> Vec<JoinHandle<()>> {
        let kind = event.kind();
        let handlers: Vec<AsyncHandler> = match self
            .async_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
        {
            Some(list) if !list.is_empty() => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            _ => return Vec::new(),
        };

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(?kind, "No async runtime; skipping async event handlers");
                return Vec::new();
            }
        };

        let mut tasks = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let future = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event.clone()))) {
                Ok(future) => future,
                Err(_) => {
                    error!(?kind, event_id = %event.id, "Async event handler panicked");
                    continue;
                }
            };
            let event_id = event.id;
            tasks.push(runtime.spawn(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(?kind, %event_id, error = %e, "Async event handler failed");
                    }
                    Err(_) => {
                        error!(?kind, %event_id, "Async event handler panicked");
                    }
                }
            }));
        }
        tasks
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
