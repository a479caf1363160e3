//! Built-in sweep handler implementations.

pub mod cleanup;
pub mod maintenance;
pub mod presence;

pub use cleanup::ExpiryCleanupHandler;
pub use maintenance::ConnectionReaperHandler;
pub use presence::InactivitySweepHandler;

use std::sync::Arc;

use teamlink_realtime::RealtimeEngine;

use crate::executor::JobExecutor;

/// An executor with every built-in sweep registered against `engine`.
pub fn builtin_executor(engine: &RealtimeEngine) -> JobExecutor {
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(InactivitySweepHandler::new(Arc::clone(
        &engine.presence,
    ))));
    executor.register(Arc::new(ExpiryCleanupHandler::new(Arc::clone(&engine.store))));
    executor.register(Arc::new(ConnectionReaperHandler::new(Arc::clone(
        &engine.registry,
    ))));
    executor
}
