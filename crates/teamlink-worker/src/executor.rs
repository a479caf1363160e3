//! Job executor: dispatches sweeps to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use teamlink_core::error::AppError;
use teamlink_realtime::task::spawn_supervised;

/// Trait for sweep handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &'static str;

    /// Run one pass and return a summary of what it did
    async fn execute(&self) -> Result<Value, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// No handler for the requested type
    #[error("No handler registered for job type '{0}'")]
    UnknownJob(String),

    /// The handler task panicked or was cancelled
    #[error("Job '{0}' aborted")]
    Aborted(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Dispatches sweeps to the appropriate handler based on job type
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type();
        tracing::info!(job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Run a job by dispatching to the correct handler.
    ///
    /// The handler runs in its own supervised task, so a panicking pass is
    /// logged and reported as [`JobExecutionError::Aborted`] instead of
    /// unwinding into the scheduler.
    pub async fn execute(&self, job_type: &str) -> Result<Value, JobExecutionError> {
        let handler = self
            .handlers
            .get(job_type)
            .cloned()
            .ok_or_else(|| JobExecutionError::UnknownJob(job_type.to_string()))?;

        tracing::debug!(job_type, "Executing job");

        let (tx, rx) = tokio::sync::oneshot::channel();
        let name = handler.job_type();
        let task = spawn_supervised(name, async move {
            // The executor may have stopped waiting.
            let _ = tx.send(handler.execute().await);
        });
        // Panics are logged by the supervisor and surface here as a dropped sender.
        let _ = task.await;

        rx.await
            .map_err(|_| JobExecutionError::Aborted(job_type.to_string()))?
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
