//! Interval scheduler for the periodic sweeps.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use teamlink_core::config::AppConfig;
use teamlink_core::error::AppError;

use crate::executor::JobExecutor;

/// How often each built-in sweep runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    /// Presence inactivity sweep
    pub presence_inactivity: Duration,
    /// Pending-message expiry sweep
    pub message_expiry: Duration,
    /// Dead-connection reaper
    pub connection_reaper: Duration,
}

impl SweepSchedule {
    /// Intervals taken from the presence, delivery and realtime sections
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            presence_inactivity: config.presence.sweep_interval(),
            message_expiry: config.delivery.cleanup_interval(),
            connection_reaper: config.realtime.reap_interval(),
        }
    }
}

/// Fixed-interval scheduler for background sweeps
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Dispatches each tick to its handler
    executor: Arc<JobExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("jobs", &self.executor.registered_types())
            .finish()
    }
}

impl CronScheduler {
    /// Create a new scheduler
    pub async fn new(executor: Arc<JobExecutor>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            executor,
        })
    }

    /// Register all built-in sweeps
    pub async fn register_default_tasks(&self, schedule: &SweepSchedule) -> Result<(), AppError> {
        self.register_repeated("presence_inactivity", schedule.presence_inactivity)
            .await?;
        self.register_repeated("message_expiry", schedule.message_expiry)
            .await?;
        self.register_repeated("connection_reaper", schedule.connection_reaper)
            .await?;

        tracing::info!("All scheduled sweeps registered");
        Ok(())
    }

    /// Run `job_type` every `every`.
    ///
    /// Failures and panics of a single pass are logged; the timer keeps
    /// running.
    pub async fn register_repeated(
        &self,
        job_type: &'static str,
        every: Duration,
    ) -> Result<(), AppError> {
        if every.is_zero() {
            return Err(AppError::configuration(format!(
                "Interval for '{job_type}' must be greater than zero"
            )));
        }
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "No handler registered for '{job_type}'"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let job = CronJob::new_repeated_async(every, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                match executor.execute(job_type).await {
                    Ok(summary) => tracing::debug!(job_type, %summary, "Sweep finished"),
                    Err(e) => tracing::error!(job_type, error = %e, "Sweep failed"),
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create {job_type} schedule: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {job_type} schedule: {e}")))?;

        tracing::info!(job_type, every_secs = every.as_secs_f64(), "Registered sweep");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Sweep scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Sweep scheduler shut down");
        Ok(())
    }
}
