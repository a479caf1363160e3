//! Background sweeps and scheduled tasks for TeamLink.
//!
//! This crate provides:
//! - A sweep executor that dispatches a named task to its handler
//! - A scheduler that runs each task on a fixed interval
//! - Built-in handlers for presence inactivity, pending-message expiry, and
//!   dead-connection reaping

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutor, JobHandler};
pub use jobs::builtin_executor;
pub use scheduler::{CronScheduler, SweepSchedule};
