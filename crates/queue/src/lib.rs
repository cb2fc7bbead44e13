//! Background job queue for agora-rs.
//!
//! This crate provides asynchronous job processing using Redis:
//!
//! - **Jobs**: content sanitization, notification fan-out, per-recipient email
//! - **Workers**: concurrent job execution with Apalis
//! - **Retry**: fixed-delay retry for replica-lag tolerance
//! - **Scheduler**: periodic purge of soft-deleted content

pub mod jobs;
pub mod queue_impl;
pub mod retry;
pub mod scheduler;
pub mod workers;

pub use jobs::*;
pub use queue_impl::RedisJobQueue;
pub use retry::RetryConfig;
pub use scheduler::{PurgeExecutor, SchedulerConfig, run_scheduler};
pub use workers::*;
