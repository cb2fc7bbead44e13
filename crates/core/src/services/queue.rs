//! Background job queue abstraction.
//!
//! Core services enqueue sanitization and notification work without
//! depending on the queue implementation; the queue crate provides the
//! Redis-backed implementation.

use async_trait::async_trait;
use std::sync::Arc;

use agora_common::AppResult;

use crate::services::notification::NotificationEvent;

/// Trait for enqueueing background jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue content sanitization for a post.
    async fn enqueue_sanitize(&self, post_id: &str) -> AppResult<()>;

    /// Queue a notification fan-out. Recipients are resolved when the
    /// job executes, not when it is enqueued.
    async fn enqueue_notification(&self, event: NotificationEvent) -> AppResult<()>;

    /// Queue a single-recipient notification email.
    async fn enqueue_notification_email(
        &self,
        event: NotificationEvent,
        recipient_id: &str,
    ) -> AppResult<()>;
}

/// Shared handle to the job queue.
pub type QueueService = Arc<dyn JobQueue>;

/// A no-op implementation of [`JobQueue`] for tests or when background
/// processing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpQueue;

#[async_trait]
impl JobQueue for NoOpQueue {
    async fn enqueue_sanitize(&self, post_id: &str) -> AppResult<()> {
        tracing::debug!(post_id = %post_id, "NoOpQueue: skipping sanitize job");
        Ok(())
    }

    async fn enqueue_notification(&self, event: NotificationEvent) -> AppResult<()> {
        tracing::debug!(post_id = %event.post_id, kind = %event.kind, "NoOpQueue: skipping notification job");
        Ok(())
    }

    async fn enqueue_notification_email(
        &self,
        event: NotificationEvent,
        recipient_id: &str,
    ) -> AppResult<()> {
        tracing::debug!(
            post_id = %event.post_id,
            kind = %event.kind,
            recipient_id = %recipient_id,
            "NoOpQueue: skipping notification email job"
        );
        Ok(())
    }
}
