//! Redis-backed job queue implementation.
//!
//! Implements the core [`JobQueue`] trait by pushing jobs to Redis
//! for the apalis workers to process.

use async_trait::async_trait;

use agora_common::{AppError, AppResult};
use agora_core::{JobQueue, NotificationEvent};

use crate::jobs::{NotificationEmailJob, NotificationFanoutJob, SanitizeJob};

/// Redis-backed job queue.
#[derive(Clone)]
pub struct RedisJobQueue {
    sanitize_storage: apalis_redis::RedisStorage<SanitizeJob>,
    fanout_storage: apalis_redis::RedisStorage<NotificationFanoutJob>,
    email_storage: apalis_redis::RedisStorage<NotificationEmailJob>,
}

impl RedisJobQueue {
    /// Create a new Redis job queue.
    #[must_use]
    pub const fn new(
        sanitize_storage: apalis_redis::RedisStorage<SanitizeJob>,
        fanout_storage: apalis_redis::RedisStorage<NotificationFanoutJob>,
        email_storage: apalis_redis::RedisStorage<NotificationEmailJob>,
    ) -> Self {
        Self {
            sanitize_storage,
            fanout_storage,
            email_storage,
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue_sanitize(&self, post_id: &str) -> AppResult<()> {
        use apalis::prelude::*;

        self.sanitize_storage
            .clone()
            .push(SanitizeJob::new(post_id.to_string()))
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue sanitize job: {e}")))?;

        tracing::debug!(post_id = %post_id, "Queued sanitize job");
        Ok(())
    }

    async fn enqueue_notification(&self, event: NotificationEvent) -> AppResult<()> {
        use apalis::prelude::*;

        tracing::debug!(post_id = %event.post_id, kind = %event.kind, "Queueing notification fan-out");

        self.fanout_storage
            .clone()
            .push(NotificationFanoutJob::new(event))
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue notification job: {e}")))?;

        Ok(())
    }

    async fn enqueue_notification_email(
        &self,
        event: NotificationEvent,
        recipient_id: &str,
    ) -> AppResult<()> {
        use apalis::prelude::*;

        self.email_storage
            .clone()
            .push(NotificationEmailJob::new(event, recipient_id.to_string()))
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue notification email: {e}")))?;

        Ok(())
    }
}
