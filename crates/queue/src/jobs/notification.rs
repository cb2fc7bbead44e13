//! Notification jobs.
//!
//! Notifications run in two stages: a fan-out job resolves the
//! recipient set at execution time, then enqueues one email job per
//! recipient. A failing recipient never blocks the others.

use agora_core::NotificationEvent;
use serde::{Deserialize, Serialize};

/// Job to resolve an event's recipients and enqueue per-recipient
/// email jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFanoutJob {
    /// The notification event.
    pub event: NotificationEvent,
}

impl NotificationFanoutJob {
    /// Create a new fan-out job.
    #[must_use]
    pub const fn new(event: NotificationEvent) -> Self {
        Self { event }
    }
}

/// Job to send one notification email to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEmailJob {
    /// The notification event.
    pub event: NotificationEvent,
    /// The recipient user ID. Re-resolved against current state when
    /// the job executes.
    pub recipient_id: String,
}

impl NotificationEmailJob {
    /// Create a new email job.
    #[must_use]
    pub const fn new(event: NotificationEvent, recipient_id: String) -> Self {
        Self {
            event,
            recipient_id,
        }
    }
}
