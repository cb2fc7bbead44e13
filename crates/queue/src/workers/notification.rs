//! Notification workers.

use apalis::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

use agora_core::{EmailMessage, EmailService, NotificationService};

use crate::jobs::{NotificationEmailJob, NotificationFanoutJob};

/// Context shared by the notification workers.
#[derive(Clone)]
pub struct NotificationContext {
    /// Resolution and rendering logic.
    pub notification: NotificationService,
    /// Outbound email.
    pub email: EmailService,
    /// Storage for per-recipient email jobs.
    pub email_storage: apalis_redis::RedisStorage<NotificationEmailJob>,
}

impl NotificationContext {
    /// Create a new notification context.
    #[must_use]
    pub const fn new(
        notification: NotificationService,
        email: EmailService,
        email_storage: apalis_redis::RedisStorage<NotificationEmailJob>,
    ) -> Self {
        Self {
            notification,
            email,
            email_storage,
        }
    }
}

/// Worker function for notification fan-out.
///
/// Resolves the recipient set against current state and enqueues one
/// email job per recipient. Duplicate delivery re-resolves and
/// re-enqueues; the per-recipient jobs are themselves idempotent-safe.
///
/// # Errors
/// Returns an error if resolution or enqueueing fails, letting the
/// queue redeliver.
pub async fn notification_fanout_worker(
    job: NotificationFanoutJob,
    ctx: Data<NotificationContext>,
) -> Result<(), Error> {
    let recipients = ctx
        .notification
        .resolve_recipients(&job.event)
        .await
        .map_err(|e| Error::Failed(Arc::new(e.into())))?;

    info!(
        post_id = %job.event.post_id,
        kind = %job.event.kind,
        recipient_count = recipients.len(),
        "Fanning out notification"
    );

    for recipient in recipients {
        ctx.email_storage
            .clone()
            .push(NotificationEmailJob::new(
                job.event.clone(),
                recipient.id.clone(),
            ))
            .await
            .map_err(|e| {
                Error::Failed(Arc::new(
                    format!("Failed to queue email job for {}: {e}", recipient.id).into(),
                ))
            })?;
    }

    Ok(())
}

/// Worker function for a single notification email.
///
/// Re-resolves the recipient at execution time: a recipient who lost
/// moderation permission, or an event whose post was since reverted,
/// resolves to nothing and the job completes without sending.
///
/// # Errors
/// Returns an error if the send fails, letting the queue redeliver.
pub async fn notification_email_worker(
    job: NotificationEmailJob,
    ctx: Data<NotificationContext>,
) -> Result<(), Error> {
    let recipients = ctx
        .notification
        .resolve_recipients(&job.event)
        .await
        .map_err(|e| Error::Failed(Arc::new(e.into())))?;

    let Some(recipient) = recipients.into_iter().find(|u| u.id == job.recipient_id) else {
        debug!(
            post_id = %job.event.post_id,
            kind = %job.event.kind,
            recipient_id = %job.recipient_id,
            "Recipient no longer qualifies, skipping email"
        );
        return Ok(());
    };

    let post_url = ctx
        .notification
        .resolve_post_url(&job.event.post_id)
        .await
        .map_err(|e| Error::Failed(Arc::new(e.into())))?;
    let (subject, text_body) = ctx.notification.render(job.event.kind, &post_url);

    match ctx
        .email
        .send(EmailMessage {
            to: recipient.email.clone(),
            subject,
            text_body,
        })
        .await
    {
        Ok(()) => {
            info!(
                post_id = %job.event.post_id,
                kind = %job.event.kind,
                recipient_id = %recipient.id,
                "Notification email sent"
            );
            Ok(())
        }
        Err(e) => {
            warn!(
                post_id = %job.event.post_id,
                recipient_id = %recipient.id,
                error = %e,
                "Notification email failed"
            );
            Err(Error::Failed(Arc::new(e.into())))
        }
    }
}
