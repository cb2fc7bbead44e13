//! Sanitize worker.

use apalis::prelude::*;
use sea_orm::Set;
use tracing::{debug, info, warn};

use agora_db::entities::post;
use agora_db::repositories::PostRepository;

use crate::jobs::SanitizeJob;
use crate::retry::RetryConfig;

/// Context for the sanitize worker.
#[derive(Clone)]
pub struct SanitizeContext {
    /// Post repository.
    pub post_repo: PostRepository,
    /// Retry behavior for missing posts.
    pub retry: RetryConfig,
}

impl SanitizeContext {
    /// Create a new sanitize context.
    #[must_use]
    pub fn new(post_repo: PostRepository) -> Self {
        Self {
            post_repo,
            retry: RetryConfig::default(),
        }
    }
}

/// Worker function for sanitizing post content.
///
/// Reloads the post by ID and persists only the cleaned rendering.
/// A missing post is treated as replica lag and retried with a fixed
/// delay; once the attempts are exhausted the job is abandoned and the
/// post stays in its "processing" display state. Overwriting an
/// already-clean rendering is a no-op in effect, so duplicate delivery
/// is safe.
///
/// # Errors
/// Returns an error on database failures, letting the queue redeliver.
pub async fn sanitize_worker(job: SanitizeJob, ctx: Data<SanitizeContext>) -> Result<(), Error> {
    let mut attempt = 1;

    let post = loop {
        let found = ctx
            .post_repo
            .find_by_id(&job.post_id)
            .await
            .map_err(|e| Error::Failed(std::sync::Arc::new(e.into())))?;

        match found {
            Some(post) => break post,
            None if ctx.retry.should_retry(attempt) => {
                debug!(
                    post_id = %job.post_id,
                    attempt,
                    "Post not yet visible, retrying sanitize"
                );
                tokio::time::sleep(ctx.retry.delay).await;
                attempt += 1;
            }
            None => {
                warn!(
                    post_id = %job.post_id,
                    attempts = attempt,
                    "Post never appeared, abandoning sanitize job"
                );
                return Ok(());
            }
        }
    };

    let cleaned = agora_sanitize::clean(&post.content);

    ctx.post_repo
        .update(post::ActiveModel {
            id: Set(post.id.clone()),
            content_cleaned: Set(Some(cleaned)),
            ..Default::default()
        })
        .await
        .map_err(|e| Error::Failed(std::sync::Arc::new(e.into())))?;

    info!(post_id = %post.id, "Post content sanitized");
    Ok(())
}
