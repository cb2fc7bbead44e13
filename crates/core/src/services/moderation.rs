//! Moderation actions.
//!
//! Every action is an idempotent toggle: applying it twice returns to
//! the original state. Thread deletion is never toggled directly; it
//! is derived from the post axis whenever a post's deleted state
//! changes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

use agora_common::{AppError, AppResult, config::ModerationConfig};
use agora_db::entities::{post, thread};
use agora_db::repositories::{PostRepository, ThreadRepository};

use crate::services::notification::{NotificationEvent, NotificationKind};
use crate::services::queue::QueueService;

/// Thread deletion is derived, never toggled: a thread is deleted iff
/// zero non-deleted posts remain in it.
#[must_use]
pub const fn thread_is_deleted(remaining_posts: u64) -> bool {
    remaining_posts == 0
}

/// What a purge run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// Posts hard-deleted.
    pub posts_purged: u64,
    /// Threads hard-deleted.
    pub threads_purged: u64,
}

/// Moderation service.
#[derive(Clone)]
pub struct ModerationService {
    db: Arc<DatabaseConnection>,
    thread_repo: ThreadRepository,
    post_repo: PostRepository,
    queue: QueueService,
    config: ModerationConfig,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        thread_repo: ThreadRepository,
        post_repo: PostRepository,
        queue: QueueService,
        config: ModerationConfig,
    ) -> Self {
        Self {
            db,
            thread_repo,
            post_repo,
            queue,
            config,
        }
    }

    /// Flip a post's approved state.
    ///
    /// Becoming approved notifies the author and every distinct
    /// ancestor author; becoming disapproved notifies nobody.
    pub async fn toggle_approved(
        &self,
        category: thread::Category,
        thread_id: &str,
        post_id: &str,
    ) -> AppResult<post::Model> {
        self.resolve_thread(category, thread_id).await?;
        let post = self.post_repo.get_by_id_in_thread(thread_id, post_id).await?;

        let approved = !post.is_approved;
        let updated = self
            .post_repo
            .update(post::ActiveModel {
                id: Set(post.id.clone()),
                is_approved: Set(approved),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await?;

        tracing::info!(post_id = %post.id, approved, "Post approval toggled");

        if approved {
            self.queue
                .enqueue_notification(NotificationEvent::new(&post.id, NotificationKind::Approved))
                .await?;
            self.queue
                .enqueue_notification(NotificationEvent::new(&post.id, NotificationKind::NewReply))
                .await?;
        }

        Ok(updated)
    }

    /// Flip a post's spam state. No notification side effects.
    pub async fn toggle_spam(
        &self,
        category: thread::Category,
        thread_id: &str,
        post_id: &str,
    ) -> AppResult<post::Model> {
        self.resolve_thread(category, thread_id).await?;
        let post = self.post_repo.get_by_id_in_thread(thread_id, post_id).await?;

        let spam = !post.is_spam;
        let updated = self
            .post_repo
            .update(post::ActiveModel {
                id: Set(post.id.clone()),
                is_spam: Set(spam),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .await?;

        tracing::info!(post_id = %post.id, spam, "Post spam toggled");

        Ok(updated)
    }

    /// Flip a post's deleted state, then re-derive the thread's
    /// deleted state in the same transaction: a thread is deleted iff
    /// it has zero remaining non-deleted posts.
    pub async fn toggle_deleted(
        &self,
        category: thread::Category,
        thread_id: &str,
        post_id: &str,
    ) -> AppResult<post::Model> {
        let thread = self.resolve_thread(category, thread_id).await?;
        let post = self.post_repo.get_by_id_in_thread(thread_id, post_id).await?;

        let deleted = !post.is_deleted;
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = post::ActiveModel {
            id: Set(post.id.clone()),
            is_deleted: Set(deleted),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let remaining = post::Entity::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .filter(post::Column::IsDeleted.eq(false))
            .count(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        thread::ActiveModel {
            id: Set(thread.id.clone()),
            is_deleted: Set(thread_is_deleted(remaining)),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            post_id = %post.id,
            deleted,
            thread_deleted = thread_is_deleted(remaining),
            "Post deletion toggled"
        );

        Ok(updated)
    }

    /// Open or close a thread. Closing blocks new replies and freezes
    /// editability.
    pub async fn set_thread_closed(
        &self,
        category: thread::Category,
        thread_id: &str,
        closed: bool,
    ) -> AppResult<thread::Model> {
        let thread = self.resolve_thread(category, thread_id).await?;
        let updated = self.thread_repo.set_closed(&thread.id, closed).await?;

        tracing::info!(thread_id = %thread.id, closed, "Thread closed state changed");

        Ok(updated)
    }

    /// Hard-delete soft-deleted posts and empty soft-deleted threads
    /// past the retention age.
    ///
    /// Runs on a schedule, independent of user actions, and relies on
    /// nothing beyond transactional isolation; re-running or running
    /// concurrently with live traffic is safe.
    pub async fn purge(&self) -> AppResult<PurgeOutcome> {
        let cutoff = Utc::now() - Duration::hours(self.config.purge_age_hours);

        let posts_purged = self.post_repo.purge_deleted_before(cutoff).await?;
        let threads_purged = self.thread_repo.purge_deleted_before(cutoff).await?;

        if posts_purged > 0 || threads_purged > 0 {
            tracing::info!(posts_purged, threads_purged, "Purged deleted content");
        }

        Ok(PurgeOutcome {
            posts_purged,
            threads_purged,
        })
    }

    async fn resolve_thread(
        &self,
        category: thread::Category,
        thread_id: &str,
    ) -> AppResult<thread::Model> {
        self.thread_repo
            .find_by_id_in_category(thread_id, category)
            .await?
            .ok_or_else(|| AppError::ThreadNotFound(thread_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::queue::NoOpQueue;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_thread(id: &str) -> thread::Model {
        thread::Model {
            id: id.to_string(),
            category: thread::Category::Discussion,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            is_closed: false,
            is_deleted: false,
        }
    }

    fn test_post(id: &str, is_spam: bool) -> post::Model {
        post::Model {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            parent_id: None,
            author_id: "u1".to_string(),
            content: "hello".to_string(),
            content_cleaned: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            edited: None,
            is_deleted: false,
            is_approved: true,
            is_flagged: false,
            is_spam,
            is_highlighted: false,
        }
    }

    fn service(db: DatabaseConnection) -> ModerationService {
        let db = Arc::new(db);
        ModerationService::new(
            Arc::clone(&db),
            ThreadRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            Arc::new(NoOpQueue),
            ModerationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_spam_toggle_is_idempotent_pair() {
        // Two toggles in a row return the post to its original state:
        // false -> true -> false.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_thread("t1")]])
            .append_query_results([[test_post("p1", false)]])
            .append_query_results([[test_post("p1", true)]])
            .append_query_results([[test_thread("t1")]])
            .append_query_results([[test_post("p1", true)]])
            .append_query_results([[test_post("p1", false)]])
            .into_connection();

        let service = service(db);

        let first = service
            .toggle_spam(thread::Category::Discussion, "t1", "p1")
            .await
            .unwrap();
        assert!(first.is_spam);

        let second = service
            .toggle_spam(thread::Category::Discussion, "t1", "p1")
            .await
            .unwrap();
        assert!(!second.is_spam);
    }

    #[test]
    fn test_deleting_the_only_post_deletes_the_thread() {
        // One post, now deleted: zero remain.
        assert!(thread_is_deleted(0));
    }

    #[test]
    fn test_deleting_one_of_two_posts_keeps_the_thread() {
        // Two posts, one deleted: one remains.
        assert!(!thread_is_deleted(1));
    }

    #[tokio::test]
    async fn test_toggle_in_wrong_category_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<thread::Model>::new()])
            .into_connection();

        let service = service(db);
        let result = service
            .toggle_spam(thread::Category::Issue, "t1", "p1")
            .await;

        assert!(matches!(result, Err(AppError::ThreadNotFound(_))));
    }
}
