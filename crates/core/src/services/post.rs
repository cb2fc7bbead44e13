//! Post submission, replies and edits.
//!
//! Writing a post explicitly clears the cached sanitized rendering
//! and enqueues the sanitize job; nothing happens through implicit
//! persistence hooks, so the contract is visible in the write path.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use validator::Validate;

use agora_common::{AppError, AppResult, IdGenerator, config::ModerationConfig};
use agora_db::entities::{attachment, media, post, thread};
use agora_db::repositories::{
    AttachmentRepository, MediaRepository, PostRepository, ThreadRepository,
};

use crate::services::notification::{NotificationEvent, NotificationKind};
use crate::services::queue::QueueService;

/// An uploaded image. Dimensions are probed from the bytes on attach.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Storage URL the upload was written to.
    pub url: String,
    /// Raw image bytes, used only for dimension probing.
    pub bytes: Vec<u8>,
}

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    /// Storage URL the upload was written to.
    pub url: String,
    /// Original file name.
    pub name: String,
}

/// Input for a new thread's root post.
#[derive(Debug, Clone, Validate)]
pub struct NewPostInput {
    /// Raw post content.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// Attached images (max 3).
    pub media: Vec<MediaUpload>,
    /// Attached files (max 3).
    pub attachments: Vec<AttachmentUpload>,
}

/// Input for a reply.
#[derive(Debug, Clone, Validate)]
pub struct ReplyInput {
    /// Raw post content.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// Attached images (max 3).
    pub media: Vec<MediaUpload>,
    /// Attached files (max 3).
    pub attachments: Vec<AttachmentUpload>,
}

/// Input for an edit.
#[derive(Debug, Clone, Validate)]
pub struct EditPostInput {
    /// Replacement content.
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    /// Additional images (subject to the per-post cap).
    pub media: Vec<MediaUpload>,
    /// Additional files (subject to the per-post cap).
    pub attachments: Vec<AttachmentUpload>,
}

/// Result of a submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The thread the post landed in.
    pub thread: thread::Model,
    /// The created or updated post.
    pub post: post::Model,
    /// Whether the post awaits moderator approval.
    pub requires_approval: bool,
}

/// The auto-approval rule: an author with at least one prior approved
/// post is trusted, but any upload forces review regardless of trust.
#[must_use]
pub const fn auto_approve(author_trusted: bool, upload_count: usize) -> bool {
    author_trusted && upload_count == 0
}

/// Whether a post can still be edited: its thread is open, nobody has
/// replied, and it is younger than the edit window.
#[must_use]
pub fn is_editable(
    post: &post::Model,
    thread: &thread::Model,
    now: DateTime<Utc>,
    edit_window_hours: i64,
    has_replies: bool,
) -> bool {
    if thread.is_closed || has_replies {
        return false;
    }
    let age = now - post.created_at.with_timezone(&Utc);
    age < Duration::hours(edit_window_hours)
}

/// Post service.
#[derive(Clone)]
pub struct PostService {
    db: Arc<DatabaseConnection>,
    thread_repo: ThreadRepository,
    post_repo: PostRepository,
    media_repo: MediaRepository,
    attachment_repo: AttachmentRepository,
    queue: QueueService,
    config: ModerationConfig,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        thread_repo: ThreadRepository,
        post_repo: PostRepository,
        media_repo: MediaRepository,
        attachment_repo: AttachmentRepository,
        queue: QueueService,
        config: ModerationConfig,
    ) -> Self {
        Self {
            db,
            thread_repo,
            post_repo,
            media_repo,
            attachment_repo,
            queue,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit a root post, creating its thread.
    pub async fn create_thread_post(
        &self,
        category: thread::Category,
        author_id: &str,
        input: NewPostInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        self.check_upload_caps(input.media.len(), input.attachments.len())?;
        let probed = probe_all(&input.media)?;

        let trusted = self
            .post_repo
            .author_has_approved_post(author_id, None)
            .await?;
        let approved = auto_approve(trusted, input.media.len() + input.attachments.len());

        let now = Utc::now();
        let thread_id = self.id_gen.generate();
        let post_id = self.id_gen.generate();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let thread = thread::ActiveModel {
            id: Set(thread_id),
            category: Set(category),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            is_closed: Set(false),
            is_deleted: Set(false),
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let post = self
            .insert_post(&txn, &post_id, &thread.id, None, author_id, &input.content, approved, now)
            .await?;
        self.insert_uploads(&txn, &post.id, &probed, &input.attachments, now)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            thread_id = %thread.id,
            post_id = %post.id,
            author_id = %author_id,
            approved,
            "Thread created"
        );

        self.queue.enqueue_sanitize(&post.id).await?;
        if !approved {
            self.queue
                .enqueue_notification(NotificationEvent::new(
                    &post.id,
                    NotificationKind::ApprovalPending,
                ))
                .await?;
        }

        Ok(Submission {
            thread,
            post,
            requires_approval: !approved,
        })
    }

    /// Reply to a post in an open thread.
    pub async fn reply(
        &self,
        category: thread::Category,
        thread_id: &str,
        parent_id: &str,
        author_id: &str,
        input: ReplyInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        self.check_upload_caps(input.media.len(), input.attachments.len())?;
        let probed = probe_all(&input.media)?;

        let thread = self
            .thread_repo
            .find_by_id_in_category(thread_id, category)
            .await?
            .ok_or_else(|| AppError::ThreadNotFound(thread_id.to_string()))?;
        if thread.is_closed {
            return Err(AppError::Forbidden("thread is closed".to_string()));
        }
        let parent = self.post_repo.get_by_id_in_thread(thread_id, parent_id).await?;

        let trusted = self
            .post_repo
            .author_has_approved_post(author_id, None)
            .await?;
        let approved = auto_approve(trusted, input.media.len() + input.attachments.len());

        let now = Utc::now();
        let post_id = self.id_gen.generate();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let post = self
            .insert_post(
                &txn,
                &post_id,
                &thread.id,
                Some(&parent.id),
                author_id,
                &input.content,
                approved,
                now,
            )
            .await?;
        self.insert_uploads(&txn, &post.id, &probed, &input.attachments, now)
            .await?;

        // Replies bump the thread's activity timestamp.
        thread::ActiveModel {
            id: Set(thread.id.clone()),
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
            thread_id = %thread.id,
            post_id = %post.id,
            parent_id = %parent.id,
            author_id = %author_id,
            approved,
            "Reply created"
        );

        self.queue.enqueue_sanitize(&post.id).await?;
        if approved {
            self.queue
                .enqueue_notification(NotificationEvent::new(&post.id, NotificationKind::NewReply))
                .await?;
        } else {
            self.queue
                .enqueue_notification(NotificationEvent::new(
                    &post.id,
                    NotificationKind::ApprovalPending,
                ))
                .await?;
        }

        Ok(Submission {
            thread,
            post,
            requires_approval: !approved,
        })
    }

    /// Edit a post. Allowed for its author while the post is editable.
    ///
    /// The edit re-arms sanitization and re-evaluates approval with
    /// the post's own prior state excluded from the trust lookup.
    pub async fn edit(
        &self,
        category: thread::Category,
        thread_id: &str,
        post_id: &str,
        author_id: &str,
        input: EditPostInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        let probed = probe_all(&input.media)?;

        let thread = self
            .thread_repo
            .find_by_id_in_category(thread_id, category)
            .await?
            .ok_or_else(|| AppError::ThreadNotFound(thread_id.to_string()))?;
        let post = self.post_repo.get_by_id_in_thread(thread_id, post_id).await?;
        if post.author_id != author_id {
            // Someone else's post is invisible to the edit path.
            return Err(AppError::PostNotFound(post_id.to_string()));
        }

        let has_replies = self.post_repo.has_replies(post_id).await?;
        let now = Utc::now();
        if !is_editable(&post, &thread, now, self.config.edit_window_hours, has_replies) {
            return Err(AppError::Forbidden("post is no longer editable".to_string()));
        }

        let existing_media = self.media_repo.count_for_post(post_id).await?;
        let existing_attachments = self.attachment_repo.count_for_post(post_id).await?;
        self.check_upload_caps(
            usize::try_from(existing_media).unwrap_or(usize::MAX) + input.media.len(),
            usize::try_from(existing_attachments).unwrap_or(usize::MAX) + input.attachments.len(),
        )?;

        let trusted = self
            .post_repo
            .author_has_approved_post(author_id, Some(post_id))
            .await?;
        let approved = auto_approve(trusted, input.media.len() + input.attachments.len());

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = post::ActiveModel {
            id: Set(post_id.to_string()),
            content: Set(input.content.clone()),
            // The cached rendering is stale the moment content changes.
            content_cleaned: Set(None),
            edited: Set(Some(now.into())),
            updated_at: Set(now.into()),
            is_approved: Set(approved),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.insert_uploads(&txn, post_id, &probed, &input.attachments, now)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            thread_id = %thread.id,
            post_id = %post_id,
            author_id = %author_id,
            approved,
            "Post edited"
        );

        self.queue.enqueue_sanitize(post_id).await?;
        if !approved {
            self.queue
                .enqueue_notification(NotificationEvent::new(
                    post_id,
                    NotificationKind::ApprovalPending,
                ))
                .await?;
        }

        Ok(Submission {
            thread,
            post: updated,
            requires_approval: !approved,
        })
    }

    fn check_upload_caps(&self, media_count: usize, attachment_count: usize) -> AppResult<()> {
        if media_count > self.config.max_media_per_post {
            return Err(AppError::BadRequest(format!(
                "at most {} images per post",
                self.config.max_media_per_post
            )));
        }
        if attachment_count > self.config.max_attachments_per_post {
            return Err(AppError::BadRequest(format!(
                "at most {} attachments per post",
                self.config.max_attachments_per_post
            )));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_post(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        post_id: &str,
        thread_id: &str,
        parent_id: Option<&str>,
        author_id: &str,
        content: &str,
        approved: bool,
        now: DateTime<Utc>,
    ) -> AppResult<post::Model> {
        post::ActiveModel {
            id: Set(post_id.to_string()),
            thread_id: Set(thread_id.to_string()),
            parent_id: Set(parent_id.map(ToString::to_string)),
            author_id: Set(author_id.to_string()),
            content: Set(content.to_string()),
            content_cleaned: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            edited: Set(None),
            is_deleted: Set(false),
            is_approved: Set(approved),
            is_flagged: Set(false),
            is_spam: Set(false),
            is_highlighted: Set(false),
        }
        .insert(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_uploads(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        post_id: &str,
        media: &[(MediaUpload, (u32, u32))],
        attachments: &[AttachmentUpload],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        for (upload, (width, height)) in media {
            media::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.to_string()),
                url: Set(upload.url.clone()),
                width: Set(i32::try_from(*width).unwrap_or(i32::MAX)),
                height: Set(i32::try_from(*height).unwrap_or(i32::MAX)),
                created_at: Set(now.into()),
            }
            .insert(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        for upload in attachments {
            attachment::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.to_string()),
                url: Set(upload.url.clone()),
                name: Set(upload.name.clone()),
                created_at: Set(now.into()),
            }
            .insert(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(())
    }
}

/// Probe the pixel dimensions of every uploaded image.
fn probe_all(uploads: &[MediaUpload]) -> AppResult<Vec<(MediaUpload, (u32, u32))>> {
    uploads
        .iter()
        .map(|upload| {
            let dimensions = probe_dimensions(&upload.bytes)?;
            Ok((upload.clone(), dimensions))
        })
        .collect()
}

fn probe_dimensions(bytes: &[u8]) -> AppResult<(u32, u32)> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::BadRequest(format!("unreadable image: {e}")))?;
    reader
        .into_dimensions()
        .map_err(|e| AppError::BadRequest(format!("invalid image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::queue::NoOpQueue;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn test_thread(is_closed: bool) -> thread::Model {
        thread::Model {
            id: "t1".to_string(),
            category: thread::Category::Discussion,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            is_closed,
            is_deleted: false,
        }
    }

    fn test_post(created_at: DateTime<Utc>) -> post::Model {
        post::Model {
            id: "p1".to_string(),
            thread_id: "t1".to_string(),
            parent_id: None,
            author_id: "u1".to_string(),
            content: "hello".to_string(),
            content_cleaned: None,
            created_at: created_at.into(),
            updated_at: created_at.into(),
            edited: None,
            is_deleted: false,
            is_approved: true,
            is_flagged: false,
            is_spam: false,
            is_highlighted: false,
        }
    }

    #[test]
    fn test_fresh_post_in_open_thread_is_editable() {
        let now = Utc::now();
        let post = test_post(now);
        assert!(is_editable(&post, &test_thread(false), now, 24, false));
    }

    #[test]
    fn test_post_with_reply_is_not_editable() {
        let now = Utc::now();
        let post = test_post(now);
        assert!(!is_editable(&post, &test_thread(false), now, 24, true));
    }

    #[test]
    fn test_post_past_edit_window_is_not_editable() {
        let created = Utc::now();
        let post = test_post(created);
        let later = created + Duration::hours(24) + Duration::minutes(1);
        assert!(!is_editable(&post, &test_thread(false), later, 24, false));
    }

    #[test]
    fn test_post_in_closed_thread_is_not_editable() {
        let now = Utc::now();
        let post = test_post(now);
        assert!(!is_editable(&post, &test_thread(true), now, 24, false));
    }

    #[test]
    fn test_untrusted_author_needs_approval() {
        assert!(!auto_approve(false, 0));
    }

    #[test]
    fn test_trusted_author_plain_text_is_approved() {
        assert!(auto_approve(true, 0));
    }

    #[test]
    fn test_upload_forces_review_despite_trust() {
        assert!(!auto_approve(true, 1));
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn test_edit_resets_cleaned_rendering() {
        let created = Utc::now();
        let mut existing = test_post(created);
        existing.content_cleaned = Some("old rendering".to_string());

        let mut after_update = test_post(created);
        after_update.content = "new text".to_string();
        after_update.content_cleaned = None;
        after_update.edited = Some(created.into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_thread(false)]])
                .append_query_results([[existing]])
                .append_query_results([[count_row(0)]]) // replies
                .append_query_results([[count_row(0)]]) // media
                .append_query_results([[count_row(0)]]) // attachments
                .append_query_results([[count_row(1)]]) // prior approved posts
                .append_query_results([[after_update]])
                .into_connection(),
        );

        let service = PostService::new(
            Arc::clone(&db),
            ThreadRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            MediaRepository::new(Arc::clone(&db)),
            AttachmentRepository::new(Arc::clone(&db)),
            Arc::new(NoOpQueue),
            agora_common::config::ModerationConfig::default(),
        );

        let submission = service
            .edit(
                thread::Category::Discussion,
                "t1",
                "p1",
                "u1",
                EditPostInput {
                    content: "new text".to_string(),
                    media: vec![],
                    attachments: vec![],
                },
            )
            .await
            .unwrap();

        assert!(submission.post.content_cleaned.is_none());
        assert_eq!(submission.post.content, "new text");
        assert!(submission.post.edited.is_some());
        assert!(!submission.requires_approval);
    }

    #[test]
    fn test_probe_dimensions_rejects_garbage() {
        assert!(probe_dimensions(b"definitely not an image").is_err());
    }

    #[test]
    fn test_probe_dimensions_reads_png_header() {
        // Minimal 1x1 PNG.
        let png: &[u8] = &[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
            0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
            0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
            0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
            0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
        ];
        assert_eq!(probe_dimensions(png).unwrap(), (1, 1));
    }
}
