//! Historical comment import.
//!
//! Maps an already-parsed Disqus-style export (nested parent/child
//! records with author identity, original timestamps and attached
//! media URLs) onto threads, posts and media. XML parsing and CLI
//! handling stay outside the core; this service receives plain
//! records.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::Deserialize;

use agora_common::{AppResult, IdGenerator};
use agora_db::entities::{media, post, thread, user};
use agora_db::repositories::{MediaRepository, PostRepository, ThreadRepository, UserRepository};

use crate::services::queue::QueueService;

/// Author identity in an export.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedAuthor {
    /// Exported username.
    pub username: String,
    /// Exported email address.
    pub email: String,
    /// Exported display name.
    pub name: Option<String>,
}

/// A single exported post, with its replies nested.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedPost {
    /// The post's author.
    pub author: ImportedAuthor,
    /// Raw message markup.
    pub content: String,
    /// Original creation timestamp, preserved on import.
    pub created_at: DateTime<Utc>,
    /// Exported moderation state.
    #[serde(default)]
    pub is_deleted: bool,
    /// Exported approval state. Disqus exports posts as approved
    /// unless marked otherwise.
    #[serde(default = "default_true")]
    pub is_approved: bool,
    /// Exported flagged state.
    #[serde(default)]
    pub is_flagged: bool,
    /// Exported spam state.
    #[serde(default)]
    pub is_spam: bool,
    /// Exported highlighted state.
    #[serde(default)]
    pub is_highlighted: bool,
    /// URLs of attached images.
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Nested replies.
    #[serde(default)]
    pub replies: Vec<ImportedPost>,
}

const fn default_true() -> bool {
    true
}

/// An exported thread: a root post tree under a category.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedThread {
    /// Target category.
    pub category: thread::Category,
    /// The root post and its reply tree.
    pub root: ImportedPost,
}

/// Counters for an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Threads created.
    pub threads: u64,
    /// Posts created.
    pub posts: u64,
    /// Authors created (not found by username or email).
    pub authors_created: u64,
}

/// Import service.
#[derive(Clone)]
pub struct ImportService {
    user_repo: UserRepository,
    thread_repo: ThreadRepository,
    post_repo: PostRepository,
    media_repo: MediaRepository,
    queue: QueueService,
    id_gen: IdGenerator,
}

impl ImportService {
    /// Create a new import service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        thread_repo: ThreadRepository,
        post_repo: PostRepository,
        media_repo: MediaRepository,
        queue: QueueService,
    ) -> Self {
        Self {
            user_repo,
            thread_repo,
            post_repo,
            media_repo,
            queue,
            id_gen: IdGenerator::new(),
        }
    }

    /// Import a batch of exported threads.
    pub async fn import(&self, threads: Vec<ImportedThread>) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        for imported in threads {
            self.import_thread(imported, &mut report).await?;
        }

        tracing::info!(
            threads = report.threads,
            posts = report.posts,
            authors_created = report.authors_created,
            "Import finished"
        );

        Ok(report)
    }

    async fn import_thread(
        &self,
        imported: ImportedThread,
        report: &mut ImportReport,
    ) -> AppResult<()> {
        // The thread inherits the root post's original timestamps
        // instead of now().
        let thread = self
            .thread_repo
            .create(thread::ActiveModel {
                id: Set(self.id_gen.generate()),
                category: Set(imported.category),
                created_at: Set(imported.root.created_at.into()),
                updated_at: Set(imported.root.created_at.into()),
                is_closed: Set(false),
                is_deleted: Set(false),
            })
            .await?;
        report.threads += 1;

        // Walk the reply tree iteratively, parents before children.
        let mut stack: Vec<(Option<String>, ImportedPost)> = vec![(None, imported.root)];
        while let Some((parent_id, mut record)) = stack.pop() {
            let replies = std::mem::take(&mut record.replies);
            let created = self.import_post(&thread.id, parent_id, record, report).await?;
            for reply in replies {
                stack.push((Some(created.id.clone()), reply));
            }
        }

        Ok(())
    }

    async fn import_post(
        &self,
        thread_id: &str,
        parent_id: Option<String>,
        record: ImportedPost,
        report: &mut ImportReport,
    ) -> AppResult<post::Model> {
        let author = self.resolve_author(&record.author, report).await?;

        let created = self
            .post_repo
            .create(post::ActiveModel {
                id: Set(self.id_gen.generate()),
                thread_id: Set(thread_id.to_string()),
                parent_id: Set(parent_id),
                author_id: Set(author.id),
                content: Set(record.content),
                content_cleaned: Set(None),
                created_at: Set(record.created_at.into()),
                updated_at: Set(record.created_at.into()),
                edited: Set(None),
                is_deleted: Set(record.is_deleted),
                is_approved: Set(record.is_approved),
                is_flagged: Set(record.is_flagged),
                is_spam: Set(record.is_spam),
                is_highlighted: Set(record.is_highlighted),
            })
            .await?;
        report.posts += 1;

        for url in record.media_urls {
            // Remote originals are not fetched, so dimensions stay
            // unknown.
            self.media_repo
                .create(media::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    post_id: Set(created.id.clone()),
                    url: Set(url),
                    width: Set(0),
                    height: Set(0),
                    created_at: Set(record.created_at.into()),
                })
                .await?;
        }

        self.queue.enqueue_sanitize(&created.id).await?;

        Ok(created)
    }

    /// Find an author by username, then by email, creating the account
    /// when neither matches.
    async fn resolve_author(
        &self,
        author: &ImportedAuthor,
        report: &mut ImportReport,
    ) -> AppResult<user::Model> {
        if let Some(user) = self.user_repo.find_by_username(&author.username).await? {
            return Ok(user);
        }
        if let Some(user) = self.user_repo.find_by_email(&author.email).await? {
            return Ok(user);
        }

        let created = self
            .user_repo
            .create(user::ActiveModel {
                id: Set(self.id_gen.generate()),
                username: Set(author.username.clone()),
                email: Set(author.email.clone()),
                name: Set(author.name.clone()),
                is_moderator: Set(false),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        report.authors_created += 1;

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imported_post_deserializes_with_defaults() {
        let json = r#"{
            "author": {"username": "alice", "email": "alice@example.com", "name": null},
            "content": "<p>hi</p>",
            "created_at": "2016-03-11T21:58:00Z"
        }"#;

        let record: ImportedPost = serde_json::from_str(json).unwrap();
        assert!(record.is_approved);
        assert!(!record.is_deleted);
        assert!(record.replies.is_empty());
        assert!(record.media_urls.is_empty());
    }
}
