//! Visibility policy.
//!
//! Decides, per viewer class, which threads and posts are queryable
//! and which post a thread resolves through. Moderators see hidden
//! content; everyone else only sees fully-active posts in non-deleted
//! threads. The staff preview window applies to moderators only: a
//! root post modified within the window keeps its thread listed for
//! moderation even while unapproved.

use chrono::{DateTime, Duration, Utc};

use agora_common::{AppError, AppResult, config::ModerationConfig};
use agora_db::entities::{post, thread};
use agora_db::repositories::{PostRepository, ThreadFilter, ThreadRepository};

/// A viewer and their privilege.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// The viewing user, if authenticated.
    pub user_id: Option<String>,
    /// Whether the viewer holds moderation permission.
    pub can_moderate: bool,
}

impl Viewer {
    /// An unauthenticated viewer.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user_id: None,
            can_moderate: false,
        }
    }

    /// An ordinary authenticated viewer.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            can_moderate: false,
        }
    }

    /// A viewer with moderation permission.
    #[must_use]
    pub fn moderator(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            can_moderate: true,
        }
    }
}

/// How a (category, thread id) lookup resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadResolution {
    /// The thread is visible under the requested category.
    Found(thread::Model),
    /// The thread exists under a different category; callers should
    /// redirect to its canonical location.
    Moved {
        /// The thread's actual category.
        category: thread::Category,
        /// The thread ID.
        thread_id: String,
    },
}

/// A resolved thread together with its viewer-visible posts.
#[derive(Debug, Clone)]
pub struct ThreadPage {
    /// The thread.
    pub thread: thread::Model,
    /// The post the thread resolves through for this viewer.
    pub first_post: post::Model,
    /// All posts visible to this viewer, oldest first.
    pub posts: Vec<post::Model>,
}

/// Whether a single post is visible to a viewer.
#[must_use]
pub fn post_visible(viewer: &Viewer, post: &post::Model) -> bool {
    viewer.can_moderate || post.is_active()
}

/// Visibility service: viewer-aware thread and post queries.
#[derive(Clone)]
pub struct VisibilityService {
    thread_repo: ThreadRepository,
    post_repo: PostRepository,
    config: ModerationConfig,
}

impl VisibilityService {
    /// Create a new visibility service.
    #[must_use]
    pub const fn new(
        thread_repo: ThreadRepository,
        post_repo: PostRepository,
        config: ModerationConfig,
    ) -> Self {
        Self {
            thread_repo,
            post_repo,
            config,
        }
    }

    fn preview_cutoff(&self) -> DateTime<Utc> {
        Utc::now() - Duration::hours(self.config.staff_preview_hours)
    }

    /// List threads in a category for a viewer. Pagination is passed
    /// through untouched.
    pub async fn list_threads(
        &self,
        category: thread::Category,
        filter: ThreadFilter,
        viewer: &Viewer,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<thread::Model>> {
        if viewer.can_moderate {
            self.thread_repo
                .list_for_staff(category, filter, self.preview_cutoff(), limit, offset)
                .await
        } else {
            self.thread_repo
                .list_for_public(category, filter, limit, offset)
                .await
        }
    }

    /// Resolve a thread by (category, id) for a viewer.
    ///
    /// A thread hidden from this viewer is indistinguishable from a
    /// missing one; a thread that exists under another category
    /// resolves to [`ThreadResolution::Moved`] so callers can redirect
    /// to the canonical location.
    pub async fn resolve_thread(
        &self,
        category: thread::Category,
        thread_id: &str,
        viewer: &Viewer,
    ) -> AppResult<ThreadResolution> {
        if let Some(thread) = self
            .thread_repo
            .find_by_id_in_category(thread_id, category)
            .await?
        {
            if self.thread_visible(&thread, viewer).await? {
                return Ok(ThreadResolution::Found(thread));
            }
        }

        match self.thread_repo.find_by_id(thread_id).await? {
            Some(other) if other.category != category => Ok(ThreadResolution::Moved {
                category: other.category,
                thread_id: other.id,
            }),
            _ => Err(AppError::ThreadNotFound(thread_id.to_string())),
        }
    }

    async fn thread_visible(&self, thread: &thread::Model, viewer: &Viewer) -> AppResult<bool> {
        if viewer.can_moderate {
            let first = self
                .post_repo
                .first_staff_post(&thread.id, self.preview_cutoff())
                .await?;
            return Ok(first.is_some());
        }

        if thread.is_deleted {
            return Ok(false);
        }
        let first = self.post_repo.first_active_post(&thread.id).await?;
        Ok(first.is_some())
    }

    /// The post a thread resolves through for this viewer.
    ///
    /// A thread holding only pending or deleted posts has no
    /// qualifying first post; that is a distinct not-found condition,
    /// never a silent empty thread.
    pub async fn first_post(&self, thread_id: &str, viewer: &Viewer) -> AppResult<post::Model> {
        let first = if viewer.can_moderate {
            self.post_repo
                .first_staff_post(thread_id, self.preview_cutoff())
                .await?
        } else {
            self.post_repo.first_active_post(thread_id).await?
        };

        first.ok_or_else(|| AppError::PostNotFound(format!("thread {thread_id} first post")))
    }

    /// Resolve a thread and its visible posts in one step.
    pub async fn thread_page(
        &self,
        category: thread::Category,
        thread_id: &str,
        viewer: &Viewer,
    ) -> AppResult<ThreadPage> {
        let thread = match self.resolve_thread(category, thread_id, viewer).await? {
            ThreadResolution::Found(thread) => thread,
            ThreadResolution::Moved {
                category,
                thread_id,
            } => {
                return Err(AppError::ThreadNotFound(format!(
                    "thread {thread_id} moved to {category}"
                )));
            }
        };

        let first_post = self.first_post(&thread.id, viewer).await?;
        let posts = if viewer.can_moderate {
            self.post_repo.list_in_thread(&thread.id).await?
        } else {
            self.post_repo.list_active_in_thread(&thread.id).await?
        };

        Ok(ThreadPage {
            thread,
            first_post,
            posts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_post(approved: bool, deleted: bool, spam: bool) -> post::Model {
        post::Model {
            id: "p1".to_string(),
            thread_id: "t1".to_string(),
            parent_id: None,
            author_id: "u1".to_string(),
            content: String::new(),
            content_cleaned: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            edited: None,
            is_deleted: deleted,
            is_approved: approved,
            is_flagged: false,
            is_spam: spam,
            is_highlighted: false,
        }
    }

    #[test]
    fn test_moderator_sees_everything() {
        let viewer = Viewer::moderator("m1");
        assert!(post_visible(&viewer, &test_post(false, true, true)));
    }

    #[test]
    fn test_public_needs_fully_active() {
        let viewer = Viewer::anonymous();
        assert!(post_visible(&viewer, &test_post(true, false, false)));
        assert!(!post_visible(&viewer, &test_post(false, false, false)));
        assert!(!post_visible(&viewer, &test_post(true, true, false)));
        assert!(!post_visible(&viewer, &test_post(true, false, true)));
    }

    #[test]
    fn test_ordinary_user_is_not_privileged() {
        let viewer = Viewer::user("u2");
        assert!(!post_visible(&viewer, &test_post(false, false, false)));
    }
}
