//! Notification resolution and templating.
//!
//! Notifications run in two stages on the queue: a fan-out job
//! resolves the recipient set at execution time, then enqueues one
//! email job per recipient so a failing address never blocks the
//! others. This service holds the resolution and rendering logic both
//! stages share.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use agora_common::AppResult;
use agora_db::entities::{post, thread, user};
use agora_db::repositories::{PostRepository, ThreadRepository, UserRepository};

/// What happened to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A post awaits moderator review.
    ApprovalPending,
    /// Votes pushed a post over the flag threshold.
    Flagged,
    /// Votes pushed a post over the highlight threshold.
    Highlighted,
    /// A moderator approved the post.
    Approved,
    /// An approved reply landed under a post.
    NewReply,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ApprovalPending => "approval_pending",
            Self::Flagged => "flagged",
            Self::Highlighted => "highlighted",
            Self::Approved => "approved",
            Self::NewReply => "new_reply",
        };
        write!(f, "{s}")
    }
}

/// A notification event, addressed to a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// The affected post.
    pub post_id: String,
    /// What happened.
    pub kind: NotificationKind,
}

impl NotificationEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(post_id: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            post_id: post_id.into(),
            kind,
        }
    }
}

/// Collect the distinct ancestor author IDs of a parent chain, walk
/// order preserved. A user who authored several ancestors appears
/// once.
#[must_use]
pub fn dedupe_ancestor_authors(chain: &[post::Model]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut authors = Vec::new();
    for ancestor in chain {
        if seen.insert(ancestor.author_id.clone()) {
            authors.push(ancestor.author_id.clone());
        }
    }
    authors
}

/// Notification service: recipient resolution and message rendering.
#[derive(Clone)]
pub struct NotificationService {
    user_repo: UserRepository,
    post_repo: PostRepository,
    thread_repo: ThreadRepository,
    site_name: String,
    base_url: String,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        post_repo: PostRepository,
        thread_repo: ThreadRepository,
        site_name: String,
        base_url: String,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            thread_repo,
            site_name,
            base_url,
        }
    }

    /// Resolve the recipients of an event against current state.
    ///
    /// Runs when the fan-out job executes, so permission changes and
    /// moderation reversals between enqueue and execution are honored:
    /// an "approved" notification for a post that has been disapproved
    /// again resolves to nobody.
    pub async fn resolve_recipients(&self, event: &NotificationEvent) -> AppResult<Vec<user::Model>> {
        match event.kind {
            NotificationKind::ApprovalPending
            | NotificationKind::Flagged
            | NotificationKind::Highlighted => self.user_repo.find_moderators().await,
            NotificationKind::Approved => {
                let post = self.post_repo.get_by_id(&event.post_id).await?;
                if !post.is_approved {
                    return Ok(Vec::new());
                }
                Ok(vec![self.user_repo.get_by_id(&post.author_id).await?])
            }
            NotificationKind::NewReply => {
                let post = self.post_repo.get_by_id(&event.post_id).await?;
                if !post.is_approved {
                    return Ok(Vec::new());
                }
                let chain = self.post_repo.ancestor_chain(&post.id).await?;
                let mut recipients = Vec::new();
                for author_id in dedupe_ancestor_authors(&chain) {
                    recipients.push(self.user_repo.get_by_id(&author_id).await?);
                }
                Ok(recipients)
            }
        }
    }

    /// Deep link to a post inside its thread.
    #[must_use]
    pub fn post_url(&self, category: thread::Category, thread_id: &str, post_id: &str) -> String {
        format!(
            "{}/comments/{}/{}/#post-{}",
            self.base_url.trim_end_matches('/'),
            category.as_path_segment(),
            thread_id,
            post_id
        )
    }

    /// Resolve the deep link for an event's post.
    pub async fn resolve_post_url(&self, post_id: &str) -> AppResult<String> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let thread = self.thread_repo.get_by_id(&post.thread_id).await?;
        Ok(self.post_url(thread.category, &thread.id, &post.id))
    }

    /// Render the subject and body of a notification email.
    #[must_use]
    pub fn render(&self, kind: NotificationKind, post_url: &str) -> (String, String) {
        let site = &self.site_name;
        match kind {
            NotificationKind::ApprovalPending => (
                format!("{site} - Post approval pending"),
                format!(
                    "A new comment on {site} has just been posted, you can approve it at the following location:\n\n{post_url}"
                ),
            ),
            NotificationKind::Flagged => (
                format!("{site} - Post has been flagged"),
                format!(
                    "A comment on {site} has just been flagged, you can review it at the following location:\n\n{post_url}"
                ),
            ),
            NotificationKind::Highlighted => (
                format!("{site} - Post has been highlighted"),
                format!(
                    "A comment on {site} has just been highlighted, you can review it at the following location:\n\n{post_url}"
                ),
            ),
            NotificationKind::Approved => (
                format!("{site} - Post approved"),
                format!(
                    "Your comment on {site} has just been approved, you can view it at the following location:\n\n{post_url}"
                ),
            ),
            NotificationKind::NewReply => (
                format!("{site} - New reply to your post"),
                format!(
                    "A new reply to your comment on {site} has just been posted, you can view it at the following location:\n\n{post_url}"
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chain_post(id: &str, author_id: &str, parent_id: Option<&str>) -> post::Model {
        post::Model {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            parent_id: parent_id.map(ToString::to_string),
            author_id: author_id.to_string(),
            content: String::new(),
            content_cleaned: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            edited: None,
            is_deleted: false,
            is_approved: true,
            is_flagged: false,
            is_spam: false,
            is_highlighted: false,
        }
    }

    #[test]
    fn test_same_author_chain_collapses_to_one() {
        // root <- reply1 <- reply2, all by the same user
        let chain = vec![
            chain_post("p3", "u1", Some("p2")),
            chain_post("p2", "u1", Some("p1")),
            chain_post("p1", "u1", None),
        ];
        assert_eq!(dedupe_ancestor_authors(&chain), vec!["u1".to_string()]);
    }

    #[test]
    fn test_distinct_authors_keep_walk_order() {
        let chain = vec![
            chain_post("p3", "u2", Some("p2")),
            chain_post("p2", "u3", Some("p1")),
            chain_post("p1", "u2", None),
        ];
        assert_eq!(
            dedupe_ancestor_authors(&chain),
            vec!["u2".to_string(), "u3".to_string()]
        );
    }

    #[test]
    fn test_empty_chain_has_no_recipients() {
        assert!(dedupe_ancestor_authors(&[]).is_empty());
    }
}
