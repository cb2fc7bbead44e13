//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use agora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find a post by ID within a thread, returning an error if not
    /// found.
    pub async fn get_by_id_in_thread(&self, thread_id: &str, id: &str) -> AppResult<post::Model> {
        Post::find_by_id(id)
            .filter(post::Column::ThreadId.eq(thread_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply an update to a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all posts of a thread, oldest first (staff view).
    pub async fn list_in_thread(&self, thread_id: &str) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .order_by_asc(post::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List fully-active posts of a thread, oldest first (public view).
    pub async fn list_active_in_thread(&self, thread_id: &str) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .filter(post::Column::IsDeleted.eq(false))
            .filter(post::Column::IsSpam.eq(false))
            .filter(post::Column::IsApproved.eq(true))
            .order_by_asc(post::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// First root post a moderator resolves a thread through: not
    /// hidden (deleted/spam), or still inside the staff preview
    /// window.
    pub async fn first_staff_post(
        &self,
        thread_id: &str,
        preview_cutoff: DateTime<Utc>,
    ) -> AppResult<Option<post::Model>> {
        let visible = Condition::any()
            .add(
                Condition::all()
                    .add(post::Column::IsDeleted.eq(false))
                    .add(post::Column::IsSpam.eq(false)),
            )
            .add(post::Column::UpdatedAt.gte(preview_cutoff));

        Post::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .filter(post::Column::ParentId.is_null())
            .filter(visible)
            .order_by_asc(post::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// First fully-active root post of a thread (public resolution).
    pub async fn first_active_post(&self, thread_id: &str) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .filter(post::Column::ParentId.is_null())
            .filter(post::Column::IsDeleted.eq(false))
            .filter(post::Column::IsSpam.eq(false))
            .filter(post::Column::IsApproved.eq(true))
            .order_by_asc(post::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether any post replies to the given post.
    pub async fn has_replies(&self, post_id: &str) -> AppResult<bool> {
        let count = Post::find()
            .filter(post::Column::ParentId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Whether the author has at least one approved post, optionally
    /// excluding one post (the post being edited must not vouch for
    /// itself).
    pub async fn author_has_approved_post(
        &self,
        author_id: &str,
        exclude_post_id: Option<&str>,
    ) -> AppResult<bool> {
        let mut query = Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::IsApproved.eq(true));

        if let Some(exclude) = exclude_post_id {
            query = query.filter(post::Column::Id.ne(exclude));
        }

        let count = query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count the non-deleted posts of a thread.
    pub async fn count_non_deleted_in_thread(&self, thread_id: &str) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .filter(post::Column::IsDeleted.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Walk the parent chain from a post up to the thread root.
    ///
    /// The starting post itself is not included.
    pub async fn ancestor_chain(&self, post_id: &str) -> AppResult<Vec<post::Model>> {
        let mut chain = Vec::new();
        let mut current = self.get_by_id(post_id).await?;

        while let Some(parent_id) = current.parent_id.clone() {
            let parent = self.get_by_id(&parent_id).await?;
            current = parent.clone();
            chain.push(parent);
        }

        Ok(chain)
    }

    /// Hard-delete posts soft-deleted before `cutoff`. Votes, media
    /// and attachments go with them via cascading foreign keys.
    /// Returns the number of posts purged.
    pub async fn purge_deleted_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = Post::delete_many()
            .filter(post::Column::IsDeleted.eq(true))
            .filter(post::Column::UpdatedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_post(id: &str, thread_id: &str, parent_id: Option<&str>) -> post::Model {
        post::Model {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            parent_id: parent_id.map(ToString::to_string),
            author_id: "u1".to_string(),
            content: "hello".to_string(),
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

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_first_active_post_found() {
        let root = create_test_post("p1", "t1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[root.clone()]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let found = repo.first_active_post("t1").await.unwrap();

        assert_eq!(found.map(|p| p.id), Some("p1".to_string()));
    }

    #[tokio::test]
    async fn test_ancestor_chain_walks_to_root() {
        let leaf = create_test_post("p3", "t1", Some("p2"));
        let middle = create_test_post("p2", "t1", Some("p1"));
        let root = create_test_post("p1", "t1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    vec![leaf.clone()],
                    vec![middle.clone()],
                    vec![root.clone()],
                ])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let chain = repo.ancestor_chain("p3").await.unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].id, "p2");
        assert_eq!(chain[1].id, "p1");
    }

    #[test]
    fn test_is_active_helper() {
        let mut post = create_test_post("p1", "t1", None);
        assert!(post.is_active());

        post.is_spam = true;
        assert!(!post.is_active());

        post.is_spam = false;
        post.is_approved = false;
        assert!(!post.is_active());
    }
}
