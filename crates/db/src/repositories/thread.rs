//! Thread repository.

use std::sync::Arc;

use crate::entities::{Post, Thread, post, thread};
use agora_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};

/// Which threads to list with respect to their closed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadFilter {
    /// Only open threads.
    #[default]
    Open,
    /// Only closed threads.
    Closed,
    /// Open and closed threads.
    All,
}

impl ThreadFilter {
    /// Parse a filter from its URL value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Thread repository for database operations.
#[derive(Clone)]
pub struct ThreadRepository {
    db: Arc<DatabaseConnection>,
}

impl ThreadRepository {
    /// Create a new thread repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a thread by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<thread::Model>> {
        Thread::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a thread by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<thread::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ThreadNotFound(id.to_string()))
    }

    /// Find a thread by ID within a category.
    pub async fn find_by_id_in_category(
        &self,
        id: &str,
        category: thread::Category,
    ) -> AppResult<Option<thread::Model>> {
        Thread::find_by_id(id)
            .filter(thread::Column::Category.eq(category))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new thread.
    pub async fn create(&self, model: thread::ActiveModel) -> AppResult<thread::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the closed state and bump the modification timestamp.
    pub async fn set_closed(&self, id: &str, closed: bool) -> AppResult<thread::Model> {
        let active = thread::ActiveModel {
            id: Set(id.to_string()),
            is_closed: Set(closed),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Bump the modification timestamp.
    pub async fn touch(&self, id: &str) -> AppResult<()> {
        let active = thread::ActiveModel {
            id: Set(id.to_string()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List threads in a category visible to moderators.
    ///
    /// A thread is listed when it has a root post that is either not
    /// hidden (deleted/spam), or was modified after `preview_cutoff`
    /// (the staff preview window). Deleted threads are included.
    pub async fn list_for_staff(
        &self,
        category: thread::Category,
        filter: ThreadFilter,
        preview_cutoff: DateTime<Utc>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<thread::Model>> {
        let root_post_visible = Condition::any()
            .add(
                Condition::all()
                    .add(post::Column::IsDeleted.eq(false))
                    .add(post::Column::IsSpam.eq(false)),
            )
            .add(post::Column::UpdatedAt.gte(preview_cutoff));

        let query = Thread::find()
            .filter(thread::Column::Category.eq(category))
            .join(JoinType::InnerJoin, thread::Relation::Post.def())
            .filter(post::Column::ParentId.is_null())
            .filter(root_post_visible)
            .distinct();

        Self::apply_filter(query, filter)
            .order_by_desc(thread::Column::UpdatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List threads in a category visible to ordinary and anonymous
    /// viewers.
    ///
    /// Deleted threads are excluded, and a thread is listed only when
    /// its root post is fully active (approved, not deleted, not spam).
    pub async fn list_for_public(
        &self,
        category: thread::Category,
        filter: ThreadFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<thread::Model>> {
        let query = Thread::find()
            .filter(thread::Column::Category.eq(category))
            .filter(thread::Column::IsDeleted.eq(false))
            .join(JoinType::InnerJoin, thread::Relation::Post.def())
            .filter(post::Column::ParentId.is_null())
            .filter(post::Column::IsDeleted.eq(false))
            .filter(post::Column::IsSpam.eq(false))
            .filter(post::Column::IsApproved.eq(true))
            .distinct();

        Self::apply_filter(query, filter)
            .order_by_desc(thread::Column::UpdatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn apply_filter(
        query: sea_orm::Select<Thread>,
        filter: ThreadFilter,
    ) -> sea_orm::Select<Thread> {
        match filter {
            ThreadFilter::Open => query.filter(thread::Column::IsClosed.eq(false)),
            ThreadFilter::Closed => query.filter(thread::Column::IsClosed.eq(true)),
            ThreadFilter::All => query,
        }
    }

    /// Hard-delete soft-deleted threads older than `cutoff` that have
    /// zero remaining posts. Returns the number of threads purged.
    ///
    /// Candidates are re-checked one by one so the purge stays correct
    /// when posts are created concurrently with the scan.
    pub async fn purge_deleted_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let candidates = Thread::find()
            .filter(thread::Column::IsDeleted.eq(true))
            .filter(thread::Column::UpdatedAt.lt(cutoff))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut purged = 0;
        for candidate in candidates {
            let remaining = Post::find()
                .filter(post::Column::ThreadId.eq(candidate.id.as_str()))
                .count(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if remaining == 0 {
                candidate
                    .delete(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                purged += 1;
            }
        }

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_thread(id: &str, category: thread::Category) -> thread::Model {
        thread::Model {
            id: id.to_string(),
            category,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            is_closed: false,
            is_deleted: false,
        }
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(ThreadFilter::parse("open"), Some(ThreadFilter::Open));
        assert_eq!(ThreadFilter::parse("closed"), Some(ThreadFilter::Closed));
        assert_eq!(ThreadFilter::parse("all"), Some(ThreadFilter::All));
        assert_eq!(ThreadFilter::parse("bogus"), None);
    }

    #[tokio::test]
    async fn test_find_by_id_in_category() {
        let thread = create_test_thread("t1", thread::Category::Issue);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[thread.clone()]])
                .into_connection(),
        );

        let repo = ThreadRepository::new(db);
        let found = repo
            .find_by_id_in_category("t1", thread::Category::Issue)
            .await
            .unwrap();

        assert_eq!(found.map(|t| t.id), Some("t1".to_string()));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<thread::Model>::new()])
                .into_connection(),
        );

        let repo = ThreadRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::ThreadNotFound(_))));
    }
}
