//! Vote repository.

use std::sync::Arc;

use crate::entities::{Vote, vote};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, ModelTrait,
    QueryFilter, QuerySelect,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote a user has cast on a post, if any.
    pub async fn find_by_post_and_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::PostId.eq(post_id))
            .filter(vote::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new vote.
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a vote.
    pub async fn delete(&self, model: vote::Model) -> AppResult<()> {
        model
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Net score of a post: `SUM(mode)` over its votes, 0 when none.
    pub async fn sum_for_post(&self, post_id: &str) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct SumResult {
            total: Option<i64>,
        }

        let result = Vote::find()
            .filter(vote::Column::PostId.eq(post_id))
            .select_only()
            .column_as(vote::Column::Mode.sum(), "total")
            .into_model::<SumResult>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.and_then(|r| r.total).unwrap_or(0))
    }

    /// Votes a user has cast on any of the given posts (UI state for
    /// rendered post lists).
    pub async fn find_by_user_for_posts(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> AppResult<Vec<vote::Model>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::PostId.is_in(post_ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_vote(id: &str, post_id: &str, user_id: &str, mode: i16) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            mode,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_post_and_user_found() {
        let vote = create_test_vote("v1", "p1", "u1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[vote.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let found = repo.find_by_post_and_user("p1", "u1").await.unwrap();

        assert_eq!(found.map(|v| v.mode), Some(1));
    }

    #[tokio::test]
    async fn test_find_by_user_for_posts_empty_input() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let repo = VoteRepository::new(db);
        let votes = repo.find_by_user_for_posts("u1", &[]).await.unwrap();

        assert!(votes.is_empty());
    }
}
