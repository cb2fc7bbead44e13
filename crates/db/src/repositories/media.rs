//! Media repository.

use std::sync::Arc;

use crate::entities::{Media, media};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Media repository for database operations.
#[derive(Clone)]
pub struct MediaRepository {
    db: Arc<DatabaseConnection>,
}

impl MediaRepository {
    /// Create a new media repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new media record.
    pub async fn create(&self, model: media::ActiveModel) -> AppResult<media::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List media attached to a post.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<media::Model>> {
        Media::find()
            .filter(media::Column::PostId.eq(post_id))
            .order_by_asc(media::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count media attached to a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Media::find()
            .filter(media::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_list_for_post() {
        let item = media::Model {
            id: "m1".to_string(),
            post_id: "p1".to_string(),
            url: "https://files.example/m1.png".to_string(),
            width: 640,
            height: 480,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[item.clone()]])
                .into_connection(),
        );

        let repo = MediaRepository::new(db);
        let found = repo.list_for_post("p1").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].width, 640);
    }
}
