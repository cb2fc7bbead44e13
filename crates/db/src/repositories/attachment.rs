//! Attachment repository.

use std::sync::Arc;

use crate::entities::{Attachment, attachment};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Attachment repository for database operations.
#[derive(Clone)]
pub struct AttachmentRepository {
    db: Arc<DatabaseConnection>,
}

impl AttachmentRepository {
    /// Create a new attachment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new attachment record.
    pub async fn create(&self, model: attachment::ActiveModel) -> AppResult<attachment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List attachments of a post.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<attachment::Model>> {
        Attachment::find()
            .filter(attachment::Column::PostId.eq(post_id))
            .order_by_asc(attachment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count attachments of a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Attachment::find()
            .filter(attachment::Column::PostId.eq(post_id))
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
        let item = attachment::Model {
            id: "a1".to_string(),
            post_id: "p1".to_string(),
            url: "https://files.example/report.pdf".to_string(),
            name: "report.pdf".to_string(),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[item.clone()]])
                .into_connection(),
        );

        let repo = AttachmentRepository::new(db);
        let found = repo.list_for_post("p1").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "report.pdf");
    }
}
