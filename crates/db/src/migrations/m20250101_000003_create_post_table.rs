//! Create post table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Post::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Post::ThreadId).string_len(32).not_null())
                    .col(ColumnDef::new(Post::ParentId).string_len(32).null())
                    .col(ColumnDef::new(Post::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Post::Content).text().not_null())
                    .col(ColumnDef::new(Post::ContentCleaned).text().null())
                    .col(
                        ColumnDef::new(Post::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Post::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Post::Edited)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Post::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Post::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Post::IsFlagged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Post::IsSpam)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Post::IsHighlighted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_thread")
                            .from(Post::Table, Post::ThreadId)
                            .to(Thread::Table, Thread::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_parent")
                            .from(Post::Table, Post::ParentId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_author")
                            .from(Post::Table, Post::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: thread_id (posts are always listed per thread)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_thread_id")
                    .table(Post::Table)
                    .col(Post::ThreadId)
                    .to_owned(),
            )
            .await?;

        // Index: parent_id (reply lookups and ancestor walks)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_parent_id")
                    .table(Post::Table)
                    .col(Post::ParentId)
                    .to_owned(),
            )
            .await?;

        // Index: (author_id, is_approved) - author trust lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_post_author_approved")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .col(Post::IsApproved)
                    .to_owned(),
            )
            .await?;

        // Index: (is_deleted, updated_at) - purge scans
        manager
            .create_index(
                Index::create()
                    .name("idx_post_deleted_updated")
                    .table(Post::Table)
                    .col(Post::IsDeleted)
                    .col(Post::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
    ThreadId,
    ParentId,
    AuthorId,
    Content,
    ContentCleaned,
    CreatedAt,
    UpdatedAt,
    Edited,
    IsDeleted,
    IsApproved,
    IsFlagged,
    IsSpam,
    IsHighlighted,
}

#[derive(Iden)]
enum Thread {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
