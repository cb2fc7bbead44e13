//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_thread_table;
mod m20250101_000003_create_post_table;
mod m20250101_000004_create_vote_table;
mod m20250101_000005_create_media_table;
mod m20250101_000006_create_attachment_table;

/// Migrator that runs all migrations in order.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_thread_table::Migration),
            Box::new(m20250101_000003_create_post_table::Migration),
            Box::new(m20250101_000004_create_vote_table::Migration),
            Box::new(m20250101_000005_create_media_table::Migration),
            Box::new(m20250101_000006_create_attachment_table::Migration),
        ]
    }
}
