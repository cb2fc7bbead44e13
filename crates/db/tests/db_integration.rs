//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `agora_test`)
//!   `TEST_DB_PASSWORD` (default: `agora_test`)
//!   `TEST_DB_NAME` (default: `agora_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use agora_db::entities::{post, thread, user, vote};
use agora_db::repositories::{PostRepository, ThreadRepository, UserRepository, VoteRepository};
use agora_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::{Duration, Utc};
use sea_orm::Set;

fn user_model(id: &str, username: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        name: Set(None),
        is_moderator: Set(false),
        created_at: Set(Utc::now().into()),
    }
}

fn thread_model(id: &str) -> thread::ActiveModel {
    thread::ActiveModel {
        id: Set(id.to_string()),
        category: Set(thread::Category::Discussion),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
        is_closed: Set(false),
        is_deleted: Set(false),
    }
}

fn post_model(id: &str, thread_id: &str, author_id: &str) -> post::ActiveModel {
    post::ActiveModel {
        id: Set(id.to_string()),
        thread_id: Set(thread_id.to_string()),
        parent_id: Set(None),
        author_id: Set(author_id.to_string()),
        content: Set("hello".to_string()),
        content_cleaned: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
        edited: Set(None),
        is_deleted: Set(false),
        is_approved: Set(true),
        is_flagged: Set(false),
        is_spam: Set(false),
        is_highlighted: Set(false),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_post_round_trip_and_vote_sum() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::new(db.conn.clone());

    let users = UserRepository::new(Arc::clone(&conn));
    let threads = ThreadRepository::new(Arc::clone(&conn));
    let posts = PostRepository::new(Arc::clone(&conn));
    let votes = VoteRepository::new(Arc::clone(&conn));

    users.create(user_model("u1", "alice")).await.unwrap();
    users.create(user_model("u2", "bob")).await.unwrap();
    threads.create(thread_model("t1")).await.unwrap();
    posts.create(post_model("p1", "t1", "u1")).await.unwrap();

    assert_eq!(votes.sum_for_post("p1").await.unwrap(), 0);

    votes
        .create(vote::ActiveModel {
            id: Set("v1".to_string()),
            post_id: Set("p1".to_string()),
            user_id: Set("u2".to_string()),
            mode: Set(vote::VOTE_DOWN),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    assert_eq!(votes.sum_for_post("p1").await.unwrap(), -1);

    let first = posts.first_active_post("t1").await.unwrap();
    assert_eq!(first.map(|p| p.id), Some("p1".to_string()));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_purge_respects_age_and_remaining_posts() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::new(db.conn.clone());

    let users = UserRepository::new(Arc::clone(&conn));
    let threads = ThreadRepository::new(Arc::clone(&conn));
    let posts = PostRepository::new(Arc::clone(&conn));

    users.create(user_model("u1", "alice")).await.unwrap();
    threads.create(thread_model("t1")).await.unwrap();

    let mut stale = post_model("p1", "t1", "u1");
    stale.is_deleted = Set(true);
    stale.updated_at = Set((Utc::now() - Duration::days(2)).into());
    posts.create(stale).await.unwrap();

    let purged = posts
        .purge_deleted_before(Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);

    // The thread is now empty; an aged soft-deleted thread goes too.
    let mut aged = thread_model("t2");
    aged.is_deleted = Set(true);
    aged.updated_at = Set((Utc::now() - Duration::days(2)).into());
    threads.create(aged).await.unwrap();

    let purged = threads
        .purge_deleted_before(Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(purged, 1);

    db.drop_database().await.unwrap();
}
