//! Agora-rs worker daemon entry point.
//!
//! Runs the background tier: sanitize and notification workers over
//! the Redis job queue, plus the periodic purge scheduler. The HTTP
//! tier is an external collaborator and wires the same services
//! against the same queue.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora_common::Config;
use agora_core::{
    EmailService, ModerationService, NoOpQueue, NotificationService, QueueService,
};
use agora_db::repositories::{PostRepository, ThreadRepository, UserRepository};
use agora_queue::workers::{
    NotificationContext, SanitizeContext, notification_email_worker, notification_fanout_worker,
    sanitize_worker,
};
use agora_queue::{
    NotificationEmailJob, NotificationFanoutJob, SanitizeJob, SchedulerConfig, run_scheduler,
};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
#[allow(clippy::expect_used)] // startup failures are fatal by design
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug".into()),
        )
        .init();

    info!("Starting agora-rs worker daemon...");

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = agora_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    agora_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis and initialize job storages
    info!("Connecting to Redis...");
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).expect("Failed to create Redis client");
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .expect("Failed to connect to Redis");
    let sanitize_storage = apalis_redis::RedisStorage::<SanitizeJob>::new(redis_conn.clone());
    let fanout_storage =
        apalis_redis::RedisStorage::<NotificationFanoutJob>::new(redis_conn.clone());
    let email_storage = apalis_redis::RedisStorage::<NotificationEmailJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let thread_repo = ThreadRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));

    // Initialize services used by the workers. The purge path never
    // enqueues follow-up jobs, so the moderation service here runs
    // with a no-op queue.
    let email_service = EmailService::from_config(config.email.as_ref())?;
    if !email_service.is_enabled() {
        info!("Outbound email not configured, notifications will be dropped");
    }
    let notification_service = NotificationService::new(
        user_repo,
        post_repo.clone(),
        thread_repo.clone(),
        config.server.site_name.clone(),
        config.server.url.clone(),
    );
    let purge_queue: QueueService = Arc::new(NoOpQueue);
    let moderation_service = Arc::new(ModerationService::new(
        Arc::clone(&db),
        thread_repo,
        post_repo.clone(),
        purge_queue,
        config.moderation.clone(),
    ));

    // Start the purge scheduler
    let scheduler_config = SchedulerConfig {
        purge_interval: Duration::from_secs(config.moderation.purge_interval_secs),
    };
    run_scheduler(&scheduler_config, moderation_service);
    info!("Purge scheduler started");

    // Start workers
    let sanitize_ctx = SanitizeContext::new(post_repo);
    let notification_ctx = NotificationContext::new(
        notification_service,
        email_service,
        email_storage.clone(),
    );
    let fanout_ctx = notification_ctx.clone();

    info!("Starting workers...");
    let monitor = Monitor::new()
        .register(
            WorkerBuilder::new("sanitize")
                .data(sanitize_ctx)
                .backend(sanitize_storage)
                .build_fn(sanitize_worker),
        )
        .register(
            WorkerBuilder::new("notification-fanout")
                .data(fanout_ctx)
                .backend(fanout_storage)
                .build_fn(notification_fanout_worker),
        )
        .register(
            WorkerBuilder::new("notification-email")
                .data(notification_ctx)
                .backend(email_storage)
                .build_fn(notification_email_worker),
        );

    tokio::select! {
        result = monitor.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker monitor failed");
            }
        }
        () = shutdown_signal() => {}
    }

    info!("Worker daemon shutdown complete");
    Ok(())
}
