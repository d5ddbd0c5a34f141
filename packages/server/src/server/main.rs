// Main entry point for the job sync server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::{
    domains::jobs::{PgListingStore, SourceRegistry},
    kernel::{http_triggers, scheduled_syncs, start_scheduler},
    server::{build_app, AppState},
    Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting remote job sync server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Job boards
    let registry = SourceRegistry::live(config.fetch.http_timeout, config.fetch.requests_per_second)
        .context("Failed to build job source clients")?;

    // Sync triggers (scheduled and manual share the same bindings)
    let trigger_client = reqwest::Client::builder()
        .timeout(config.sync_trigger_timeout)
        .build()
        .context("Failed to build sync trigger client")?;
    let triggers = http_triggers(&config, &trigger_client);
    let _scheduler = start_scheduler(scheduled_syncs(&config, &triggers))
        .await
        .context("Failed to start scheduler")?;

    // Build application
    let state = AppState::new(Arc::new(PgListingStore::new(pool)), registry)
        .with_sources(config.sources.clone())
        .with_triggers(triggers)
        .with_ai_binding(config.ai.is_some());
    let app = build_app(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
