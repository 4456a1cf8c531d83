// Main entry point for the marketplace API server

use anyhow::{Context, Result};
use marketplace_core::domains::scraper_jobs::actions::sweep_orphaned_jobs;
use marketplace_core::kernel::ServerDeps;
use marketplace_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketplace_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Vehicle Export Marketplace API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        interpreter = %config.scraper.interpreter,
        batch_script = %config.scraper.batch_script.display(),
        clean_exit_policy = ?config.scraper.clean_exit_policy,
        max_concurrent_jobs = ?config.scraper.max_concurrent_jobs,
        "Configuration loaded"
    );

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let server_deps = ServerDeps::postgres(pool.clone(), config.scraper.clone());

    // Children of a previous process are unreachable now
    if config.sweep_orphaned_jobs {
        sweep_orphaned_jobs(&server_deps)
            .await
            .context("Failed to sweep orphaned scraper jobs")?;
    }

    let app = build_app(server_deps, Some(pool), &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
