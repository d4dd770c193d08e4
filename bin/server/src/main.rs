use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use taskmate_ai::GeminiBackend;
use taskmate_conversation::{Agent, ToolExecutor};
use taskmate_server::app::{AppState, router};
use taskmate_server::config::ServerConfig;
use taskmate_server::db::PostgresTaskStore;
use taskmate_tasks::TaskStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let store: Arc<dyn TaskStore> = Arc::new(PostgresTaskStore::new(db_pool));
    let backend = GeminiBackend::new(config.gemini).expect("invalid Gemini configuration");
    tracing::info!(
        max_tool_rounds = config.agent.max_tool_rounds,
        "Agent configured"
    );
    let agent = Agent::new(
        Arc::new(backend),
        ToolExecutor::new(store.clone()),
        config.agent,
    );

    let cors_origin = HeaderValue::from_str(&config.cors_origin).expect("invalid CORS origin");
    let app = router(AppState::new(store, Arc::new(agent)), cors_origin);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
