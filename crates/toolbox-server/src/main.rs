use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use toolbox_bindings::{HttpEmbeddingBackend, PgStore, ReqwestHttpClient};
use toolbox_core::ExecutionContext;
use toolbox_mcp::{McpEngine, ToolRegistry};
use toolbox_server::app_state::{AppState, OpenAiSettings};
use toolbox_server::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load()?;
    let timeout = Duration::from_secs(config.outbound_timeout_secs);

    let http = ReqwestHttpClient::new(timeout)?;
    let mut context = ExecutionContext::new(config.greeting.as_str()).with_http(Arc::new(http));

    if let Some(database_url) = &config.database_url {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to database")?;

        let store = PgStore::new(pool);
        store.migrate().await.context("failed to run migrations")?;

        let store = Arc::new(store);
        context = context
            .with_kv(store.clone())
            .with_rows(store.clone())
            .with_blobs(store.clone())
            .with_counters(store);
    } else {
        tracing::warn!("DATABASE_URL not set; storage tools and routes will report not configured");
    }

    let registry = ToolRegistry::builtin()?;
    tracing::info!(tools = registry.len(), "tool registry loaded");

    let mut state = AppState::new(McpEngine::new(Arc::new(registry), context)).with_openai(
        OpenAiSettings {
            api_key: config.openai_api_key.clone(),
            embedding_model: config.embedding_model.clone(),
        },
    );

    if let Some((base_url, token)) = config.embedding_endpoint() {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build embedding client")?;
        state = state.with_embeddings(Arc::new(HttpEmbeddingBackend::new(client, base_url, token)));
    }

    let app = toolbox_server::router::create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("toolbox server listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
