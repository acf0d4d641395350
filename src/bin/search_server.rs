//! search_server - REST server for cash-management search.
//!
//! Reads config from the environment (see `cash_search::config`):
//!   DATABASE_URL          - Postgres connection string (required)
//!   CASH_SEARCH_CONFIG    - optional YAML config file
//!   CASH_SEARCH_BIND_ADDR - listen address (default: 0.0.0.0:8080)
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/cash cargo run --bin search_server
//!
//! curl -X POST http://localhost:8080/api/search \
//!   -H "Content-Type: application/json" \
//!   -d '{"query": "wire transfer", "page": 0, "size": 10}'
//! curl "http://localhost:8080/api/search/autocomplete?prefix=acm"
//! curl "http://localhost:8080/api/search/fuzzy?query=paymemt&threshold=0.3"
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use cash_search::{api, PgSearchBackend, SearchConfig, SearchGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cash_search=debug,tower_http=debug".into()),
        )
        .init();

    let config = SearchConfig::load().context("failed to load configuration")?;
    config
        .database
        .connection_url()
        .context("database connection string missing")?;

    tracing::info!(
        schema = %config.database.schema,
        max_page_size = config.limits.max_page_size,
        "Configuration loaded"
    );

    let backend = PgSearchBackend::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let gateway = Arc::new(SearchGateway::new(
        Arc::new(backend),
        config.limits.clone(),
    ));
    let app = api::build_router(gateway);

    let bind_addr = &config.server.bind_addr;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!("search_server listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("search_server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
