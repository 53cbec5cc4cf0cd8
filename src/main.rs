//! Voltdesk - EV charging technical-support chat backend
//!
//! Routes each chat turn through a fixed priority cascade: diagnostic
//! error-code lookup, scripted conversation flows, keyword intents, and
//! finally a generative fallback.

mod ai;
mod api;
mod catalog;
mod config;
mod db;
mod engine;
mod flow;
mod intent;
mod session;

use api::{create_router, AppState};
use catalog::ErrorCatalog;
use config::Config;
use db::Database;
use engine::ConversationManager;
use flow::FlowGraph;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voltdesk=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Load the read-only indices once; configuration defects refuse startup.
    let catalog = ErrorCatalog::load(&config.error_codes_path, config.bare_code_needs_context)?;
    tracing::info!(
        path = %config.error_codes_path,
        error_codes = catalog.len(),
        "diagnostic catalog loaded"
    );

    let flows = FlowGraph::load(&config.flows_path)?;
    tracing::info!(path = %config.flows_path, nodes = flows.len(), "flow graph loaded");

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    let ai = ai::service_from_config(&config);

    let catalog = Arc::new(catalog);
    let manager = Arc::new(ConversationManager::new(
        catalog.clone(),
        Arc::new(flows),
        Arc::new(db),
        ai,
    ));

    let state = AppState::new(manager, catalog);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(cors).layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Voltdesk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
