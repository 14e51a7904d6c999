use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collabdoc::{api, config::ServerConfig, state::AppState, store};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabdoc=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting collabdoc...");

    let config = ServerConfig::from_env();

    let document_store = match store::open(config.data_dir.clone()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open document store: {}", e);
            std::process::exit(1);
        }
    };

    let state =
        Arc::new(AppState::new(document_store).with_outbound_capacity(config.outbound_capacity));
    let app = api::router(state, config.cors_layer());

    let addr = config.server_address();
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Editor WebSocket at ws://{}/ws/editor/{{documentId}}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
