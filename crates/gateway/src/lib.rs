//! HTTP API gateway for Fuente.
//!
//! Exposes the chat endpoints (sync and SSE streaming), session inspection,
//! and health checks. Built on Axum.

pub mod api;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use fuente_engine::ChatEngine;
use fuente_providers::{GoogleSearchProvider, HttpPageFetcher, OpenAiCompatGenerator};

pub use api::ApiState;

/// Build the full router: health plus the v1 API.
pub fn build_router(state: Arc<ApiState>) -> Router {
    // Browsers talk to this API from anywhere; the endpoints carry no
    // credentials beyond the request body.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .merge(api::health_router())
        .nest("/v1", api::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server with collaborators built from config.
pub async fn start(config: fuente_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let generator = Arc::new(OpenAiCompatGenerator::from_config(&config.generation)?);

    let search = match GoogleSearchProvider::from_config(&config.search) {
        Some(provider) => Some(Arc::new(provider) as Arc<dyn fuente_core::SearchProvider>),
        None => {
            warn!("Search credentials missing — answers will come from conversation context alone");
            None
        }
    };

    let fetcher = HttpPageFetcher::from_config(&config.fetch)
        .ok()
        .map(|f| Arc::new(f) as Arc<dyn fuente_core::PageFetcher>);

    let store = fuente_session::from_config(&config.session);

    let engine = Arc::new(ChatEngine::new(generator, search, fetcher, store.clone(), &config));
    let state = Arc::new(ApiState::new(engine, store));

    let router = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
