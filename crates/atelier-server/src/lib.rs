//! Atelier HTTP surface
//!
//! Thin axum layer over the generation pipeline. Pipeline calls block, so
//! every handler moves its work onto the blocking pool.

pub mod error;
pub mod routes;
mod state;

use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Build the application router with its middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::variations::router())
        .merge(routes::generate::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(provider = state.service.name(), "Starting server on {addr}");
    axum::serve(listener, router(state)).await
}
