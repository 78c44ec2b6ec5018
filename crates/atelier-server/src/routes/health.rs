use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use atelier_gen::ProviderStatus;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    /// Whether the provider has a usable API key
    pub provider_ready: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.service.name().to_string(),
        provider_ready: state.service.health_check() == ProviderStatus::Available,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
