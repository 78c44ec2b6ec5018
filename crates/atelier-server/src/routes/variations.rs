//! POST /variations: expand one prompt into a list of prompts

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use atelier_gen::variations::expand_variations;
use atelier_gen::{AssetKind, MAX_VARIATIONS};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_COUNT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct VariationsBody {
    pub prompt: Option<String>,
    pub count: Option<usize>,
    /// Asset kind the variations are meant for; defaults to sticker
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VariationsResponse {
    pub variations: Vec<String>,
}

async fn create_variations(
    State(state): State<AppState>,
    body: Result<Json<VariationsBody>, JsonRejection>,
) -> ApiResult<Json<VariationsResponse>> {
    let Json(body) = body?;

    let prompt = body
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Prompt is required".to_string()))?;
    let count = body.count.unwrap_or(DEFAULT_COUNT);
    if !(1..=MAX_VARIATIONS).contains(&count) {
        return Err(ApiError::BadRequest(format!(
            "Count must be between 1 and {}",
            MAX_VARIATIONS
        )));
    }
    let kind = match body.kind {
        Some(k) => k.parse::<AssetKind>()?,
        None => AssetKind::Sticker,
    };

    let variations = tokio::task::spawn_blocking(move || {
        expand_variations(
            state.service.as_ref(),
            &state.settings.retry,
            state.sleeper.as_ref(),
            &prompt,
            kind,
            count,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Variation task failed: {e}")))??;

    Ok(Json(VariationsResponse { variations }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/variations", post(create_variations))
}
