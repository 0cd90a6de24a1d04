use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{PreferenceVector, RecommendationResult},
    routes::AppState,
};

/// Preference vector with the optional caller identity alongside it
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(flatten)]
    pub preferences: PreferenceVector,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
}

/// Handler for `POST /recommend`
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResult>> {
    tracing::debug!(request_id = %request_id, user_id = ?request.user_id, "Recommendation request");

    let result = state
        .recommendations
        .get_recommendations(&request.preferences, request.user_id)
        .await?;

    Ok(Json(result))
}
