use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{NeighborhoodId, RankingResponse},
    routes::AppState,
    services::rankings::DEFAULT_TOP_K,
};

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub k: Option<usize>,
}

/// Handler for `GET /rankings/:neighborhood_id`
pub async fn top_k(
    State(state): State<Arc<AppState>>,
    Path(neighborhood_id): Path<NeighborhoodId>,
    Query(query): Query<RankingQuery>,
) -> AppResult<Json<RankingResponse>> {
    let k = query.k.unwrap_or(DEFAULT_TOP_K);
    let ranking = state.popularity.top_k(neighborhood_id, k).await?;
    Ok(Json(ranking))
}
