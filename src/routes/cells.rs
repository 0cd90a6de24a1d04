use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{CellBounds, CellResult, PropertyClass},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CellsQuery {
    /// `all`, `one-room`, `house` or `office`; anything else means `all`
    #[serde(rename = "type", default)]
    pub class: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CellsRequest {
    #[serde(default)]
    pub cells: Vec<CellBounds>,
}

/// Handler for `POST /property/cells`
pub async fn query_cells(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CellsQuery>,
    Json(request): Json<CellsRequest>,
) -> AppResult<Json<Vec<CellResult>>> {
    let class = query
        .class
        .as_deref()
        .map(PropertyClass::parse)
        .unwrap_or_default();

    let results = state
        .cells
        .query_cells(request.cells, class, query.user_id)
        .await?;

    Ok(Json(results))
}
