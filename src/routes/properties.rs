use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{Property, PropertyId},
    routes::AppState,
};

/// Handler for `GET /property/:id`
///
/// A successful view counts toward the neighborhood's popularity ranking.
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PropertyId>,
) -> AppResult<Json<Property>> {
    let property = state
        .properties
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("property {} not found", id)))?;

    state
        .popularity
        .record_view(property.neighborhood_id, property.property_id);

    Ok(Json(property))
}
