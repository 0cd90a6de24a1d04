use std::collections::HashSet;

use crate::{db::FavoritesLookup, models::PropertyId};

pub mod cells;
pub mod rankings;
pub mod recommendations;
pub mod recommender;
pub mod single_flight;

pub use cells::CellQueryEngine;
pub use rankings::PopularityService;
pub use recommendations::RecommendationService;
pub use recommender::{HttpRecommender, Recommender};

/// The user's favorite ids, or none when the lookup fails
pub(crate) async fn favorites_or_empty(
    favorites: &dyn FavoritesLookup,
    user_id: i64,
) -> HashSet<PropertyId> {
    match favorites.list_favorite_ids(user_id).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Favorites lookup failed, marking nothing liked");
            HashSet::new()
        }
    }
}
