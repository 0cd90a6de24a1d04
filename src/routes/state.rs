use std::sync::Arc;

use crate::{
    config::Config,
    db::{CacheBackend, FavoritesLookup, PropertyStore, RankingStore},
    services::{CellQueryEngine, PopularityService, RecommendationService, Recommender},
};

/// External collaborators the services are wired against
#[derive(Clone)]
pub struct Collaborators {
    pub properties: Arc<dyn PropertyStore>,
    pub favorites: Arc<dyn FavoritesLookup>,
    pub rankings: Arc<dyn RankingStore>,
    pub cache: Arc<dyn CacheBackend>,
    pub recommender: Arc<dyn Recommender>,
}

/// Shared application state
pub struct AppState {
    pub recommendations: RecommendationService,
    pub cells: CellQueryEngine,
    pub popularity: PopularityService,
    pub properties: Arc<dyn PropertyStore>,
}

impl AppState {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            properties,
            favorites,
            rankings,
            cache,
            recommender,
        } = collaborators;

        Self {
            recommendations: RecommendationService::new(
                cache,
                recommender,
                properties.clone(),
                favorites.clone(),
                config.recommendation_cache_ttl_secs,
                config.single_flight_wait(),
            ),
            cells: CellQueryEngine::new(
                properties.clone(),
                favorites,
                config.cell_query_concurrency,
                config.cell_query_timeout(),
            ),
            popularity: PopularityService::new(rankings, properties.clone()),
            properties,
        }
    }
}
