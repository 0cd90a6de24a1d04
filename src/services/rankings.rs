use std::sync::Arc;

use crate::{
    db::{PropertyStore, RankingStore},
    error::{AppError, AppResult},
    models::{NeighborhoodId, PropertyId, RankingResponse},
};

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 50;

/// Per-neighborhood view popularity
pub struct PopularityService {
    rankings: Arc<dyn RankingStore>,
    properties: Arc<dyn PropertyStore>,
}

impl PopularityService {
    pub fn new(rankings: Arc<dyn RankingStore>, properties: Arc<dyn PropertyStore>) -> Self {
        Self {
            rankings,
            properties,
        }
    }

    /// Counts one view of `property` without making the caller wait.
    ///
    /// Failures are logged and never reach the caller.
    pub fn record_view(
        &self,
        neighborhood: NeighborhoodId,
        property: PropertyId,
    ) -> tokio::task::JoinHandle<()> {
        let rankings = self.rankings.clone();
        tokio::spawn(async move {
            if let Err(e) = rankings.increment(neighborhood, property).await {
                tracing::warn!(
                    error = %e,
                    neighborhood,
                    property_id = property,
                    "Popularity increment failed"
                );
            }
        })
    }

    /// Top `k` properties for a neighborhood with its display name.
    ///
    /// `k` is clamped to `1..=MAX_TOP_K`.
    #[tracing::instrument(skip(self))]
    pub async fn top_k(&self, neighborhood: NeighborhoodId, k: usize) -> AppResult<RankingResponse> {
        let k = k.clamp(1, MAX_TOP_K);

        let list = self.rankings.top_k(neighborhood, k).await.map_err(|e| match e {
            AppError::PopularityStoreUnavailable(_) => e,
            other => AppError::PopularityStoreUnavailable(other.to_string()),
        })?;

        let name = match self.properties.neighborhood_name(neighborhood).await {
            Ok(Some(name)) => name,
            Ok(None) => neighborhood.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, neighborhood, "Neighborhood name lookup failed");
                neighborhood.to_string()
            }
        };

        Ok(RankingResponse { name, list })
    }
}
