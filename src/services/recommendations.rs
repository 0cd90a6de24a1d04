use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::{
    db::{CacheBackend, CacheKey, FavoritesLookup, PropertyStore},
    error::{AppError, AppResult},
    models::{EnrichedProperty, Fingerprint, PreferenceVector, RecommendationResult, RecommendedProperty},
    services::{favorites_or_empty, recommender::Recommender, single_flight::SingleFlight},
};

/// Serves recommendations through the fingerprint cache.
///
/// The cached payload is never personalized: favorite flags are overlaid on a
/// copy after every read, cached or freshly computed.
pub struct RecommendationService {
    cache: Arc<dyn CacheBackend>,
    recommender: Arc<dyn Recommender>,
    properties: Arc<dyn PropertyStore>,
    favorites: Arc<dyn FavoritesLookup>,
    flights: SingleFlight<RecommendationResult>,
    cache_ttl: u64,
}

impl RecommendationService {
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        recommender: Arc<dyn Recommender>,
        properties: Arc<dyn PropertyStore>,
        favorites: Arc<dyn FavoritesLookup>,
        cache_ttl: u64,
        single_flight_wait: Duration,
    ) -> Self {
        Self {
            cache,
            recommender,
            properties,
            favorites,
            flights: SingleFlight::new(single_flight_wait),
            cache_ttl,
        }
    }

    /// Recommendations for `vector`, with favorite flags for `user_id`
    #[tracing::instrument(skip(self, vector))]
    pub async fn get_recommendations(
        &self,
        vector: &PreferenceVector,
        user_id: Option<i64>,
    ) -> AppResult<RecommendationResult> {
        let fingerprint = Fingerprint::of(vector);
        let key = CacheKey::Recommendation(fingerprint.clone());

        let mut result = match read_cached(self.cache.as_ref(), &key).await {
            Some(cached) => {
                tracing::debug!(fingerprint = %fingerprint, "Recommendation cache hit");
                cached
            }
            None => {
                tracing::debug!(fingerprint = %fingerprint, "Recommendation cache miss");
                let computation = Computation {
                    cache: self.cache.clone(),
                    recommender: self.recommender.clone(),
                    properties: self.properties.clone(),
                    key: key.clone(),
                    vector: vector.clone(),
                    cache_ttl: self.cache_ttl,
                };
                self.flights
                    .run(&key.to_string(), move || computation.run())
                    .await?
            }
        };

        let favorites = match user_id {
            Some(user_id) => favorites_or_empty(self.favorites.as_ref(), user_id).await,
            None => Default::default(),
        };
        result.overlay_favorites(&favorites);

        Ok(result)
    }
}

/// Reads and decodes a cached result. Any failure counts as a miss.
async fn read_cached(cache: &dyn CacheBackend, key: &CacheKey) -> Option<RecommendationResult> {
    match cache.get(key).await {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
            None
        }
    }
}

/// Everything one cache-miss computation needs, owned so it can outlive the
/// request that started it
struct Computation {
    cache: Arc<dyn CacheBackend>,
    recommender: Arc<dyn Recommender>,
    properties: Arc<dyn PropertyStore>,
    key: CacheKey,
    vector: PreferenceVector,
    cache_ttl: u64,
}

impl Computation {
    async fn run(self) -> AppResult<RecommendationResult> {
        // Another flight may have landed between our miss and this task starting.
        if let Some(cached) = read_cached(self.cache.as_ref(), &self.key).await {
            return Ok(cached);
        }

        let response = self.recommender.recommend(&self.vector).await?;
        if response.recommended_properties.is_empty() {
            return Err(AppError::RecommendationUnavailable(
                "recommender returned no properties".to_string(),
            ));
        }

        let requested = response.recommended_properties.len();
        let recommended_properties =
            enrich(self.properties.clone(), response.recommended_properties).await?;

        let max_type = response
            .max_type
            .filter(|label| !label.is_empty())
            .or_else(|| self.vector.dominant_category().map(|c| c.to_string()))
            .unwrap_or_default();

        let result = RecommendationResult {
            recommended_properties,
            max_type,
            generated_at: Utc::now(),
        };

        if result.is_empty() {
            tracing::warn!(
                key = %self.key,
                requested,
                "No recommended property could be enriched, result not cached"
            );
            return Ok(result);
        }

        // Waiters are released when this returns, so the entry must be readable by then.
        match serde_json::to_string(&result) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&self.key, json, self.cache_ttl).await {
                    tracing::warn!(error = %e, key = %self.key, "Failed to cache recommendations");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize recommendation result"),
        }

        tracing::info!(
            key = %self.key,
            requested,
            enriched = result.recommended_properties.len(),
            "Recommendations computed"
        );

        Ok(result)
    }
}

/// Joins each recommended id with its property and score records, in
/// parallel, keeping the recommender's order. Ids without both records are
/// dropped.
async fn enrich(
    properties: Arc<dyn PropertyStore>,
    recommended: Vec<RecommendedProperty>,
) -> AppResult<Vec<EnrichedProperty>> {
    let mut tasks = Vec::with_capacity(recommended.len());

    for entry in recommended {
        let store = properties.clone();
        tasks.push(tokio::spawn(async move { enrich_one(store.as_ref(), entry).await }));
    }

    let mut enriched = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(Ok(Some(property))) => enriched.push(property),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(AppError::Internal(e.to_string())),
        }
    }

    Ok(enriched)
}

async fn enrich_one(
    store: &dyn PropertyStore,
    entry: RecommendedProperty,
) -> AppResult<Option<EnrichedProperty>> {
    let id = entry.property_id;
    let (property, score) = tokio::try_join!(store.get_by_id(id), store.get_score_by_id(id))?;

    match (property, score) {
        (Some(property), Some(score)) => {
            Ok(Some(EnrichedProperty::new(property, &score, entry.similarity)))
        }
        (None, _) => {
            tracing::warn!(property_id = id, "Recommended property not found, dropping");
            Ok(None)
        }
        (Some(_), None) => {
            tracing::warn!(property_id = id, "Recommended property has no score record, dropping");
            Ok(None)
        }
    }
}
