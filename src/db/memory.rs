//! In-process implementations of the storage traits.
//!
//! Used by the test suites and for running the router without Postgres or
//! Redis. Locks are never held across an `.await`.
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheKey, FavoritesLookup, PropertyStore, RankingStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        top_window, CellBounds, NeighborhoodId, Property, PropertyClass, PropertyId,
        PropertyScore, RankingEntry,
    },
};

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("in-memory store lock poisoned".to_string())
}

#[derive(Default)]
pub struct MemoryPropertyStore {
    properties: RwLock<HashMap<PropertyId, Property>>,
    scores: RwLock<HashMap<PropertyId, PropertyScore>>,
    neighborhoods: RwLock<HashMap<NeighborhoodId, String>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_property(&self, property: Property) {
        if let Ok(mut properties) = self.properties.write() {
            properties.insert(property.property_id, property);
        }
    }

    pub fn insert_score(&self, score: PropertyScore) {
        if let Ok(mut scores) = self.scores.write() {
            scores.insert(score.property_id, score);
        }
    }

    pub fn insert_neighborhood(&self, id: NeighborhoodId, name: impl Into<String>) {
        if let Ok(mut neighborhoods) = self.neighborhoods.write() {
            neighborhoods.insert(id, name.into());
        }
    }

    pub fn remove_property(&self, id: PropertyId) {
        if let Ok(mut properties) = self.properties.write() {
            properties.remove(&id);
        }
    }
}

#[async_trait::async_trait]
impl PropertyStore for MemoryPropertyStore {
    async fn get_by_id(&self, id: PropertyId) -> AppResult<Option<Property>> {
        let properties = self.properties.read().map_err(poisoned)?;
        Ok(properties.get(&id).cloned())
    }

    async fn get_score_by_id(&self, id: PropertyId) -> AppResult<Option<PropertyScore>> {
        let scores = self.scores.read().map_err(poisoned)?;
        Ok(scores.get(&id).cloned())
    }

    async fn find_in_bounds(
        &self,
        bounds: &CellBounds,
        class: PropertyClass,
    ) -> AppResult<Vec<Property>> {
        let properties = self.properties.read().map_err(poisoned)?;
        let mut found: Vec<Property> = properties
            .values()
            .filter(|p| bounds.contains(p.latitude, p.longitude) && class.matches(p))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.property_id);
        Ok(found)
    }

    async fn neighborhood_name(&self, id: NeighborhoodId) -> AppResult<Option<String>> {
        let neighborhoods = self.neighborhoods.read().map_err(poisoned)?;
        Ok(neighborhoods.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryFavorites {
    favorites: RwLock<HashMap<i64, HashSet<PropertyId>>>,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user_id: i64, property_id: PropertyId) {
        if let Ok(mut favorites) = self.favorites.write() {
            favorites.entry(user_id).or_default().insert(property_id);
        }
    }

    pub fn remove(&self, user_id: i64, property_id: PropertyId) {
        if let Ok(mut favorites) = self.favorites.write() {
            if let Some(set) = favorites.get_mut(&user_id) {
                set.remove(&property_id);
            }
        }
    }
}

#[async_trait::async_trait]
impl FavoritesLookup for MemoryFavorites {
    async fn list_favorite_ids(&self, user_id: i64) -> AppResult<HashSet<PropertyId>> {
        let favorites = self.favorites.read().map_err(poisoned)?;
        Ok(favorites.get(&user_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryRankingStore {
    scores: Mutex<HashMap<NeighborhoodId, HashMap<PropertyId, f64>>>,
}

impl MemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, neighborhood: NeighborhoodId, property: PropertyId) -> Option<f64> {
        let scores = self.scores.lock().ok()?;
        scores.get(&neighborhood)?.get(&property).copied()
    }

    /// Seeds a score directly, bypassing increment
    pub fn set_score(&self, neighborhood: NeighborhoodId, property: PropertyId, score: f64) {
        if let Ok(mut scores) = self.scores.lock() {
            scores.entry(neighborhood).or_default().insert(property, score);
        }
    }
}

#[async_trait::async_trait]
impl RankingStore for MemoryRankingStore {
    async fn increment(&self, neighborhood: NeighborhoodId, property: PropertyId) -> AppResult<()> {
        let mut scores = self
            .scores
            .lock()
            .map_err(|_| AppError::PopularityStoreUnavailable("lock poisoned".to_string()))?;
        *scores
            .entry(neighborhood)
            .or_default()
            .entry(property)
            .or_insert(0.0) += 1.0;
        Ok(())
    }

    async fn top_k(&self, neighborhood: NeighborhoodId, k: usize) -> AppResult<Vec<RankingEntry>> {
        let scores = self
            .scores
            .lock()
            .map_err(|_| AppError::PopularityStoreUnavailable("lock poisoned".to_string()))?;

        let entries: Vec<RankingEntry> = scores
            .get(&neighborhood)
            .map(|set| {
                set.iter()
                    .map(|(property_id, score)| RankingEntry {
                        property_id: *property_id,
                        score: *score,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(top_window(entries, k))
    }
}

/// TTL cache that writes synchronously, so a value is readable as soon as
/// `set` resolves
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let key = key.to_string();

        match entries.get(&key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(&key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: u64) -> AppResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl);
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fingerprint, PreferenceVector};

    fn property(id: PropertyId, lat: f64, lng: f64, room_type: &str) -> Property {
        Property {
            property_id: id,
            title: format!("매물 {}", id),
            address: "서울".to_string(),
            room_type: room_type.to_string(),
            contract_type: "월세".to_string(),
            room_bath_count: Some("1/1".to_string()),
            price: None,
            deposit: None,
            monthly_rent: None,
            image_url: None,
            latitude: lat,
            longitude: lng,
            neighborhood_id: 11410555,
        }
    }

    #[tokio::test]
    async fn test_find_in_bounds_filters_location_and_class() {
        let store = MemoryPropertyStore::new();
        store.insert_property(property(1, 37.50, 127.00, "원룸"));
        store.insert_property(property(2, 37.50, 127.00, "오피스텔"));
        store.insert_property(property(3, 38.00, 127.00, "원룸"));

        let cell = CellBounds::new(37.4, 37.6, 126.9, 127.1);

        let all = store.find_in_bounds(&cell, PropertyClass::All).await.unwrap();
        assert_eq!(all.iter().map(|p| p.property_id).collect::<Vec<_>>(), vec![1, 2]);

        let office = store.find_in_bounds(&cell, PropertyClass::Office).await.unwrap();
        assert_eq!(office.len(), 1);
        assert_eq!(office[0].property_id, 2);
    }

    #[tokio::test]
    async fn test_ranking_increment_creates_and_accumulates() {
        let store = MemoryRankingStore::new();
        assert_eq!(store.score(1, 555), None);

        store.increment(1, 555).await.unwrap();
        store.increment(1, 555).await.unwrap();

        assert_eq!(store.score(1, 555), Some(2.0));
    }

    #[tokio::test]
    async fn test_ranking_top_k_truncates() {
        let store = MemoryRankingStore::new();
        for (id, score) in [(1, 1.0), (2, 2.0), (3, 3.0)] {
            store.set_score(9, id, score);
        }

        let top = store.top_k(9, 2).await.unwrap();
        assert_eq!(top.iter().map(|e| e.property_id).collect::<Vec<_>>(), vec![3, 2]);
        assert!(store.top_k(10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ranking_cuts_ties_by_id() {
        let store = MemoryRankingStore::new();
        for (id, score) in [(1, 8.0), (3, 5.0), (2, 5.0)] {
            store.set_score(9, id, score);
        }

        let top = store.top_k(9, 2).await.unwrap();
        assert_eq!(top.iter().map(|e| e.property_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_cache_expires_entries() {
        let cache = MemoryCache::new();
        let key = CacheKey::Recommendation(Fingerprint::of(&PreferenceVector::default()));

        cache.set(&key, "value".to_string(), 0).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache.set(&key, "value".to_string(), 60).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some("value".to_string()));
        assert_eq!(cache.len(), 1);
    }
}
