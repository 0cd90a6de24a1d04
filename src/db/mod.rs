//! Storage collaborators.
//!
//! Each external store sits behind an async trait so services can be wired
//! against Postgres/Redis in production and the in-memory versions in
//! [`memory`] for tests and local runs.
use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{CellBounds, NeighborhoodId, Property, PropertyClass, PropertyId, PropertyScore, RankingEntry},
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use self::postgres::{create_pool, PgFavoritesLookup, PgPropertyStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle, RedisRankingStore};

/// Read-only access to property records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PropertyStore: Send + Sync {
    async fn get_by_id(&self, id: PropertyId) -> AppResult<Option<Property>>;

    async fn get_score_by_id(&self, id: PropertyId) -> AppResult<Option<PropertyScore>>;

    /// All properties inside `bounds` (inclusive) that satisfy `class`
    async fn find_in_bounds(
        &self,
        bounds: &CellBounds,
        class: PropertyClass,
    ) -> AppResult<Vec<Property>>;

    async fn neighborhood_name(&self, id: NeighborhoodId) -> AppResult<Option<String>>;
}

/// Favorite ("zzim") property ids per user
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoritesLookup: Send + Sync {
    async fn list_favorite_ids(&self, user_id: i64) -> AppResult<HashSet<PropertyId>>;
}

/// Durable per-neighborhood popularity counters
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RankingStore: Send + Sync {
    /// Adds 1 to the property's score, creating it at 1 when absent
    async fn increment(&self, neighborhood: NeighborhoodId, property: PropertyId) -> AppResult<()>;

    /// Highest scores first, at most `k` entries. Equal scores are ordered by
    /// property id ascending, including across the `k`-th position.
    async fn top_k(&self, neighborhood: NeighborhoodId, k: usize) -> AppResult<Vec<RankingEntry>>;
}

/// String-valued key/value cache with per-entry TTL
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>>;

    /// Stores `value` for `ttl` seconds. Resolves once the value is readable
    /// through [`CacheBackend::get`].
    async fn set(&self, key: &CacheKey, value: String, ttl: u64) -> AppResult<()>;
}
