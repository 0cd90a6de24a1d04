use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;

use crate::db::RankingStore;
use crate::error::{AppError, AppResult};
use crate::models::{top_window, NeighborhoodId, PropertyId, RankingEntry};

/// Popularity counters stored as one sorted set per neighborhood
/// (`ranking:{neighborhood}`, member = property id, score = view count).
///
/// Holds a [`ConnectionManager`], which reconnects after the server drops.
#[derive(Clone)]
pub struct RedisRankingStore {
    conn: ConnectionManager,
}

impl RedisRankingStore {
    pub async fn connect(redis_client: Client) -> AppResult<Self> {
        let conn = ConnectionManager::new(redis_client)
            .await
            .map_err(unavailable)?;
        Ok(Self { conn })
    }

    fn key(neighborhood: NeighborhoodId) -> String {
        format!("ranking:{}", neighborhood)
    }
}

fn unavailable(e: redis::RedisError) -> AppError {
    AppError::PopularityStoreUnavailable(e.to_string())
}

/// Score of the `k`-th member when the window is full. Members tied with it
/// may sit past the window in Redis order.
fn cutoff_score(window: &[(String, f64)], k: usize) -> Option<f64> {
    if window.len() < k {
        return None;
    }
    window.get(k.checked_sub(1)?).map(|(_, score)| *score)
}

/// Parses `ZREVRANGE ... WITHSCORES` members, dropping ones that are not property ids
fn parse_members(raw: Vec<(String, f64)>) -> Vec<RankingEntry> {
    raw.into_iter()
        .filter_map(|(member, score)| match member.parse::<PropertyId>() {
            Ok(property_id) => Some(RankingEntry { property_id, score }),
            Err(_) => {
                tracing::warn!(member = %member, "Skipping non-numeric ranking member");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl RankingStore for RedisRankingStore {
    async fn increment(&self, neighborhood: NeighborhoodId, property: PropertyId) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let score: f64 = conn
            .zincr(Self::key(neighborhood), property, 1)
            .await
            .map_err(unavailable)?;

        tracing::debug!(
            neighborhood = neighborhood,
            property_id = property,
            score = score,
            "Popularity incremented"
        );

        Ok(())
    }

    async fn top_k(&self, neighborhood: NeighborhoodId, k: usize) -> AppResult<Vec<RankingEntry>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let key = Self::key(neighborhood);
        let mut conn = self.conn.clone();
        let mut raw: Vec<(String, f64)> = conn
            .zrevrange_withscores(&key, 0, k as isize - 1)
            .await
            .map_err(unavailable)?;

        // Redis orders equal scores by descending member bytes, so "3" beats "2" at the cut.
        // Fetch every member tied with the k-th score and cut again by id.
        if let Some(cutoff) = cutoff_score(&raw, k) {
            raw = conn
                .zrevrangebyscore_withscores(&key, "+inf", cutoff)
                .await
                .map_err(unavailable)?;
        }

        Ok(top_window(parse_members(raw), k))
    }
}
