use std::collections::HashSet;

use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{FavoritesLookup, PropertyStore};
use crate::{
    error::AppResult,
    models::{CellBounds, NeighborhoodId, Property, PropertyClass, PropertyId, PropertyScore},
};

/// Creates a PostgreSQL connection pool
///
/// The pool size also bounds how many cell queries of a batch can hit the
/// database at once.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const PROPERTY_COLUMNS: &str = "property_id, title, address, room_type, contract_type, \
     room_bath_count, price, deposit, monthly_rent, image_url, latitude, longitude, dong_id";

const SCORE_COLUMNS: &str = "property_id, \
     transport_score, transport_count, restaurant_score, restaurant_count, \
     health_score, health_count, convenience_score, convenience_count, \
     cafe_score, cafe_count, chicken_score, chicken_count, leisure_score, leisure_count";

/// Builds the bounding-box query for a class. Bounds are bound as
/// `$1..$4` = min_lat, max_lat, min_lng, max_lng.
fn bounds_query(class: PropertyClass) -> String {
    let mut sql = format!(
        "SELECT {} FROM property \
         WHERE latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4",
        PROPERTY_COLUMNS
    );
    if let Some(predicate) = class.sql_predicate() {
        sql.push_str(" AND ");
        sql.push_str(predicate);
    }
    sql.push_str(" ORDER BY property_id");
    sql
}

/// Property store backed by the `property`, `property_score` and `dong` tables
#[derive(Clone)]
pub struct PgPropertyStore {
    pool: PgPool,
}

impl PgPropertyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PropertyStore for PgPropertyStore {
    async fn get_by_id(&self, id: PropertyId) -> AppResult<Option<Property>> {
        let sql = format!("SELECT {} FROM property WHERE property_id = $1", PROPERTY_COLUMNS);
        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(property)
    }

    async fn get_score_by_id(&self, id: PropertyId) -> AppResult<Option<PropertyScore>> {
        let sql = format!(
            "SELECT {} FROM property_score WHERE property_id = $1 LIMIT 1",
            SCORE_COLUMNS
        );
        let score = sqlx::query_as::<_, PropertyScore>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(score)
    }

    async fn find_in_bounds(
        &self,
        bounds: &CellBounds,
        class: PropertyClass,
    ) -> AppResult<Vec<Property>> {
        let properties = sqlx::query_as::<_, Property>(&bounds_query(class))
            .bind(bounds.min_lat)
            .bind(bounds.max_lat)
            .bind(bounds.min_lng)
            .bind(bounds.max_lng)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            class = ?class,
            found = properties.len(),
            "Cell query completed"
        );

        Ok(properties)
    }

    async fn neighborhood_name(&self, id: NeighborhoodId) -> AppResult<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM dong WHERE dong_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

/// Favorites backed by the `property_zzim` table
#[derive(Clone)]
pub struct PgFavoritesLookup {
    pool: PgPool,
}

impl PgFavoritesLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FavoritesLookup for PgFavoritesLookup {
    async fn list_favorite_ids(&self, user_id: i64) -> AppResult<HashSet<PropertyId>> {
        let ids = sqlx::query_scalar::<_, PropertyId>(
            "SELECT property_id FROM property_zzim WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_query_without_class_predicate() {
        let sql = bounds_query(PropertyClass::All);
        assert!(sql.ends_with(
            "WHERE latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4 ORDER BY property_id"
        ));
        assert!(!sql.contains("AND room_type"));
        assert!(!sql.contains("LIKE"));
    }

    #[test]
    fn test_bounds_query_appends_class_predicate() {
        let sql = bounds_query(PropertyClass::OneRoom);
        assert!(sql.contains("AND (room_bath_count LIKE '1/%' OR room_bath_count LIKE '2/%')"));

        let sql = bounds_query(PropertyClass::Office);
        assert!(sql.contains("AND room_type = '오피스텔'"));
    }
}
