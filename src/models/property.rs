use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of a property listing
pub type PropertyId = i64;

/// Identifier of a neighborhood (legal dong code, e.g. 11410555)
pub type NeighborhoodId = i64;

/// Neighborhood-level location category scored for every property
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Transport,
    Restaurant,
    Health,
    Convenience,
    Cafe,
    Chicken,
    Leisure,
}

impl Category {
    /// All categories in their canonical order
    pub const ALL: [Category; 7] = [
        Category::Transport,
        Category::Restaurant,
        Category::Health,
        Category::Convenience,
        Category::Cafe,
        Category::Chicken,
        Category::Leisure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Transport => "transport",
            Category::Restaurant => "restaurant",
            Category::Health => "health",
            Category::Convenience => "convenience",
            Category::Cafe => "cafe",
            Category::Chicken => "chicken",
            Category::Leisure => "leisure",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property listing as stored in the relational store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub property_id: PropertyId,
    pub title: String,
    pub address: String,
    /// e.g. "원룸", "빌라", "오피스텔"
    pub room_type: String,
    /// e.g. "월세", "전세"
    pub contract_type: String,
    /// "rooms/baths" descriptor such as "1/1"
    pub room_bath_count: Option<String>,
    pub price: Option<String>,
    pub deposit: Option<i32>,
    pub monthly_rent: Option<i32>,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[sqlx(rename = "dong_id")]
    pub neighborhood_id: NeighborhoodId,
}

/// Score and point-of-interest count for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: Option<f32>,
    pub count: Option<i32>,
}

/// Per-category score record of a property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PropertyScore {
    pub property_id: PropertyId,
    pub transport_score: Option<f32>,
    pub transport_count: Option<i32>,
    pub restaurant_score: Option<f32>,
    pub restaurant_count: Option<i32>,
    pub health_score: Option<f32>,
    pub health_count: Option<i32>,
    pub convenience_score: Option<f32>,
    pub convenience_count: Option<i32>,
    pub cafe_score: Option<f32>,
    pub cafe_count: Option<i32>,
    pub chicken_score: Option<f32>,
    pub chicken_count: Option<i32>,
    pub leisure_score: Option<f32>,
    pub leisure_count: Option<i32>,
}

impl PropertyScore {
    pub fn category(&self, category: Category) -> CategoryScore {
        let (score, count) = match category {
            Category::Transport => (self.transport_score, self.transport_count),
            Category::Restaurant => (self.restaurant_score, self.restaurant_count),
            Category::Health => (self.health_score, self.health_count),
            Category::Convenience => (self.convenience_score, self.convenience_count),
            Category::Cafe => (self.cafe_score, self.cafe_count),
            Category::Chicken => (self.chicken_score, self.chicken_count),
            Category::Leisure => (self.leisure_score, self.leisure_count),
        };
        CategoryScore { score, count }
    }
}
