use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{Category, CategoryScore, Property, PropertyId, PropertyScore};

/// One entry of the external recommender's ranked list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProperty {
    #[serde(rename = "propertyId", alias = "property_id")]
    pub property_id: PropertyId,
    pub similarity: f64,
}

/// Raw response of the external recommender
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommenderResponse {
    #[serde(rename = "recommended_properties", alias = "recommendedProperties", default)]
    pub recommended_properties: Vec<RecommendedProperty>,
    /// Dominant category label, e.g. "cafe"
    #[serde(rename = "maxType", alias = "max_type", default)]
    pub max_type: Option<String>,
}

/// A recommended property joined with its stored attributes and scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProperty {
    pub property_id: PropertyId,
    pub title: String,
    pub address: String,
    pub room_type: String,
    pub contract_type: String,
    pub deposit: Option<i32>,
    pub monthly_rent: Option<i32>,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub scores: BTreeMap<Category, CategoryScore>,
    pub similarity: f64,
    /// Placeholder in the cached payload, overwritten per request
    pub liked: bool,
}

impl EnrichedProperty {
    pub fn new(property: Property, score: &PropertyScore, similarity: f64) -> Self {
        let scores = Category::ALL
            .iter()
            .map(|c| (*c, score.category(*c)))
            .collect();

        Self {
            property_id: property.property_id,
            title: property.title,
            address: property.address,
            room_type: property.room_type,
            contract_type: property.contract_type,
            deposit: property.deposit,
            monthly_rent: property.monthly_rent,
            image_url: property.image_url,
            latitude: property.latitude,
            longitude: property.longitude,
            scores,
            similarity,
            liked: false,
        }
    }
}

/// Enriched recommendations for one preference vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub recommended_properties: Vec<EnrichedProperty>,
    pub max_type: String,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationResult {
    /// Overwrites every favorite flag from the caller's favorite set
    pub fn overlay_favorites(&mut self, favorites: &HashSet<PropertyId>) {
        for property in &mut self.recommended_properties {
            property.liked = favorites.contains(&property.property_id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recommended_properties.is_empty()
    }
}
