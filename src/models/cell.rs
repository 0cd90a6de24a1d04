use serde::{Deserialize, Serialize};

use super::Property;

/// A rectangular latitude/longitude tile of a map viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl CellBounds {
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Checks ordering and range. Out-of-order bounds are rejected, never swapped.
    pub fn validate(&self) -> Result<(), String> {
        let values = [self.min_lat, self.max_lat, self.min_lng, self.max_lng];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("bounds must be finite numbers".to_string());
        }
        if self.min_lat > self.max_lat {
            return Err(format!(
                "minLat {} is greater than maxLat {}",
                self.min_lat, self.max_lat
            ));
        }
        if self.min_lng > self.max_lng {
            return Err(format!(
                "minLng {} is greater than maxLng {}",
                self.min_lng, self.max_lng
            ));
        }
        if self.min_lat < -90.0 || self.max_lat > 90.0 {
            return Err("latitude must be within [-90, 90]".to_string());
        }
        if self.min_lng < -180.0 || self.max_lng > 180.0 {
            return Err("longitude must be within [-180, 180]".to_string());
        }
        Ok(())
    }

    /// Inclusive containment, matching `BETWEEN` in the store query
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lng..=self.max_lng).contains(&longitude)
    }
}

/// Property class filter for viewport queries.
///
/// Parsing never fails: unknown values fall back to [`PropertyClass::All`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyClass {
    #[default]
    All,
    /// One- and two-room listings
    OneRoom,
    /// Villas and detached houses
    House,
    /// Officetels
    Office,
}

impl PropertyClass {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "one-room" => PropertyClass::OneRoom,
            "house" => PropertyClass::House,
            "office" => PropertyClass::Office,
            _ => PropertyClass::All,
        }
    }

    /// Extra SQL predicate over the `property` table, `None` for no restriction
    pub fn sql_predicate(&self) -> Option<&'static str> {
        match self {
            PropertyClass::All => None,
            PropertyClass::OneRoom => {
                Some("(room_bath_count LIKE '1/%' OR room_bath_count LIKE '2/%')")
            }
            PropertyClass::House => Some("room_type IN ('빌라', '주택')"),
            PropertyClass::Office => Some("room_type = '오피스텔'"),
        }
    }

    /// In-memory equivalent of [`PropertyClass::sql_predicate`]
    pub fn matches(&self, property: &Property) -> bool {
        match self {
            PropertyClass::All => true,
            PropertyClass::OneRoom => property
                .room_bath_count
                .as_deref()
                .map(|rb| rb.starts_with("1/") || rb.starts_with("2/"))
                .unwrap_or(false),
            PropertyClass::House => matches!(property.room_type.as_str(), "빌라" | "주택"),
            PropertyClass::Office => property.room_type == "오피스텔",
        }
    }
}

impl From<&str> for PropertyClass {
    fn from(value: &str) -> Self {
        PropertyClass::parse(value)
    }
}

/// A property in a cell, with the viewer's favorite flag when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellProperty {
    #[serde(flatten)]
    pub property: Property,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub liked: Option<bool>,
}

impl From<Property> for CellProperty {
    fn from(property: Property) -> Self {
        Self {
            property,
            liked: None,
        }
    }
}

/// Properties found inside one requested cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellResult {
    pub cell: CellBounds,
    pub properties: Vec<CellProperty>,
    /// Set when the cell query exceeded its deadline and was answered empty
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub timed_out: bool,
}
