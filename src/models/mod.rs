mod cell;
mod preference;
mod property;
mod ranking;
mod recommendation;

pub use cell::{CellBounds, CellProperty, CellResult, PropertyClass};
pub use preference::{Fingerprint, PreferenceVector};
pub use property::{Category, CategoryScore, NeighborhoodId, Property, PropertyId, PropertyScore};
pub use ranking::{top_window, RankingEntry, RankingResponse};
pub use recommendation::{
    EnrichedProperty, RecommendationResult, RecommendedProperty, RecommenderResponse,
};
