use serde::{Deserialize, Serialize};

use super::PropertyId;

/// Popularity score of one property within a neighborhood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub property_id: PropertyId,
    pub score: f64,
}

/// Top-K popularity snapshot of a neighborhood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResponse {
    /// Neighborhood display name
    pub name: String,
    pub list: Vec<RankingEntry>,
}

/// Orders entries by descending score, breaking ties by ascending property id
pub fn sort_by_score_desc(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.property_id.cmp(&b.property_id))
    });
}

/// The first `k` entries in ranking order
pub fn top_window(mut entries: Vec<RankingEntry>, k: usize) -> Vec<RankingEntry> {
    sort_by_score_desc(&mut entries);
    entries.truncate(k);
    entries
}
