use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::Category;

/// A user's preference vector for location-based recommendations.
///
/// Every field may be absent. The vector is forwarded verbatim to the
/// external recommender and is the sole input of [`Fingerprint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceVector {
    pub transport_score: Option<f64>,
    pub restaurant_score: Option<f64>,
    pub health_score: Option<f64>,
    pub convenience_score: Option<f64>,
    pub cafe_score: Option<f64>,
    pub chicken_score: Option<f64>,
    pub leisure_score: Option<f64>,
    pub age: Option<i32>,
    pub gender: Option<i32>,
    /// Lower and upper price bound, e.g. `[500000, 1000000]`
    pub price_range: Option<Vec<i64>>,
    pub room_type: Option<String>,
    pub contract_type: Option<String>,
}

impl PreferenceVector {
    pub fn score(&self, category: Category) -> Option<f64> {
        match category {
            Category::Transport => self.transport_score,
            Category::Restaurant => self.restaurant_score,
            Category::Health => self.health_score,
            Category::Convenience => self.convenience_score,
            Category::Cafe => self.cafe_score,
            Category::Chicken => self.chicken_score,
            Category::Leisure => self.leisure_score,
        }
    }

    /// Highest-scoring present category. The first category wins ties.
    pub fn dominant_category(&self) -> Option<Category> {
        Category::ALL
            .iter()
            .filter_map(|c| self.score(*c).map(|s| (*c, s)))
            .fold(None, |best: Option<(Category, f64)>, (c, s)| match best {
                Some((_, best_score)) if best_score >= s => best,
                _ => Some((c, s)),
            })
            .map(|(c, _)| c)
    }
}

const FINGERPRINT_VERSION: &str = "v1";
const SEPARATOR: char = '|';
const PRESENT: char = '=';
const ESCAPE: char = '\\';

/// Cache key derived from a [`PreferenceVector`].
///
/// Layout: `v1` followed by twelve `|`-prefixed segments in fixed order
/// (seven category scores, age, gender, price range, room type, contract type).
/// An absent field is an empty segment; a present one is `=` followed by its
/// value with `\` and `|` escaped by `\`. An empty price range counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(vector: &PreferenceVector) -> Self {
        let mut segments: Vec<Option<String>> = Category::ALL
            .iter()
            .map(|c| vector.score(*c).map(|s| s.to_string()))
            .collect();
        segments.push(vector.age.map(|a| a.to_string()));
        segments.push(vector.gender.map(|g| g.to_string()));
        segments.push(
            vector
                .price_range
                .as_ref()
                .filter(|range| !range.is_empty())
                .map(|range| {
                    range
                        .iter()
                        .map(i64::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                }),
        );
        segments.push(vector.room_type.clone());
        segments.push(vector.contract_type.clone());

        let mut key = String::from(FINGERPRINT_VERSION);
        for segment in segments {
            key.push(SEPARATOR);
            if let Some(value) = segment {
                key.push(PRESENT);
                push_escaped(&mut key, &value);
            }
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        if ch == SEPARATOR || ch == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PreferenceVector {
        PreferenceVector {
            transport_score: Some(0.8),
            restaurant_score: Some(0.2),
            age: Some(25),
            gender: Some(1),
            price_range: Some(vec![500000, 1000000]),
            room_type: Some("원룸".to_string()),
            contract_type: Some("월세".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_layout() {
        let fp = Fingerprint::of(&sample());
        assert_eq!(
            fp.as_str(),
            "v1|=0.8|=0.2||||||=25|=1|=500000,1000000|=원룸|=월세"
        );
    }

    #[test]
    fn test_empty_vector_fingerprint_keeps_positions() {
        let fp = Fingerprint::of(&PreferenceVector::default());
        assert_eq!(fp.as_str(), "v1||||||||||||");
    }

    #[test]
    fn test_identical_vectors_share_fingerprint() {
        assert_eq!(Fingerprint::of(&sample()), Fingerprint::of(&sample().clone()));
        assert_eq!(
            Fingerprint::of(&PreferenceVector::default()),
            Fingerprint::of(&PreferenceVector::default())
        );
    }

    #[test]
    fn test_every_field_change_alters_fingerprint() {
        let base = sample();
        let base_fp = Fingerprint::of(&base);

        let variants: Vec<PreferenceVector> = vec![
            PreferenceVector { transport_score: Some(0.7), ..base.clone() },
            PreferenceVector { transport_score: None, ..base.clone() },
            PreferenceVector { restaurant_score: Some(0.3), ..base.clone() },
            PreferenceVector { health_score: Some(0.1), ..base.clone() },
            PreferenceVector { convenience_score: Some(0.1), ..base.clone() },
            PreferenceVector { cafe_score: Some(0.1), ..base.clone() },
            PreferenceVector { chicken_score: Some(0.1), ..base.clone() },
            PreferenceVector { leisure_score: Some(0.1), ..base.clone() },
            PreferenceVector { age: Some(26), ..base.clone() },
            PreferenceVector { age: None, ..base.clone() },
            PreferenceVector { gender: Some(2), ..base.clone() },
            PreferenceVector { gender: None, ..base.clone() },
            PreferenceVector { price_range: Some(vec![500000, 900000]), ..base.clone() },
            PreferenceVector { price_range: None, ..base.clone() },
            PreferenceVector { room_type: Some("투룸".to_string()), ..base.clone() },
            PreferenceVector { room_type: None, ..base.clone() },
            PreferenceVector { contract_type: Some("전세".to_string()), ..base.clone() },
            PreferenceVector { contract_type: None, ..base.clone() },
        ];

        for variant in &variants {
            assert_ne!(Fingerprint::of(variant), base_fp, "collided: {:?}", variant);
        }
    }

    #[test]
    fn test_same_value_in_different_position_differs() {
        let a = PreferenceVector {
            health_score: Some(0.5),
            ..Default::default()
        };
        let b = PreferenceVector {
            cafe_score: Some(0.5),
            ..Default::default()
        };
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_empty_string_differs_from_absent() {
        let absent = PreferenceVector::default();
        let empty = PreferenceVector {
            room_type: Some(String::new()),
            ..Default::default()
        };
        assert_ne!(Fingerprint::of(&absent), Fingerprint::of(&empty));
    }

    #[test]
    fn test_separator_inside_value_is_escaped() {
        let a = PreferenceVector {
            room_type: Some("원룸|=월세".to_string()),
            contract_type: None,
            ..Default::default()
        };
        let b = PreferenceVector {
            room_type: Some("원룸".to_string()),
            contract_type: Some("월세".to_string()),
            ..Default::default()
        };
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
        assert!(Fingerprint::of(&a).as_str().contains("원룸\\|=월세"));
    }

    #[test]
    fn test_empty_price_range_is_absent() {
        let empty = PreferenceVector {
            price_range: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(
            Fingerprint::of(&empty),
            Fingerprint::of(&PreferenceVector::default())
        );
    }

    #[test]
    fn test_dominant_category() {
        let vector = PreferenceVector {
            transport_score: Some(0.3),
            cafe_score: Some(0.9),
            leisure_score: Some(0.9),
            ..Default::default()
        };
        assert_eq!(vector.dominant_category(), Some(Category::Cafe));
        assert_eq!(PreferenceVector::default().dominant_category(), None);
    }

    #[test]
    fn test_deserialize_camel_case_with_missing_fields() {
        let vector: PreferenceVector = serde_json::from_str(
            r#"{"transportScore":0.8,"priceRange":[500000,1000000],"roomType":"원룸"}"#,
        )
        .unwrap();

        assert_eq!(vector.transport_score, Some(0.8));
        assert_eq!(vector.price_range, Some(vec![500000, 1000000]));
        assert_eq!(vector.room_type.as_deref(), Some("원룸"));
        assert_eq!(vector.age, None);
    }
}
