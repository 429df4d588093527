use serde::{Deserialize, Serialize};

/// Rating aggregate of a single drug, as returned by the ratings API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    name: String,
    rating_count: u64,
    average_rating: f64, // 0.0 - 5.0
}

impl RatingRecord {
    pub fn new(name: impl Into<String>, rating_count: u64, average_rating: f64) -> Self {
        Self {
            name: name.into(),
            rating_count,
            average_rating,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rating_count(&self) -> u64 {
        self.rating_count
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }
}

/// One analytics row: a drug page and its view count over the report window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPage {
    /// 0-indexed, most viewed first
    pub rank: usize,
    pub page_path: String,
    pub page_title: String,
    pub page_views: u64,
}
