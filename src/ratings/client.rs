use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::domain::RatingRecord;
use crate::http::HttpClient;

/// Looks up the rating aggregate of a drug
#[async_trait]
pub trait RatingSource: Send + Sync {
    async fn fetch_rating(&self, item_id: &str) -> Result<RatingRecord>;
}

/// Drug body returned by `GET /drugs/{id}`; other fields are ignored.
///
/// A drug nobody has rated yet may carry `null` aggregates.
#[derive(Debug, Deserialize)]
struct DrugResponse {
    name: String,
    #[serde(default)]
    count_ratings: Option<u64>,
    #[serde(default)]
    avg_rating: Option<f64>,
}

impl From<DrugResponse> for RatingRecord {
    fn from(drug: DrugResponse) -> Self {
        RatingRecord::new(
            drug.name,
            drug.count_ratings.unwrap_or_default(),
            drug.avg_rating.unwrap_or_default(),
        )
    }
}

/// Drug review API client
pub struct DrugRatingsClient {
    http: HttpClient,
    api_root: String,
}

impl DrugRatingsClient {
    pub fn new(http: HttpClient, api_root: &str) -> Self {
        Self {
            http,
            api_root: api_root.trim_end_matches('/').to_string(),
        }
    }

    fn build_drug_url(&self, item_id: &str) -> String {
        format!("{}/drugs/{}", self.api_root, urlencoding::encode(item_id))
    }
}

#[async_trait]
impl RatingSource for DrugRatingsClient {
    async fn fetch_rating(&self, item_id: &str) -> Result<RatingRecord> {
        let url = self.build_drug_url(item_id);
        debug!("Fetching rating for drug {} from {}", item_id, url);

        // Reviews are not needed for the aggregate
        let drug: DrugResponse = self
            .http
            .get_json(&url, &[("include_reviews", "false")])
            .await?;

        Ok(drug.into())
    }
}
