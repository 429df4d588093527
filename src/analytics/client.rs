use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use super::credentials::TokenSource;
use super::parsers::{MalformedPathPolicy, resolve_item_ids};
use super::report::{BatchGetRequest, BatchGetResponse};
use crate::config::settings::AnalyticsSettings;
use crate::domain::RankedPage;
use crate::http::HttpClient;

const BATCH_GET_PATH: &str = "/v4/reports:batchGet";

/// Ranks drug pages by popularity
#[async_trait]
pub trait PopularitySource: Send + Sync {
    /// At most `limit` pages, most viewed first.
    async fn fetch_top_pages(&self, limit: usize) -> Result<Vec<RankedPage>>;

    /// Drug ids of the most viewed pages, in rank order.
    async fn fetch_top_item_ids(
        &self,
        limit: usize,
        policy: MalformedPathPolicy,
    ) -> Result<Vec<String>> {
        let pages = self.fetch_top_pages(limit).await?;
        Ok(resolve_item_ids(&pages, policy)?)
    }
}

/// Google Analytics Reporting API v4 client
pub struct GoogleAnalyticsClient {
    http: HttpClient,
    tokens: Arc<dyn TokenSource>,
    settings: AnalyticsSettings,
}

impl GoogleAnalyticsClient {
    pub fn new(http: HttpClient, tokens: Arc<dyn TokenSource>, settings: AnalyticsSettings) -> Self {
        Self {
            http,
            tokens,
            settings,
        }
    }

    fn build_batch_get_url(&self) -> String {
        format!(
            "{}{}",
            self.settings.api_base_url.trim_end_matches('/'),
            BATCH_GET_PATH
        )
    }
}

#[async_trait]
impl PopularitySource for GoogleAnalyticsClient {
    async fn fetch_top_pages(&self, limit: usize) -> Result<Vec<RankedPage>> {
        info!(
            "Fetching top {} pages for view {} ({} - {})",
            limit, self.settings.view_id, self.settings.start_date, self.settings.end_date
        );

        let token = self.tokens.access_token().await?;
        let request = BatchGetRequest::top_pages(&self.settings, limit);
        let url = self.build_batch_get_url();

        let response: BatchGetResponse = self.http.post_json(&url, &token, &request).await?;
        let pages = response.into_ranked_pages(limit);

        info!("  → {} ranked pages", pages.len());
        Ok(pages)
    }
}
