use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use log::{debug, info};
use std::sync::Arc;

use crate::analytics::{MalformedPathPolicy, PopularitySource};
use crate::config::settings::ReportSettings;
use crate::ratings::RatingSource;
use crate::report::Reporter;

/// Looks up and prints the ratings of the most viewed drugs
pub struct PopularityReportJob {
    popularity: Arc<dyn PopularitySource>,
    ratings: Arc<dyn RatingSource>,
    reporter: Arc<dyn Reporter>,
    max_in_flight: usize,
    malformed_paths: MalformedPathPolicy,
}

impl PopularityReportJob {
    pub fn new(
        popularity: Arc<dyn PopularitySource>,
        ratings: Arc<dyn RatingSource>,
        reporter: Arc<dyn Reporter>,
        settings: &ReportSettings,
    ) -> Self {
        Self {
            popularity,
            ratings,
            reporter,
            max_in_flight: settings.max_in_flight.max(1),
            malformed_paths: settings.malformed_paths,
        }
    }

    /// Report the top `limit` drugs in rank order and return how many were printed.
    ///
    /// Up to `max_in_flight` rating lookups run at once, but records are
    /// emitted strictly by rank. The first failed lookup (in rank order) ends
    /// the run: earlier records stay printed, nothing after it is printed.
    pub async fn run(&self, limit: usize) -> Result<usize> {
        anyhow::ensure!(limit > 0, "Report limit must be at least 1");

        let item_ids = self
            .popularity
            .fetch_top_item_ids(limit, self.malformed_paths)
            .await
            .context("Failed to rank drugs by popularity")?;
        info!("  → {} drugs to report", item_ids.len());

        let mut records = stream::iter(item_ids.into_iter().enumerate())
            .map(move |(rank, item_id)| async move {
                self.ratings
                    .fetch_rating(&item_id)
                    .await
                    .with_context(|| format!("Failed to fetch rating for rank {} (drug {})", rank + 1, item_id))
            })
            .buffered(self.max_in_flight);

        let mut reported = 0;
        while let Some(record) = records.next().await {
            let record = record?;
            debug!("Reporting {}", record.name());
            self.reporter.report(&record);
            reported += 1;
        }

        Ok(reported)
    }
}
