pub mod analytics;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod ratings;
pub mod report;
pub mod services;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;
use std::sync::Arc;

use crate::analytics::{GoogleAnalyticsClient, ServiceAccountTokenProvider};
use crate::cli::Command;
use crate::config::AppConfig;
use crate::http::HttpClient;
use crate::ratings::DrugRatingsClient;
use crate::report::ConsoleReporter;
use crate::services::{PopularityReportJob, Scheduler};

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command.unwrap_or_default()
}

pub fn handle_schedule(cron: Option<&str>, limit: Option<usize>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::from_env();
        let limit = limit.unwrap_or(config.report.max_rank);
        let expression = cron.unwrap_or(&config.report.schedule).to_string();
        let job = Arc::new(build_job(&config)?);

        let callback = move |limit| run_tick(Arc::clone(&job), limit);
        // Registration failures are already logged; nothing will ever run.
        let Some(handle) = Scheduler::schedule_cron(&expression, callback, limit) else {
            return Ok(());
        };

        handle.join().await;
        Ok(())
    })
}

pub fn handle_once(limit: Option<usize>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::from_env();
        let limit = limit.unwrap_or(config.report.max_rank);
        let job = Arc::new(build_job(&config)?);
        run_tick(job, limit).await
    })
}

/// Wire the production clients into a report job.
pub fn build_job(config: &AppConfig) -> Result<PopularityReportJob> {
    let http = HttpClient::new(config.http.user_agent, config.http.timeout_secs)?;
    let tokens = Arc::new(ServiceAccountTokenProvider::new(
        http.clone(),
        &config.analytics.key_file,
        config.analytics.scope,
    ));
    let popularity = Arc::new(GoogleAnalyticsClient::new(
        http.clone(),
        tokens,
        config.analytics.clone(),
    ));
    let ratings = Arc::new(DrugRatingsClient::new(http, &config.ratings.api_root));
    let reporter = Arc::new(ConsoleReporter::stdout());

    Ok(PopularityReportJob::new(popularity, ratings, reporter, &config.report))
}

async fn run_tick(job: Arc<PopularityReportJob>, limit: usize) -> Result<()> {
    info!("=== Reporting top {} drugs ===", limit);
    let reported = job.run(limit).await?;
    info!("=== Reported {} drugs ===", reported);
    Ok(())
}
