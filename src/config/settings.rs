use log::warn;

use crate::analytics::MalformedPathPolicy;

pub const KEY_FILE_ENV: &str = "GOOGLE_ANALYTICS_AUTH_JSON";
pub const VIEW_ID_ENV: &str = "GOOGLE_ANALYTICS_VIEW_ID";
pub const RATINGS_API_ROOT_ENV: &str = "RATINGS_API_ROOT";

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub key_file: String,
    pub view_id: String,
    pub api_base_url: String,
    pub scope: &'static str,
    /// Substring identifying drug detail pages, e.g. `/medicine/{id}/reviews`.
    pub path_marker: &'static str,
    pub start_date: &'static str,
    pub end_date: &'static str,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            key_file: "./google_analytics_auth.json".to_string(),
            view_id: "228276979".to_string(),
            api_base_url: "https://analyticsreporting.googleapis.com".to_string(),
            scope: "https://www.googleapis.com/auth/analytics.readonly",
            path_marker: "medicine",
            start_date: "7daysAgo",
            end_date: "today",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RatingsSettings {
    pub api_root: String,
}

impl Default for RatingsSettings {
    fn default() -> Self {
        Self {
            api_root: "https://kusuri-miru-api-4b3a54cvqq-an.a.run.app/".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: &'static str,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "PopularDrugRatings/1.0",
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// How many of the most viewed drugs get reported per tick.
    pub max_rank: usize,
    /// Cron expression with a leading seconds field, evaluated in UTC.
    pub schedule: String,
    pub max_in_flight: usize,
    pub malformed_paths: MalformedPathPolicy,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            max_rank: 5,
            schedule: "0 0 * * * *".to_string(), // top of every hour
            max_in_flight: 1, // sequential; larger values fetch ahead but still print by rank
            malformed_paths: MalformedPathPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub analytics: AnalyticsSettings,
    pub ratings: RatingsSettings,
    pub http: HttpSettings,
    pub report: ReportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            analytics: AnalyticsSettings::default(),
            ratings: RatingsSettings::default(),
            http: HttpSettings::default(),
            report: ReportSettings::default(),
        }
    }

    /// Compiled-in defaults with the optional environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key_file) = non_empty(lookup(KEY_FILE_ENV)) {
            self.analytics.key_file = key_file;
        }

        if let Some(view_id) = non_empty(lookup(VIEW_ID_ENV)) {
            if view_id.chars().all(|c| c.is_ascii_digit()) {
                self.analytics.view_id = view_id;
            } else {
                warn!("Ignoring non-numeric {}: {}", VIEW_ID_ENV, view_id);
            }
        }

        if let Some(api_root) = non_empty(lookup(RATINGS_API_ROOT_ENV)) {
            self.ratings.api_root = api_root;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
