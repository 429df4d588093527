//! Request and response shapes of the Analytics Reporting API v4 `batchGet`.
use serde::{Deserialize, Serialize};

use crate::config::settings::AnalyticsSettings;
use crate::domain::RankedPage;

pub const PAGE_VIEWS: &str = "ga:pageviews";
pub const PAGE_PATH: &str = "ga:pagePath";
pub const PAGE_TITLE: &str = "ga:pageTitle";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    pub report_requests: Vec<ReportRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub view_id: String,
    pub date_ranges: Vec<DateRange>,
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,
    pub dimension_filter_clauses: Vec<DimensionFilterClause>,
    pub order_bys: Vec<OrderBy>,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionFilterClause {
    pub operator: String,
    pub filters: Vec<DimensionFilter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilter {
    pub dimension_name: String,
    pub operator: String,
    pub expressions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub field_name: String,
    pub sort_order: String,
}

impl BatchGetRequest {
    /// Top `limit` drug pages by page views over the configured window.
    pub fn top_pages(settings: &AnalyticsSettings, limit: usize) -> Self {
        let request = ReportRequest {
            view_id: settings.view_id.clone(),
            date_ranges: vec![DateRange {
                start_date: settings.start_date.to_string(),
                end_date: settings.end_date.to_string(),
            }],
            metrics: vec![Metric {
                expression: PAGE_VIEWS.to_string(),
            }],
            dimensions: vec![
                Dimension {
                    name: PAGE_PATH.to_string(),
                },
                Dimension {
                    name: PAGE_TITLE.to_string(),
                },
            ],
            // Clauses combine with AND; there is only the path marker today.
            dimension_filter_clauses: vec![DimensionFilterClause {
                operator: "AND".to_string(),
                filters: vec![DimensionFilter {
                    dimension_name: PAGE_PATH.to_string(),
                    operator: "PARTIAL".to_string(),
                    expressions: vec![settings.path_marker.to_string()],
                }],
            }],
            order_bys: vec![OrderBy {
                field_name: PAGE_VIEWS.to_string(),
                sort_order: "DESCENDING".to_string(),
            }],
            page_size: limit,
        };

        Self {
            report_requests: vec![request],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchGetResponse {
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub data: ReportData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeValues {
    #[serde(default)]
    pub values: Vec<String>,
}

impl ReportRow {
    fn dimension(&self, index: usize) -> String {
        self.dimensions.get(index).cloned().unwrap_or_default()
    }

    fn page_views(&self) -> u64 {
        self.metrics
            .first()
            .and_then(|m| m.values.first())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

impl BatchGetResponse {
    /// Rows of the first report in provider order, at most `limit` of them.
    pub fn into_ranked_pages(self, limit: usize) -> Vec<RankedPage> {
        let rows = self
            .reports
            .into_iter()
            .next()
            .map(|report| report.data.rows)
            .unwrap_or_default();

        rows.iter()
            .take(limit)
            .enumerate()
            .map(|(rank, row)| RankedPage {
                rank,
                page_path: row.dimension(0),
                page_title: row.dimension(1),
                page_views: row.page_views(),
            })
            .collect()
    }
}
