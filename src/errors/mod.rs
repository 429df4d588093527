use anyhow::Context as _;
use thiserror::Error;

/// Reasons a page path does not yield a drug id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("page path '{path}' has fewer than three segments")]
    TooFewSegments { path: String },
    #[error("page path '{path}' has an empty item segment")]
    EmptyItemId { path: String },
}

/// Add context to fetch errors
pub fn fetch_context(url: &str) -> String {
    format!("Failed to fetch from: {}", url)
}

/// Add context to parse errors
pub fn parse_context(data_type: &str) -> String {
    format!("Failed to parse {}", data_type)
}

/// Add context to credential errors
pub fn auth_context(key_file: &str) -> String {
    format!("Failed to authenticate with service account key: {}", key_file)
}

/// Wrap result with fetch context
pub fn with_fetch_context<T, E>(result: Result<T, E>, url: &str) -> anyhow::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    result.context(fetch_context(url))
}

/// Wrap result with parse context
pub fn with_parse_context<T, E>(result: Result<T, E>, data_type: &str) -> anyhow::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    result.context(parse_context(data_type))
}
