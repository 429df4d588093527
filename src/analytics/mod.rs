mod client;
pub mod credentials;
pub mod parsers;
pub mod report;

pub use client::{GoogleAnalyticsClient, PopularitySource};
pub use credentials::{ServiceAccountTokenProvider, StaticToken, TokenSource};
pub use parsers::{MalformedPathPolicy, extract_item_id};
