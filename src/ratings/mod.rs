mod client;

pub use client::{DrugRatingsClient, RatingSource};
