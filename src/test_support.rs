//! Shared fixtures for client and job tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::analytics::PopularitySource;
use crate::domain::{RankedPage, RatingRecord};
use crate::ratings::RatingSource;
use crate::services::scheduler::TickStats;

pub const TEST_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{}", addr)
}

/// Poll until `expected` ticks have finished, whatever their outcome.
pub async fn wait_for_finished(stats: &TickStats, expected: u64) {
    for _ in 0..200 {
        if stats.finished() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {} finished ticks, saw {}", expected, stats.finished());
}

pub fn page(rank: usize, path: &str) -> RankedPage {
    RankedPage {
        rank,
        page_path: path.to_string(),
        page_title: format!("title {}", rank),
        page_views: 1000 - rank as u64,
    }
}

/// In-memory popularity source returning canned pages.
pub struct StubPopularity {
    pages: Vec<RankedPage>,
}

impl StubPopularity {
    pub fn from_paths(paths: &[&str]) -> Self {
        let pages = paths
            .iter()
            .enumerate()
            .map(|(rank, path)| page(rank, path))
            .collect();
        Self { pages }
    }
}

#[async_trait]
impl PopularitySource for StubPopularity {
    async fn fetch_top_pages(&self, limit: usize) -> Result<Vec<RankedPage>> {
        Ok(self.pages.iter().take(limit).cloned().collect())
    }
}

/// In-memory ratings source with per-item latency and failures.
#[derive(Default)]
pub struct StubRatings {
    delays: HashMap<String, Duration>,
    failures: Vec<String>,
    requested: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubRatings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, item_id: &str, delay_ms: u64) -> Self {
        self.delays
            .insert(item_id.to_string(), Duration::from_millis(delay_ms));
        self
    }

    pub fn failing_for(mut self, item_id: &str) -> Self {
        self.failures.push(item_id.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("requested lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingSource for StubRatings {
    async fn fetch_rating(&self, item_id: &str) -> Result<RatingRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .expect("requested lock")
            .push(item_id.to_string());

        if let Some(delay) = self.delays.get(item_id) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.iter().any(|f| f == item_id) {
            anyhow::bail!("ratings API rejected {}", item_id);
        }

        Ok(RatingRecord::new(format!("drug-{}", item_id), 10, 4.5))
    }
}

/// Thread-safe in-memory sink for reporter output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().expect("buffer lock").clone();
        String::from_utf8(bytes)
            .expect("utf8 output")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
