use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::errors::{fetch_context, parse_context, with_fetch_context};

/// JSON-over-HTTP client shared by the analytics and ratings clients
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = Self::build_client(user_agent, timeout_secs)?;
        Ok(Self { client })
    }

    pub async fn get_json<Q, T>(&self, url: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.get(url).query(query);
        self.send_json(request, url).await
    }

    pub async fn post_json<B, T>(&self, url: &str, bearer: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(url).bearer_auth(bearer).json(body);
        self.send_json(request, url).await
    }

    pub async fn post_form<F, T>(&self, url: &str, form: &F) -> Result<T>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(url).form(form);
        self.send_json(request, url).await
    }

    fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    async fn send_json<T>(&self, request: RequestBuilder, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = with_fetch_context(request.send().await, url)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{}: API returned status {}: {}", fetch_context(url), status, body.trim());
        }

        response
            .json::<T>()
            .await
            .with_context(|| parse_context(&format!("response from {}", url)))
    }
}
