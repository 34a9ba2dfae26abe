use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::{Result, SearxngMcpError};
use crate::model::{ConfigResponse, SearchParams, SearchResponse};

/// Thin client for a SearXNG instance's JSON API.
#[derive(Clone)]
pub struct SearxngClient {
    http: Client,
    base_url: Url,
}

impl SearxngClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        let url = self.endpoint("/search")?;
        let request = self.http.get(url).query(&params.query_pairs());
        self.fetch(request, "SearXNG search").await
    }

    pub async fn config(&self) -> Result<ConfigResponse> {
        let url = self.endpoint("/config")?;
        self.fetch(self.http.get(url), "SearXNG config").await
    }

    /// Absolute-path join: any path on the base URL is replaced.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SearxngMcpError::ConfigError(format!("bad endpoint {path}: {e}")))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &'static str,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearxngMcpError::RemoteStatus {
                context,
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}
