//! HTTP resource source for a deployed site.
//!
//! Resources are resolved against a base URL, so a site served from a
//! sub-path (`https://user.github.io/blog`) works the same as one served
//! from the domain root.

use async_trait::async_trait;
use log::{debug, warn};

use super::source::{FetchError, ResourceFetcher, relative_path};

pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Full URL for a site-relative resource path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, relative_path(path))
    }
}

#[async_trait]
impl ResourceFetcher for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("GET {} failed: {} - {}", url, status.as_u16(), message);
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
