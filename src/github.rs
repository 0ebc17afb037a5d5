//! GitHub issue search over the REST API using `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::harvest::scanner::SearchQuery;
use crate::model::Issue;
use crate::traits::{CollectError, ConfigError, ExporterError, SearchClient};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchIssuesResponse {
    #[serde(default)]
    incomplete_results: bool,
    items: Vec<Issue>,
}

/// Client for `GET /search/issues`.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
}

impl GitHubClient {
    /// Creates a client. An empty token sends unauthenticated requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidToken`] if the token cannot be sent as
    /// a header value, or the HTTP client error if the client fails to build.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, ExporterError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchClient for GitHubClient {
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, CollectError> {
        let url = format!("{}/search/issues", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query.q.as_str()),
                ("sort", query.sort),
                ("order", query.order),
            ])
            .query(&[("page", query.page), ("per_page", query.per_page)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let page: SearchIssuesResponse = response.json().await?;
        debug!(
            items = page.items.len(),
            incomplete = page.incomplete_results,
            "search page received"
        );
        Ok(page.items)
    }
}
