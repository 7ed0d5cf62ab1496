//! Grounded Search Connector - Web search over an answer-style search API.
//!
//! Posts the query to a configured search endpoint and assembles a
//! `GroundedAnswer`: the API's synthesized answer when it provides one,
//! otherwise the top result snippets, always with the result pages as
//! citations.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{Citation, ConnectorError, GroundedAnswer, SearchConnector};

/// Configuration for the grounded search connector.
#[derive(Debug, Clone)]
pub struct GroundedSearchConfig {
    /// Search API endpoint.
    pub endpoint: String,
    /// API key for the search service.
    api_key: Secret<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum results to request.
    pub max_results: usize,
}

impl GroundedSearchConfig {
    /// Creates a configuration for the given endpoint and key.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: Secret::new(api_key.into()),
            timeout: Duration::from_secs(20),
            max_results: 5,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum result count.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// HTTP implementation of the `SearchConnector` port.
pub struct GroundedSearchConnector {
    config: GroundedSearchConfig,
    client: Client,
}

impl GroundedSearchConnector {
    /// Creates a connector with the given configuration.
    pub fn new(config: GroundedSearchConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl SearchConnector for GroundedSearchConnector {
    async fn web_search(&self, query: &str) -> Result<GroundedAnswer, ConnectorError> {
        let body = SearchApiRequest {
            query: query.to_string(),
            max_results: self.config.max_results,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectorError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else {
                    ConnectorError::unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ConnectorError::unavailable(format!(
                "search returned {}",
                response.status()
            )));
        }

        let body: SearchApiResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::protocol(e.to_string()))?;

        Ok(assemble_answer(body))
    }
}

/// Builds the grounded answer from the API response.
fn assemble_answer(body: SearchApiResponse) -> GroundedAnswer {
    let citations: Vec<Citation> = body
        .results
        .iter()
        .map(|r| Citation {
            title: r.title.clone().unwrap_or_default(),
            url: r.url.clone().unwrap_or_default(),
        })
        .filter(|c| !c.url.is_empty())
        .collect();

    let text = match body.answer {
        Some(answer) if !answer.trim().is_empty() => answer,
        _ => body
            .results
            .iter()
            .filter_map(|r| r.content.as_deref())
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    GroundedAnswer::new(text, citations)
}

#[derive(Debug, Serialize)]
struct SearchApiRequest {
    query: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchApiResponse {
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchApiResult>,
}

#[derive(Debug, Deserialize)]
struct SearchApiResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}
