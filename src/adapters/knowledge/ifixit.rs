//! iFixit Connector - KnowledgeConnector against the iFixit public API.
//!
//! Three endpoints of API 2.0:
//! - `search/{query}?filter=device` for device hits (top 3)
//! - `wikis/CATEGORY/{title}` for guide listings (top 5)
//! - `guides/{id}` for full steps
//!
//! Step cleanup is deterministic: each step's line texts are joined with a
//! single space and only the first image is kept, so identical guides
//! always produce identical output.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::foundation::GuideId;
use crate::ports::{
    ConnectorError, DeviceHit, Guide, GuideStep, GuideSummary, KnowledgeConnector,
};

/// Device hits returned per search.
const MAX_DEVICE_HITS: usize = 3;
/// Guide summaries returned per listing.
const MAX_GUIDE_LISTINGS: usize = 5;

/// Configuration for the iFixit connector.
#[derive(Debug, Clone)]
pub struct IFixitConfig {
    /// Base URL of the API (default: https://www.ifixit.com/api/2.0).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl IFixitConfig {
    /// Creates a configuration with default endpoint and timeout.
    pub fn new() -> Self {
        Self {
            base_url: "https://www.ifixit.com/api/2.0".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for IFixitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// iFixit implementation of the `KnowledgeConnector` port.
pub struct IFixitConnector {
    config: IFixitConfig,
    client: Client,
}

impl IFixitConnector {
    /// Creates a connector with the given configuration.
    pub fn new(config: IFixitConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    async fn get(&self, url: &str) -> Result<Response, ConnectorError> {
        self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Timeout {
                    timeout_secs: self.config.timeout.as_secs() as u32,
                }
            } else if e.is_connect() {
                ConnectorError::unavailable(format!("Connection failed: {}", e))
            } else {
                ConnectorError::unavailable(e.to_string())
            }
        })
    }
}

#[async_trait]
impl KnowledgeConnector for IFixitConnector {
    async fn search_device(&self, query: &str) -> Result<Vec<DeviceHit>, ConnectorError> {
        let url = format!(
            "{}/search/{}?filter=device",
            self.config.base_url,
            encode_path_segment(query)
        );
        let response = self.get(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(ConnectorError::unavailable(format!(
                "search returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::protocol(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .take(MAX_DEVICE_HITS)
            .map(|r| DeviceHit {
                title: r.display_title.unwrap_or(r.title.unwrap_or_default()),
                url: r.url.unwrap_or_default(),
            })
            .filter(|hit| !hit.title.is_empty())
            .collect())
    }

    async fn list_guides(&self, device_title: &str) -> Result<Vec<GuideSummary>, ConnectorError> {
        let url = format!(
            "{}/wikis/CATEGORY/{}",
            self.config.base_url,
            encode_path_segment(device_title)
        );
        let response = self.get(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(ConnectorError::unavailable(format!(
                "wiki lookup returned {}",
                response.status()
            )));
        }

        let body: WikiResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::protocol(e.to_string()))?;

        Ok(body
            .guides
            .into_iter()
            .take(MAX_GUIDE_LISTINGS)
            .map(|g| GuideSummary {
                id: GuideId::new(g.guideid),
                title: g.title.unwrap_or_default(),
                summary: g.summary.unwrap_or_default(),
            })
            .collect())
    }

    async fn get_guide_steps(&self, guide_id: GuideId) -> Result<Option<Guide>, ConnectorError> {
        let url = format!("{}/guides/{}", self.config.base_url, guide_id);
        let response = self.get(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ConnectorError::unavailable(format!(
                "guide lookup returned {}",
                response.status()
            )));
        }

        let body: GuideResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::protocol(e.to_string()))?;

        Ok(Some(clean_guide(body)))
    }
}

/// Deterministic cleanup of the raw guide payload.
fn clean_guide(raw: GuideResponse) -> Guide {
    let steps = raw
        .steps
        .into_iter()
        .map(|step| {
            let text = step
                .lines
                .iter()
                .filter_map(|line| line.text_raw.as_deref())
                .collect::<Vec<_>>()
                .join(" ");
            let image_url = step
                .media
                .and_then(|m| m.images.into_iter().next())
                .and_then(|img| img.original);
            GuideStep { text, image_url }
        })
        .collect();

    Guide {
        title: raw.title.unwrap_or_default(),
        steps,
        url: raw.url.unwrap_or_default(),
    }
}

/// Percent-encodes a path segment (RFC 3986 unreserved characters pass).
fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

// ----- iFixit API Types -----

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    display_title: Option<String>,
    title: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WikiResponse {
    #[serde(default)]
    guides: Vec<WikiGuide>,
}

#[derive(Debug, Deserialize)]
struct WikiGuide {
    guideid: u64,
    title: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuideResponse {
    title: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    lines: Vec<RawLine>,
    media: Option<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct RawLine {
    text_raw: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    #[serde(default)]
    images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    original: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_guide() -> GuideResponse {
        serde_json::from_value(serde_json::json!({
            "title": "DualSense Joystick Replacement",
            "url": "https://www.ifixit.com/Guide/8247",
            "steps": [
                {
                    "lines": [
                        {"text_raw": "Power off the controller."},
                        {"text_raw": "Place it face down."}
                    ],
                    "media": {"images": [
                        {"original": "https://img.example.com/1.jpg"},
                        {"original": "https://img.example.com/1b.jpg"}
                    ]}
                },
                {
                    "lines": [{"text_raw": "Remove the four screws."}],
                    "media": null
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn clean_guide_joins_lines_and_keeps_first_image() {
        let guide = clean_guide(raw_guide());

        assert_eq!(guide.title, "DualSense Joystick Replacement");
        assert_eq!(guide.steps.len(), 2);
        assert_eq!(
            guide.steps[0].text,
            "Power off the controller. Place it face down."
        );
        assert_eq!(
            guide.steps[0].image_url.as_deref(),
            Some("https://img.example.com/1.jpg")
        );
        assert_eq!(guide.steps[1].text, "Remove the four screws.");
        assert!(guide.steps[1].image_url.is_none());
    }

    #[test]
    fn clean_guide_is_deterministic() {
        assert_eq!(clean_guide(raw_guide()), clean_guide(raw_guide()));
    }

    #[test]
    fn clean_guide_tolerates_missing_fields() {
        let raw: GuideResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let guide = clean_guide(raw);

        assert_eq!(guide.title, "");
        assert!(guide.steps.is_empty());
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_path_segment("PlayStation 5"), "PlayStation%205");
        assert_eq!(encode_path_segment("safe-name_1.0~x"), "safe-name_1.0~x");
        assert_eq!(encode_path_segment("a/b?c"), "a%2Fb%3Fc");
    }

    #[test]
    fn search_response_parses_display_title_fallback() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "results": [
                {"display_title": "PlayStation 5", "url": "https://x/ps5"},
                {"title": "Xbox Series X", "url": "https://x/xsx"}
            ]
        }))
        .unwrap();

        let hits: Vec<DeviceHit> = body
            .results
            .into_iter()
            .map(|r| DeviceHit {
                title: r.display_title.unwrap_or(r.title.unwrap_or_default()),
                url: r.url.unwrap_or_default(),
            })
            .collect();

        assert_eq!(hits[0].title, "PlayStation 5");
        assert_eq!(hits[1].title, "Xbox Series X");
    }

    #[test]
    fn config_defaults_point_at_public_api() {
        let config = IFixitConfig::new();
        assert_eq!(config.base_url, "https://www.ifixit.com/api/2.0");
    }
}
