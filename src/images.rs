//! Image lookup boundary.
//!
//! [`DuckDuckGoImages`] uses the public image search: fetch the HTML results page
//! to obtain the per-query `vqd` token, then query the `i.js` JSON endpoint.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use url::Url;

const DDG_BASE_URL: &str = "https://duckduckgo.com/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum ImageSearchError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Image search returned status {0}")]
    Status(u16),
    #[error("Search token not found in results page")]
    TokenNotFound,
    #[error("Invalid search URL: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Image URLs for `query`, best match first.
    async fn search(&self, query: &str) -> Result<Vec<String>, ImageSearchError>;
}

#[derive(Debug, Deserialize)]
struct ImageResults {
    #[serde(default)]
    results: Vec<ImageResult>,
}

#[derive(Debug, Deserialize)]
struct ImageResult {
    #[serde(default)]
    image: Option<String>,
}

fn re_vqd() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"vqd=["']?([0-9-]+)["']?"#).unwrap())
}

/// Pull the `vqd` token out of a results page.
pub fn extract_vqd(html: &str) -> Option<String> {
    re_vqd()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct DuckDuckGoImages {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DuckDuckGoImages {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DDG_BASE_URL.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn page_url(&self, query: &str) -> Result<Url, ImageSearchError> {
        Ok(Url::parse_with_params(
            &self.base_url,
            &[("q", query), ("iax", "images"), ("ia", "images")],
        )?)
    }

    fn results_url(&self, query: &str, vqd: &str) -> Result<Url, ImageSearchError> {
        let base = Url::parse(&self.base_url)?.join("i.js")?;
        Ok(Url::parse_with_params(
            base.as_str(),
            &[
                ("l", "us-en"),
                ("o", "json"),
                ("q", query),
                ("vqd", vqd),
                ("f", ",,,,,"),
                ("p", "1"),
            ],
        )?)
    }

    async fn fetch_token(&self, query: &str) -> Result<String, ImageSearchError> {
        let resp = self
            .http
            .get(self.page_url(query)?)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ImageSearchError::Status(resp.status().as_u16()));
        }
        let html = resp.text().await?;
        extract_vqd(&html).ok_or(ImageSearchError::TokenNotFound)
    }
}

#[async_trait]
impl ImageSearch for DuckDuckGoImages {
    async fn search(&self, query: &str) -> Result<Vec<String>, ImageSearchError> {
        let vqd = self.fetch_token(query).await?;

        let resp = self
            .http
            .get(self.results_url(query, &vqd)?)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::REFERER, self.base_url.as_str())
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ImageSearchError::Status(resp.status().as_u16()));
        }

        let urls = image_urls(resp.json().await?);
        log::debug!("Image search for '{}' returned {} results", query, urls.len());
        Ok(urls)
    }
}

/// Non-empty image URLs in result order.
fn image_urls(results: ImageResults) -> Vec<String> {
    results
        .results
        .into_iter()
        .filter_map(|r| r.image)
        .filter(|u| !u.trim().is_empty())
        .collect()
}
