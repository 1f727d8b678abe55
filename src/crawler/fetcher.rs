//! Page fetching
//!
//! The crawl loop only sees the [`PageFetcher`] trait. [`HttpFetcher`] is the
//! plain-HTTP implementation: it does not execute JavaScript, so a page whose
//! wait selector matches nothing in the served HTML is reported as
//! [`FetchError::MissingSelector`], the static counterpart of a render timeout.

use crate::url::CrawlUrl;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Expected HTML, got '{0}'")]
    ContentType(String),

    #[error("Wait selector '{0}' matched nothing")]
    MissingSelector(String),
}

/// A fetched HTML page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Canonical URL the page was served from, after redirects
    pub url: CrawlUrl,
    pub html: String,
}

/// Loads pages for the crawl loop
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, failing if it takes longer than `timeout` or if
    /// `wait_selector` never matches
    async fn load(
        &self,
        url: &CrawlUrl,
        wait_selector: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header to send
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify_error(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else if e.is_connect() {
        FetchError::Network(format!("Connection failed: {}", e))
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Returns true for `text/html` and XHTML media types, ignoring case
fn is_html(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == "text/html" || media_type == "application/xhtml+xml"
}

/// Returns true if the selector matches anything in the document
fn has_match(html: &str, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(selector) => Html::parse_document(html).select(&selector).next().is_some(),
        Err(_) => false,
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn load(
        &self,
        url: &CrawlUrl,
        wait_selector: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::ContentType(content_type));
        }

        let final_url =
            CrawlUrl::parse(response.url().as_str()).unwrap_or_else(|_| url.clone());

        let html = response
            .text()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        if !has_match(&html, wait_selector) {
            return Err(FetchError::MissingSelector(wait_selector.to_string()));
        }

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }
}
