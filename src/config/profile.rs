//! Compiled, immutable per-shop crawl profile

use crate::config::types::{CrawlerConfig, PatternConfig, ShopConfig};
use crate::url::CrawlUrl;
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use scraper::Selector;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Compiled link classification patterns
#[derive(Debug, Clone)]
pub struct LinkPatterns {
    pub(crate) product: Regex,
    pub(crate) category: Regex,
    pub(crate) pagination: Regex,
}

impl LinkPatterns {
    /// Compiles the configured pattern fragments
    pub fn compile(config: &PatternConfig) -> ConfigResult<Self> {
        Ok(Self {
            product: compile_pattern("product", &config.product)?,
            category: compile_pattern("category", &config.category)?,
            pagination: compile_pattern("pagination", &config.pagination)?,
        })
    }
}

fn compile_pattern(key: &str, fragment: &str) -> ConfigResult<Regex> {
    if fragment.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}' pattern cannot be empty",
            key
        )));
    }

    Regex::new(fragment)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}' pattern '{}': {}", key, fragment, e)))
}

fn compile_selector(key: &str, css: &str) -> ConfigResult<Selector> {
    Selector::parse(css).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}' selector '{}': {:?}", key, css, e))
    })
}

fn compile_selectors(
    selectors: &BTreeMap<String, String>,
) -> ConfigResult<BTreeMap<String, Selector>> {
    selectors
        .iter()
        .map(|(key, css)| Ok((key.clone(), compile_selector(key, css)?)))
        .collect()
}

/// Everything the crawler needs to know about one storefront
///
/// A profile is built once before a crawl starts and shared read-only by the
/// crawl loop, so every pattern and selector is compiled up front.
#[derive(Clone)]
pub struct ShopProfile {
    name: String,
    base_url: CrawlUrl,
    start_url: CrawlUrl,
    rate_limit: Duration,
    timeout: Duration,
    wait_for_selector: String,
    patterns: LinkPatterns,
    metadata_selectors: BTreeMap<String, Selector>,
    image_selectors: BTreeMap<String, Selector>,
}

impl ShopProfile {
    /// Builds a profile from a shop entry, falling back to crawler defaults
    /// for anything the shop does not override
    pub fn from_config(shop: &ShopConfig, defaults: &CrawlerConfig) -> ConfigResult<Self> {
        let base_url = CrawlUrl::parse(&shop.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Shop '{}' base-url: {}", shop.name, e))
        })?;

        let start_url = match &shop.start_url {
            Some(raw) => CrawlUrl::parse(raw).map_err(|e| {
                ConfigError::InvalidUrl(format!("Shop '{}' start-url: {}", shop.name, e))
            })?,
            None => base_url.clone(),
        };

        let rate_limit_seconds = shop
            .rate_limit_seconds
            .unwrap_or(defaults.rate_limit_seconds);
        let rate_limit = Duration::try_from_secs_f64(rate_limit_seconds).map_err(|e| {
            ConfigError::Validation(format!(
                "Shop '{}': invalid rate limit {}: {}",
                shop.name, rate_limit_seconds, e
            ))
        })?;

        let wait_for_selector = shop
            .wait_for_selector
            .clone()
            .unwrap_or_else(|| defaults.wait_for_selector.clone());
        compile_selector("wait-for-selector", &wait_for_selector)?;

        Ok(Self {
            name: shop.name.clone(),
            base_url,
            start_url,
            rate_limit,
            timeout: Duration::from_secs(shop.timeout_seconds.unwrap_or(defaults.timeout_seconds)),
            wait_for_selector,
            patterns: LinkPatterns::compile(&shop.patterns)?,
            metadata_selectors: compile_selectors(&shop.metadata_selectors)?,
            image_selectors: compile_selectors(&shop.image_selectors)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical base URL; progress and pending URLs are keyed by it
    pub fn base_url(&self) -> &CrawlUrl {
        &self.base_url
    }

    pub fn start_url(&self) -> &CrawlUrl {
        &self.start_url
    }

    pub fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn wait_for_selector(&self) -> &str {
        &self.wait_for_selector
    }

    pub fn patterns(&self) -> &LinkPatterns {
        &self.patterns
    }

    pub fn metadata_selectors(&self) -> &BTreeMap<String, Selector> {
        &self.metadata_selectors
    }

    pub fn image_selectors(&self) -> &BTreeMap<String, Selector> {
        &self.image_selectors
    }

    /// Returns true if the URL lives on this shop's host (and port)
    pub fn is_same_site(&self, url: &CrawlUrl) -> bool {
        url.host() == self.base_url.host() && url.port() == self.base_url.port()
    }
}

impl fmt::Debug for ShopProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopProfile")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("start_url", &self.start_url)
            .field("rate_limit", &self.rate_limit)
            .field("timeout", &self.timeout)
            .field("wait_for_selector", &self.wait_for_selector)
            .field("patterns", &self.patterns)
            .field("metadata_fields", &self.metadata_selectors.keys().collect::<Vec<_>>())
            .field("image_groups", &self.image_selectors.keys().collect::<Vec<_>>())
            .finish()
    }
}
