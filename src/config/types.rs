use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Shoptrawl
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "shop")]
    pub shops: Vec<ShopConfig>,
}

/// Crawler defaults shared by every shop unless overridden per shop
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// User agent sent with every page request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Seconds to wait between two pages of the same shop
    #[serde(default = "default_rate_limit")]
    pub rate_limit_seconds: f64,

    /// Per-page fetch timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// CSS selector that must be present for a page to count as rendered
    #[serde(default = "default_wait_selector")]
    pub wait_for_selector: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            rate_limit_seconds: default_rate_limit(),
            timeout_seconds: default_timeout(),
            wait_for_selector: default_wait_selector(),
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database holding progress and records
    pub database_path: String,

    /// Directory where downloaded image bytes are kept
    pub blob_dir: String,
}

/// One storefront
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ShopConfig {
    /// Short name used on the command line and in logs
    pub name: String,

    /// Root of the storefront; progress is keyed by this URL
    pub base_url: String,

    /// First page to crawl; defaults to the base URL
    #[serde(default)]
    pub start_url: Option<String>,

    #[serde(default)]
    pub rate_limit_seconds: Option<f64>,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    #[serde(default)]
    pub wait_for_selector: Option<String>,

    pub patterns: PatternConfig,

    /// Field name -> CSS selector for product metadata
    pub metadata_selectors: BTreeMap<String, String>,

    /// Group name -> CSS selector for product images or their containers
    pub image_selectors: BTreeMap<String, String>,
}

/// URL patterns used to classify links
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    pub product: String,

    #[serde(default = "default_category_pattern")]
    pub category: String,

    #[serde(default = "default_pagination_pattern")]
    pub pagination: String,
}

fn default_user_agent() -> String {
    format!("shoptrawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_timeout() -> u64 {
    30
}

fn default_wait_selector() -> String {
    "img".to_string()
}

fn default_category_pattern() -> String {
    "/collections/".to_string()
}

fn default_pagination_pattern() -> String {
    "/page/[0-9]+".to_string()
}
