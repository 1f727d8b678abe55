use crate::config::profile::ShopProfile;
use crate::config::types::{Config, CrawlerConfig, ShopConfig, StorageConfig};
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Validates the entire configuration
///
/// Shop profiles are compiled here as well, so a bad pattern or selector is
/// rejected when the file is loaded rather than when the shop is first crawled.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_shops(&config.shops)?;

    for shop in &config.shops {
        ShopProfile::from_config(shop, &config.crawler)?;
    }

    Ok(())
}

/// Validates crawler defaults
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    validate_rate_limit(config.rate_limit_seconds)?;
    validate_timeout(config.timeout_seconds)?;

    if config.wait_for_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "wait_for_selector cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.blob_dir.is_empty() {
        return Err(ConfigError::Validation(
            "blob_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates shop entries that do not need compiling
fn validate_shops(shops: &[ShopConfig]) -> ConfigResult<()> {
    let mut names = HashSet::new();

    for shop in shops {
        validate_shop_name(&shop.name)?;

        if !names.insert(shop.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Shop name '{}' is used more than once",
                shop.name
            )));
        }

        let base = validate_http_url(&shop.base_url, "base-url")?;

        if let Some(start) = &shop.start_url {
            let start = validate_http_url(start, "start-url")?;
            if start.host_str() != base.host_str() {
                return Err(ConfigError::Validation(format!(
                    "Shop '{}': start-url host must match base-url host",
                    shop.name
                )));
            }
        }

        if let Some(seconds) = shop.rate_limit_seconds {
            validate_rate_limit(seconds)?;
        }

        if let Some(seconds) = shop.timeout_seconds {
            validate_timeout(seconds)?;
        }

        if shop.metadata_selectors.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Shop '{}' must define at least one metadata selector",
                shop.name
            )));
        }
    }

    Ok(())
}

/// Shop names are used as CLI arguments, so keep them simple
fn validate_shop_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "Shop name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Shop name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_http_url(raw: &str, field: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, raw
        )));
    }

    Ok(url)
}

fn validate_rate_limit(seconds: f64) -> ConfigResult<()> {
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        ConfigError::Validation(format!(
            "rate_limit_seconds must be a non-negative number of seconds, got {}: {}",
            seconds, e
        ))
    })?;
    Ok(())
}

fn validate_timeout(seconds: u64) -> ConfigResult<()> {
    if seconds == 0 {
        return Err(ConfigError::Validation(
            "timeout_seconds must be >= 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::PatternConfig;
    use std::collections::BTreeMap;

    fn shop(name: &str) -> ShopConfig {
        ShopConfig {
            name: name.to_string(),
            base_url: "https://shop.example.com".to_string(),
            start_url: None,
            rate_limit_seconds: None,
            timeout_seconds: None,
            wait_for_selector: None,
            patterns: PatternConfig {
                product: "/products/".to_string(),
                category: "/collections/".to_string(),
                pagination: "/page/[0-9]+".to_string(),
            },
            metadata_selectors: BTreeMap::from([("title".to_string(), "h1".to_string())]),
            image_selectors: BTreeMap::new(),
        }
    }

    fn config(shops: Vec<ShopConfig>) -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            storage: StorageConfig {
                database_path: "./test.db".to_string(),
                blob_dir: "./blobs".to_string(),
            },
            shops,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&config(vec![shop("demo")])).is_ok());
    }

    #[test]
    fn test_duplicate_shop_names() {
        let result = validate(&config(vec![shop("demo"), shop("demo")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_shop_name() {
        assert!(validate_shop_name("pas-normal").is_ok());
        assert!(validate_shop_name("shop_2").is_ok());

        assert!(validate_shop_name("").is_err());
        assert!(validate_shop_name("has space").is_err());
        assert!(validate_shop_name("dots.not.allowed").is_err());
    }

    #[test]
    fn test_base_url_must_be_http() {
        let mut bad = shop("demo");
        bad.base_url = "ftp://shop.example.com".to_string();
        let result = validate(&config(vec![bad]));
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_start_url_on_other_host() {
        let mut bad = shop("demo");
        bad.start_url = Some("https://elsewhere.example.org/".to_string());
        let result = validate(&config(vec![bad]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_negative_rate_limit() {
        let mut bad = shop("demo");
        bad.rate_limit_seconds = Some(-1.0);
        assert!(validate(&config(vec![bad])).is_err());

        let mut nan = shop("demo");
        nan.rate_limit_seconds = Some(f64::NAN);
        assert!(validate(&config(vec![nan])).is_err());
    }

    #[test]
    fn test_huge_rate_limit_is_an_error() {
        let mut bad = shop("demo");
        bad.rate_limit_seconds = Some(1e30);
        let result = validate(&config(vec![bad]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let mut defaults = config(vec![shop("demo")]);
        defaults.crawler.rate_limit_seconds = 1e30;
        assert!(matches!(validate(&defaults), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout() {
        let mut bad = shop("demo");
        bad.timeout_seconds = Some(0);
        assert!(validate(&config(vec![bad])).is_err());
    }

    #[test]
    fn test_missing_metadata_selectors() {
        let mut bad = shop("demo");
        bad.metadata_selectors.clear();
        assert!(validate(&config(vec![bad])).is_err());
    }

    #[test]
    fn test_bad_pattern_is_rejected_at_load() {
        let mut bad = shop("demo");
        bad.patterns.product = "/products/(".to_string();
        let result = validate(&config(vec![bad]));
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_bad_selector_is_rejected_at_load() {
        let mut bad = shop("demo");
        bad.metadata_selectors
            .insert("price".to_string(), "div[[".to_string());
        let result = validate(&config(vec![bad]));
        assert!(matches!(result, Err(ConfigError::InvalidSelector(_))));
    }
}
