use crate::config::profile::ShopProfile;
use crate::config::types::Config;
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the configuration they used.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Compiles the profiles of the selected shops
///
/// With `only` set, just the shop of that name is compiled; an unknown name is
/// a validation error.
pub fn build_profiles(config: &Config, only: Option<&str>) -> ConfigResult<Vec<ShopProfile>> {
    let selected: Vec<_> = config
        .shops
        .iter()
        .filter(|shop| only.map_or(true, |name| shop.name == name))
        .collect();

    if let Some(name) = only {
        if selected.is_empty() {
            return Err(ConfigError::Validation(format!(
                "No shop named '{}' in configuration",
                name
            )));
        }
    }

    selected
        .into_iter()
        .map(|shop| ShopProfile::from_config(shop, &config.crawler))
        .collect()
}
