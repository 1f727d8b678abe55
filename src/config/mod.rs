//! Configuration module for Shoptrawl
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file and compiling each shop entry into an immutable [`ShopProfile`].
//!
//! # Example
//!
//! ```no_run
//! use shoptrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shops.toml")).unwrap();
//! println!("Configured shops: {}", config.shops.len());
//! ```

mod parser;
mod profile;
mod types;
mod validation;

// Re-export types
pub use profile::{LinkPatterns, ShopProfile};
pub use types::{Config, CrawlerConfig, PatternConfig, ShopConfig, StorageConfig};

// Re-export parser functions
pub use parser::{build_profiles, compute_config_hash, load_config, load_config_with_hash};
