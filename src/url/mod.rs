//! URL handling module for Shoptrawl
//!
//! This module turns the raw `href` values found on storefront pages into
//! canonical [`CrawlUrl`] keys and classifies them against a shop's link
//! patterns.

mod classify;
mod normalize;

// Re-export main functions
pub use classify::{classify, LinkKind};
pub use normalize::{normalize, CrawlUrl};
