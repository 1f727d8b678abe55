//! Crawler module for walking a storefront
//!
//! This module contains the core crawling logic, including:
//! - Page fetching behind the [`PageFetcher`] trait
//! - The frontier of pending and visited URLs
//! - Fixed-interval rate limiting
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod throttle;

pub use coordinator::{crawl, Crawl, CrawlReport};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher, RenderedPage};
pub use frontier::{Frontier, UrlState};
pub use throttle::Throttle;
