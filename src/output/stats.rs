//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::config::ShopProfile;
use crate::storage::{Collection, ProgressStore, RecordStore, StorageResult};

/// Progress of one configured shop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopStatistics {
    pub name: String,
    pub base_url: String,
    pub visited: u64,
    pub pending: u64,
}

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    pub shops: Vec<ShopStatistics>,

    /// Products stored across all shops
    pub products: u64,

    /// Image records stored across all shops
    pub images: u64,

    /// Image records whose bytes have been downloaded
    pub images_resolved: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `profiles` - The shops to report progress for
pub fn load_statistics<S>(storage: &S, profiles: &[ShopProfile]) -> StorageResult<CrawlStatistics>
where
    S: ProgressStore + RecordStore + ?Sized,
{
    let shops = profiles
        .iter()
        .map(|profile| {
            Ok(ShopStatistics {
                name: profile.name().to_string(),
                base_url: profile.base_url().to_string(),
                visited: storage.count_visited(profile.base_url())?,
                pending: storage.count_pending(profile.base_url())?,
            })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(CrawlStatistics {
        shops,
        products: storage.count(Collection::Products)?,
        images: storage.count(Collection::ImageMetadata)?,
        images_resolved: storage.count_with_blob(Collection::ImageMetadata)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Shops ({}):", stats.shops.len());
    for shop in &stats.shops {
        let status = if shop.visited == 0 {
            "not started"
        } else if shop.pending == 0 {
            "complete"
        } else {
            "in progress"
        };
        println!(
            "  {} ({}): {} visited, {} pending [{}]",
            shop.name, shop.base_url, shop.visited, shop.pending, status
        );
    }
    println!();

    println!("Records:");
    println!("  Products: {}", stats.products);
    println!("  Images: {}", stats.images);
    println!();

    let resolved_rate = if stats.images > 0 {
        (stats.images_resolved as f64 / stats.images as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Images Resolved: {:.1}% ({} / {} downloaded)",
        resolved_rate, stats.images_resolved, stats.images
    );
}
