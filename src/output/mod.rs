//! Output module for reporting crawl results
//!
//! This module handles:
//! - Summarizing the reports of a multi-shop crawl
//! - Reading crawl statistics back from the database

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics, ShopStatistics};

use crate::crawler::CrawlReport;

/// Totals across the shops of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub shops: usize,
    pub pages_visited: u64,
    pub fetch_failures: u64,
    pub products_stored: u64,
    pub images_stored: u64,
    pub duplicates: u64,
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn from_reports(reports: &[CrawlReport]) -> Self {
        reports.iter().fold(
            Self {
                shops: reports.len(),
                ..Self::default()
            },
            |mut summary, report| {
                summary.pages_visited += report.pages_visited;
                summary.fetch_failures += report.fetch_failures;
                summary.products_stored += report.products_stored;
                summary.images_stored += report.images_stored;
                summary.duplicates += report.duplicates;
                summary.cancelled |= report.cancelled;
                summary
            },
        )
    }
}

/// Prints one line per shop followed by the totals
pub fn print_crawl_summary(reports: &[CrawlReport]) {
    println!("=== Crawl Summary ===\n");
    for report in reports {
        println!("  {}", report);
    }

    let summary = CrawlSummary::from_reports(reports);
    println!();
    println!(
        "Total: {} shops, {} pages visited ({} failed), {} products and {} images stored, {} duplicates discarded",
        summary.shops,
        summary.pages_visited,
        summary.fetch_failures,
        summary.products_stored,
        summary.images_stored,
        summary.duplicates
    );
    if summary.cancelled {
        println!("Crawl was interrupted; run again to resume.");
    }
}
