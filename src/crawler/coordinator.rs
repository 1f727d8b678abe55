//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the per-shop crawl loop. Each step:
//! - Takes the next URL off the frontier
//! - Fetches it through the [`PageFetcher`]
//! - Queues new same-site links
//! - Extracts and deduplicates records from product pages
//! - Persists progress, then pauses for the shop's rate limit
//!
//! A [`Crawl`] is a lazy sequence: it only advances when the next record is
//! asked for, and it resumes from persisted progress when started again.

use crate::config::ShopProfile;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::throttle::Throttle;
use crate::extract::parse_page;
use crate::record::{ExtractedRecord, HasIdentityHash, Image, Product};
use crate::storage::{CrawlStore, Deduplicator, ProgressStore};
use crate::url::{classify, normalize, CrawlUrl};
use chrono::Utc;
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of one crawl invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub shop: String,
    /// URLs processed by this invocation, failed fetches included
    pub pages_visited: u64,
    /// URLs visited across all invocations
    pub total_visited: u64,
    pub fetch_failures: u64,
    /// Dequeued URLs that were already visited
    pub skipped: u64,
    pub products_stored: u64,
    pub images_stored: u64,
    /// Records discarded because their identity was already stored
    pub duplicates: u64,
    pub cancelled: bool,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: visited {} pages ({} total, {} failed), stored {} products and {} images, discarded {} duplicates{}",
            self.shop,
            self.pages_visited,
            self.total_visited,
            self.fetch_failures,
            self.products_stored,
            self.images_stored,
            self.duplicates,
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}

/// A running crawl of one shop
pub struct Crawl {
    profile: ShopProfile,
    fetcher: Box<dyn PageFetcher>,
    store: Box<dyn CrawlStore>,
    cancel: CancellationToken,
    frontier: Frontier,
    dedup: Deduplicator,
    throttle: Throttle,
    ready: VecDeque<ExtractedRecord>,
    report: CrawlReport,
    started: Instant,
    finished: bool,
}

/// Starts (or resumes) a crawl of one shop
///
/// Loads the shop's persisted progress and seeds the frontier with the start
/// URL plus any URLs left pending by an earlier run. Nothing is fetched until
/// [`Crawl::next_record`] or [`Crawl::run`] is called.
///
/// # Errors
///
/// Fails if the persisted progress cannot be read.
pub fn crawl<F, S>(
    profile: ShopProfile,
    fetcher: F,
    store: S,
    cancel: CancellationToken,
) -> crate::Result<Crawl>
where
    F: PageFetcher + 'static,
    S: CrawlStore + 'static,
{
    let visited = store.load_visited(profile.base_url())?;
    let pending = store.load_pending(profile.base_url())?;

    let resumed = !visited.is_empty();
    let frontier = Frontier::resume(profile.start_url().clone(), visited, pending);

    if resumed {
        tracing::info!(
            "Resuming {}: {} visited, {} pending",
            profile.name(),
            frontier.visited_len(),
            frontier.pending_len()
        );
    } else {
        tracing::info!("Starting {} at {}", profile.name(), profile.start_url());
    }

    let report = CrawlReport {
        shop: profile.name().to_string(),
        ..CrawlReport::default()
    };

    Ok(Crawl {
        throttle: Throttle::new(profile.rate_limit()),
        profile,
        fetcher: Box::new(fetcher),
        store: Box::new(store),
        cancel,
        frontier,
        dedup: Deduplicator::new(),
        ready: VecDeque::new(),
        report,
        started: Instant::now(),
        finished: false,
    })
}

impl Crawl {
    /// Advances the crawl until a newly stored record is available
    ///
    /// Returns `None` once the frontier is exhausted or the crawl has been
    /// cancelled.
    pub async fn next_record(&mut self) -> Option<ExtractedRecord> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(record);
            }
            if self.finished {
                return None;
            }
            self.step().await;
        }
    }

    /// Drives the crawl to completion and reports what it did
    pub async fn run(mut self) -> CrawlReport {
        while let Some(record) = self.next_record().await {
            tracing::debug!(
                "Stored {} {} from {}",
                record.kind(),
                record.identity_hash(),
                record.source_url()
            );
        }

        let report = self.report();
        tracing::info!("Crawl finished in {:?}: {}", self.started.elapsed(), report);
        report
    }

    /// Counters so far
    pub fn report(&self) -> CrawlReport {
        let counters = self.dedup.counters();
        CrawlReport {
            total_visited: self.frontier.visited_len() as u64,
            products_stored: counters.products_stored,
            images_stored: counters.images_stored,
            duplicates: counters.duplicates,
            ..self.report.clone()
        }
    }

    pub fn profile(&self) -> &ShopProfile {
        &self.profile
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn store(&self) -> &dyn CrawlStore {
        self.store.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// One iteration of the crawl loop
    async fn step(&mut self) {
        if self.cancel.is_cancelled() {
            tracing::info!("Crawl of {} cancelled", self.profile.name());
            self.report.cancelled = true;
            self.finished = true;
            return;
        }

        let url = match self.frontier.dequeue() {
            Some(url) => url,
            None => {
                tracing::info!("Frontier for {} is empty, crawl complete", self.profile.name());
                self.finished = true;
                return;
            }
        };

        if self.frontier.is_visited(&url) {
            self.report.skipped += 1;
            return;
        }

        self.process_url(&url).await;
        self.report.pages_visited += 1;

        if self.report.pages_visited % 10 == 0 {
            let elapsed = self.started.elapsed();
            let rate = self.report.pages_visited as f64 / elapsed.as_secs_f64();
            tracing::info!(
                "Progress: {} pages crawled, {} in frontier, {} records stored, {:.2} pages/sec",
                self.report.pages_visited,
                self.frontier.pending_len(),
                self.dedup.counters().products_stored + self.dedup.counters().images_stored,
                rate
            );
        }

        self.throttle.pause(&self.cancel).await;
    }

    /// Fetches, explores and extracts one URL, then marks it visited
    ///
    /// Every failure here is logged and contained to this URL.
    async fn process_url(&mut self, url: &CrawlUrl) {
        tracing::debug!("Processing URL: {}", url);

        let page = match self
            .fetcher
            .load(url, self.profile.wait_for_selector(), self.profile.timeout())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                self.report.fetch_failures += 1;
                self.finish_url(url);
                return;
            }
        };

        // A redirected page is keyed by where it was served from
        let target = page.url.clone();
        if &target != url {
            if self.frontier.is_visited(&target) || !self.profile.is_same_site(&target) {
                tracing::debug!("Skipping {}: redirected to {}", url, target);
                self.report.skipped += 1;
                self.finish_url(url);
                return;
            }
            tracing::debug!("{} redirected to {}", url, target);
            self.finish_url(url);
        }

        let kind = classify(&self.profile, &target);
        tracing::debug!("Classified {} as {}", target, kind);

        let parsed = parse_page(&page.html, &self.profile, &target, kind);
        self.handle_discovered_links(&target, &parsed.links);

        if let Some((product, images)) = parsed.product {
            self.store_product(product, images);
        }

        self.finish_url(&target);
    }

    /// Normalizes the page's links and queues the new same-site ones
    fn handle_discovered_links(&mut self, url: &CrawlUrl, links: &[String]) {
        let mut discovered = Vec::new();

        for raw in links {
            let link = match normalize(url, raw) {
                Ok(link) => link,
                Err(e) => {
                    tracing::debug!("Dropping link {:?} on {}: {}", raw, url, e);
                    continue;
                }
            };

            if &link == url || !self.profile.is_same_site(&link) {
                continue;
            }

            if self.frontier.enqueue(link.clone()) {
                discovered.push(link);
            }
        }

        if discovered.is_empty() {
            return;
        }

        tracing::debug!("Queued {} new URLs from {}", discovered.len(), url);
        if let Err(e) = self
            .store
            .record_pending(self.profile.base_url(), &discovered)
        {
            tracing::error!("Failed to persist pending URLs from {}: {}", url, e);
        }
    }

    /// Runs the product and its images through the deduplicator
    fn store_product(&mut self, product: Product, images: Vec<Image>) {
        for image in images {
            self.admit(image.into());
        }
        self.admit(product.into());
    }

    fn admit(&mut self, record: ExtractedRecord) {
        let description = format!("{} {}", record.kind(), record.identity_hash());

        match self.dedup.admit(self.store.as_mut(), record) {
            Ok(Some(stored)) => self.ready.push_back(stored),
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to store {}: {}", description, e),
        }
    }

    fn finish_url(&mut self, url: &CrawlUrl) {
        self.frontier.mark_visited(url.clone());

        if let Err(e) = self
            .store
            .mark_visited(self.profile.base_url(), url, Utc::now())
        {
            tracing::error!("Failed to persist visit of {}: {}", url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, PatternConfig, ShopConfig};
    use crate::crawler::fetcher::{FetchError, RenderedPage};
    use crate::crawler::frontier::UrlState;
    use crate::record::IdentityHash;
    use crate::storage::{Collection, RecordStore, SqliteStorage};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Serves canned pages keyed by URL and records every load
    #[derive(Clone, Default)]
    struct StaticFetcher {
        pages: HashMap<String, String>,
        failures: HashMap<String, Duration>,
        redirects: HashMap<String, String>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl StaticFetcher {
        fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                format!("<html><body>{}</body></html>", body),
            );
            self
        }

        fn timeout(mut self, url: &str) -> Self {
            self.failures.insert(url.to_string(), Duration::from_secs(30));
            self
        }

        fn redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn load(
            &self,
            url: &CrawlUrl,
            _wait_selector: &str,
            _timeout: Duration,
        ) -> Result<RenderedPage, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());

            if let Some(timeout) = self.failures.get(url.as_str()) {
                return Err(FetchError::Timeout(*timeout));
            }

            let served = match self.redirects.get(url.as_str()) {
                Some(target) => CrawlUrl::parse(target).unwrap(),
                None => url.clone(),
            };

            match self.pages.get(served.as_str()) {
                Some(html) => Ok(RenderedPage {
                    url: served,
                    html: html.clone(),
                }),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    fn profile(rate_limit_seconds: f64) -> ShopProfile {
        let config = ShopConfig {
            name: "demo".to_string(),
            base_url: "https://s.com".to_string(),
            start_url: None,
            rate_limit_seconds: Some(rate_limit_seconds),
            timeout_seconds: None,
            wait_for_selector: None,
            patterns: PatternConfig {
                product: "/products/".to_string(),
                category: "/collections/".to_string(),
                pagination: "/page/[0-9]+".to_string(),
            },
            metadata_selectors: BTreeMap::from([("title".to_string(), "h1".to_string())]),
            image_selectors: BTreeMap::from([("gallery".to_string(), ".gallery".to_string())]),
        };
        ShopProfile::from_config(&config, &CrawlerConfig::default()).unwrap()
    }

    fn storefront() -> StaticFetcher {
        StaticFetcher::default()
            .page(
                "https://s.com/",
                r#"<a href="/products/a?ref=1">A</a>
                   <a href="/products/a">A again</a>
                   <a href="/collections/x">X</a>
                   <a href="https://elsewhere.com/products/z">Partner</a>"#,
            )
            .page(
                "https://s.com/products/a",
                r#"<h1>Shirt A</h1><div class="gallery"><img src="/cdn/a.jpg"></div>"#,
            )
            .page("https://s.com/collections/x", r#"<a href="/">Home</a>"#)
    }

    #[tokio::test]
    async fn test_start_page_links_collapse_by_normalization() {
        let fetcher = storefront();
        let store = SqliteStorage::new_in_memory().unwrap();
        let mut crawl = crawl(profile(0.0), fetcher.clone(), store, CancellationToken::new()).unwrap();

        crawl.step().await;

        let frontier = crawl.frontier();
        assert_eq!(frontier.pending_len(), 2);
        assert_eq!(
            frontier.state_of(&CrawlUrl::parse("https://s.com/products/a").unwrap()),
            UrlState::Pending
        );
        assert_eq!(
            frontier.state_of(&CrawlUrl::parse("https://s.com/collections/x").unwrap()),
            UrlState::Pending
        );
        assert_eq!(
            frontier.state_of(&CrawlUrl::parse("https://elsewhere.com/products/z").unwrap()),
            UrlState::Unseen
        );
    }

    #[tokio::test]
    async fn test_redirected_product_is_keyed_by_final_url() {
        let fetcher = StaticFetcher::default()
            .page(
                "https://s.com/",
                r#"<a href="/products/old">Old</a><a href="/products/new">New</a>"#,
            )
            .page(
                "https://s.com/products/new",
                r#"<h1>Shirt</h1><div class="gallery"><img src="/cdn/s.jpg"></div>"#,
            )
            .redirect("https://s.com/products/old", "https://s.com/products/new");
        let store = SqliteStorage::new_in_memory().unwrap();
        let mut crawl = crawl(profile(0.0), fetcher.clone(), store, CancellationToken::new()).unwrap();

        let mut records = Vec::new();
        while let Some(record) = crawl.next_record().await {
            records.push(record);
        }

        let new_url = CrawlUrl::parse("https://s.com/products/new").unwrap();
        let products: Vec<_> = records.iter().filter_map(|r| r.as_product()).collect();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].url, new_url);

        // Both URLs are done and the final one is never fetched again
        let old_url = CrawlUrl::parse("https://s.com/products/old").unwrap();
        assert_eq!(crawl.frontier().state_of(&old_url), UrlState::Visited);
        assert_eq!(crawl.frontier().state_of(&new_url), UrlState::Visited);
        assert_eq!(
            fetcher.calls(),
            vec!["https://s.com/", "https://s.com/products/old"]
        );
        assert_eq!(crawl.store().count_visited(crawl.profile().base_url()).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_redirect_to_visited_page_is_skipped() {
        let fetcher = StaticFetcher::default()
            .page(
                "https://s.com/",
                r#"<a href="/products/new">New</a><a href="/products/old">Old</a>"#,
            )
            .page(
                "https://s.com/products/new",
                r#"<h1>Shirt</h1><div class="gallery"><img src="/cdn/s.jpg"></div>"#,
            )
            .redirect("https://s.com/products/old", "https://s.com/products/new");
        let store = SqliteStorage::new_in_memory().unwrap();

        let report = crawl(profile(0.0), fetcher.clone(), store, CancellationToken::new())
            .unwrap()
            .run()
            .await;

        assert_eq!(report.pages_visited, 3);
        assert_eq!(report.products_stored, 1);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_full_crawl_extracts_one_product() {
        let fetcher = storefront();
        let store = SqliteStorage::new_in_memory().unwrap();
        let mut crawl = crawl(profile(0.0), fetcher.clone(), store, CancellationToken::new()).unwrap();

        let mut records = Vec::new();
        while let Some(record) = crawl.next_record().await {
            records.push(record);
        }

        let products: Vec<_> = records.iter().filter_map(|r| r.as_product()).collect();
        assert_eq!(products.len(), 1);
        assert_eq!(
            products[0].identity_hash,
            IdentityHash::of([("url", "https://s.com/products/a")])
        );
        assert_eq!(products[0].title, "Shirt A");
        assert_eq!(records.iter().filter(|r| r.as_image().is_some()).count(), 1);

        assert_eq!(
            fetcher.calls(),
            vec![
                "https://s.com/",
                "https://s.com/products/a",
                "https://s.com/collections/x",
            ]
        );

        let report = crawl.report();
        assert_eq!(report.pages_visited, 3);
        assert_eq!(report.total_visited, 3);
        assert_eq!(report.products_stored, 1);
        assert_eq!(report.images_stored, 1);
        assert!(!report.cancelled);
        assert!(crawl.is_finished());
        assert_eq!(crawl.store().count(Collection::Products).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_contained() {
        let fetcher = storefront().timeout("https://s.com/collections/x");
        let store = SqliteStorage::new_in_memory().unwrap();
        let crawl = crawl(profile(0.0), fetcher, store, CancellationToken::new()).unwrap();

        let collection = CrawlUrl::parse("https://s.com/collections/x").unwrap();
        let mut crawl = crawl;
        while crawl.next_record().await.is_some() {}

        assert_eq!(crawl.frontier().state_of(&collection), UrlState::Visited);
        let visited = crawl
            .store()
            .load_visited(&CrawlUrl::parse("https://s.com").unwrap())
            .unwrap();
        assert!(visited.contains(&collection));

        let report = crawl.report();
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.pages_visited, 3);
        assert_eq!(report.products_stored, 1);
    }

    #[tokio::test]
    async fn test_rerun_visits_nothing_and_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("trawl.db");

        let first = crawl(
            profile(0.0),
            storefront(),
            SqliteStorage::new(&db).unwrap(),
            CancellationToken::new(),
        )
        .unwrap()
        .run()
        .await;
        assert_eq!(first.pages_visited, 3);
        assert_eq!(first.products_stored, 1);

        let fetcher = storefront();
        let second = crawl(
            profile(0.0),
            fetcher.clone(),
            SqliteStorage::new(&db).unwrap(),
            CancellationToken::new(),
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(second.pages_visited, 0);
        assert_eq!(second.total_visited, 3);
        assert_eq!(second.products_stored, 0);
        assert_eq!(second.images_stored, 0);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resume_continues_from_pending() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("trawl.db");

        // Stop after the start page has been explored
        let mut first = crawl(
            profile(0.0),
            storefront(),
            SqliteStorage::new(&db).unwrap(),
            CancellationToken::new(),
        )
        .unwrap();
        first.step().await;
        drop(first);

        let fetcher = storefront();
        let report = crawl(
            profile(0.0),
            fetcher.clone(),
            SqliteStorage::new(&db).unwrap(),
            CancellationToken::new(),
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(
            fetcher.calls(),
            vec!["https://s.com/products/a", "https://s.com/collections/x"]
        );
        assert_eq!(report.total_visited, 3);
        assert_eq!(report.products_stored, 1);
    }

    #[tokio::test]
    async fn test_shared_image_is_stored_once() {
        let fetcher = StaticFetcher::default()
            .page(
                "https://s.com/",
                r#"<a href="/products/a">A</a><a href="/products/b">B</a>"#,
            )
            .page(
                "https://s.com/products/a",
                r#"<h1>A</h1><div class="gallery"><img src="/cdn/logo.png"></div>"#,
            )
            .page(
                "https://s.com/products/b",
                r#"<h1>B</h1><div class="gallery"><img src="/cdn/logo.png"></div>"#,
            );

        let report = crawl(
            profile(0.0),
            fetcher,
            SqliteStorage::new_in_memory().unwrap(),
            CancellationToken::new(),
        )
        .unwrap()
        .run()
        .await;

        assert_eq!(report.products_stored, 2);
        assert_eq!(report.images_stored, 1);
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let fetcher = storefront();
        let report = crawl(
            profile(0.0),
            fetcher.clone(),
            SqliteStorage::new_in_memory().unwrap(),
            cancel,
        )
        .unwrap()
        .run()
        .await;

        assert!(report.cancelled);
        assert_eq!(report.pages_visited, 0);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_rate_limit_pause() {
        let cancel = CancellationToken::new();
        let fetcher = storefront();
        let crawl = crawl(
            profile(60.0),
            fetcher.clone(),
            SqliteStorage::new_in_memory().unwrap(),
            cancel.clone(),
        )
        .unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let report = tokio::time::timeout(Duration::from_secs(5), crawl.run())
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.pages_visited, 1);
        assert_eq!(fetcher.calls(), vec!["https://s.com/"]);
    }
}
