//! Crawl frontier: pending queue and visited set
//!
//! Every URL moves through `Unseen → Pending → Visited` exactly once. A URL is
//! never in both sets, so the crawl ends once the pending queue drains.

use crate::url::CrawlUrl;
use std::collections::{HashSet, VecDeque};

/// Where a URL is in its crawl lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Unseen,
    Pending,
    Visited,
}

/// FIFO queue of URLs to fetch plus the set of URLs already fetched
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlUrl>,
    pending: HashSet<CrawlUrl>,
    visited: HashSet<CrawlUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the frontier from persisted progress
    ///
    /// The start URL is queued first, then the persisted pending URLs in their
    /// stored order. Anything already visited is left out.
    pub fn resume(
        start_url: CrawlUrl,
        visited: HashSet<CrawlUrl>,
        pending: impl IntoIterator<Item = CrawlUrl>,
    ) -> Self {
        let mut frontier = Self {
            visited,
            ..Self::default()
        };

        frontier.enqueue(start_url);
        for url in pending {
            frontier.enqueue(url);
        }

        frontier
    }

    /// Queues a URL unless it is already pending or visited
    ///
    /// Returns true if the URL was newly queued.
    pub fn enqueue(&mut self, url: CrawlUrl) -> bool {
        if self.visited.contains(&url) || self.pending.contains(&url) {
            return false;
        }

        self.pending.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Takes the oldest pending URL
    pub fn dequeue(&mut self) -> Option<CrawlUrl> {
        let url = self.queue.pop_front()?;
        self.pending.remove(&url);
        Some(url)
    }

    /// Records a URL as visited, dropping it from the queue if still there
    pub fn mark_visited(&mut self, url: CrawlUrl) {
        if self.pending.remove(&url) {
            self.queue.retain(|queued| queued != &url);
        }
        self.visited.insert(url);
    }

    pub fn state_of(&self, url: &CrawlUrl) -> UrlState {
        if self.visited.contains(url) {
            UrlState::Visited
        } else if self.pending.contains(url) {
            UrlState::Pending
        } else {
            UrlState::Unseen
        }
    }

    pub fn is_visited(&self, url: &CrawlUrl) -> bool {
        self.visited.contains(url)
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> CrawlUrl {
        CrawlUrl::parse(&format!("https://s.com{}", path)).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        assert!(frontier.enqueue(url("/a")));
        assert!(frontier.enqueue(url("/b")));
        assert!(frontier.enqueue(url("/c")));

        assert_eq!(frontier.dequeue(), Some(url("/a")));
        assert_eq!(frontier.dequeue(), Some(url("/b")));
        assert_eq!(frontier.dequeue(), Some(url("/c")));
        assert_eq!(frontier.dequeue(), None);
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_enqueue_is_noop_when_known() {
        let mut frontier = Frontier::new();
        assert!(frontier.enqueue(url("/a")));
        assert!(!frontier.enqueue(url("/a")));
        assert_eq!(frontier.pending_len(), 1);

        let a = frontier.dequeue().unwrap();
        frontier.mark_visited(a);
        assert!(!frontier.enqueue(url("/a")));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let mut frontier = Frontier::new();
        assert_eq!(frontier.state_of(&url("/a")), UrlState::Unseen);

        frontier.enqueue(url("/a"));
        assert_eq!(frontier.state_of(&url("/a")), UrlState::Pending);

        let a = frontier.dequeue().unwrap();
        frontier.mark_visited(a);
        assert_eq!(frontier.state_of(&url("/a")), UrlState::Visited);

        // Idempotent
        frontier.mark_visited(url("/a"));
        assert_eq!(frontier.visited_len(), 1);
    }

    #[test]
    fn test_mark_visited_removes_pending() {
        let mut frontier = Frontier::new();
        frontier.enqueue(url("/a"));
        frontier.enqueue(url("/b"));

        frontier.mark_visited(url("/a"));
        assert_eq!(frontier.pending_len(), 1);
        assert_eq!(frontier.dequeue(), Some(url("/b")));
    }

    #[test]
    fn test_resume_skips_visited() {
        let visited = HashSet::from([url("/"), url("/products/a")]);
        let pending = vec![url("/products/a"), url("/collections/x"), url("/collections/x")];

        let mut frontier = Frontier::resume(url("/"), visited, pending);
        assert_eq!(frontier.visited_len(), 2);
        assert_eq!(frontier.pending_len(), 1);
        assert_eq!(frontier.dequeue(), Some(url("/collections/x")));
    }

    #[test]
    fn test_resume_fresh_starts_at_start_url() {
        let mut frontier = Frontier::resume(url("/start"), HashSet::new(), Vec::new());
        assert_eq!(frontier.dequeue(), Some(url("/start")));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_terminates_on_cyclic_graph() {
        // a -> b -> c -> a
        let links = |u: &CrawlUrl| match u.path() {
            "/a" => url("/b"),
            "/b" => url("/c"),
            _ => url("/a"),
        };

        let mut frontier = Frontier::resume(url("/a"), HashSet::new(), Vec::new());
        let mut steps = 0;
        while let Some(current) = frontier.dequeue() {
            frontier.enqueue(links(&current));
            frontier.mark_visited(current);
            steps += 1;
            assert!(steps <= 3);
        }
        assert_eq!(frontier.visited_len(), 3);
    }
}
