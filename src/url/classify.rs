use crate::config::ShopProfile;
use crate::url::CrawlUrl;
use std::fmt;

/// What kind of storefront page a URL points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A product detail page; extraction runs here
    Product,
    /// A collection or category listing
    Category,
    /// Another page of a listing
    Pagination,
    /// Anything else on the shop's host
    None,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Pagination => "pagination",
            Self::None => "none",
        }
    }

    /// Returns true for pages that should be handed to the extraction engine
    pub fn is_extractable(&self) -> bool {
        matches!(self, Self::Product)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a canonical URL against the shop's link patterns
///
/// Patterns are matched against the full normalized URL string. When a URL
/// matches more than one pattern the first in this order wins:
/// 1. Product
/// 2. Category
/// 3. Pagination
///
/// A shop whose products live under a collection path
/// (`/collections/shirts/products/a`) therefore still yields product pages.
pub fn classify(shop: &ShopProfile, url: &CrawlUrl) -> LinkKind {
    let patterns = shop.patterns();
    let candidate = url.as_str();

    if patterns.product.is_match(candidate) {
        LinkKind::Product
    } else if patterns.category.is_match(candidate) {
        LinkKind::Category
    } else if patterns.pagination.is_match(candidate) {
        LinkKind::Pagination
    } else {
        LinkKind::None
    }
}
