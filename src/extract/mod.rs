//! Selector-driven extraction
//!
//! Turns a fetched page into the links to follow and, for product pages, a
//! [`Product`] and its [`Image`]s. All work on a parsed document happens inside
//! [`parse_page`]; the document never outlives that call.

mod fields;
mod images;
mod links;

pub use fields::extract_fields;
pub use images::{dom_location, extract_images, ImageMatch};
pub use links::extract_links;

use crate::config::ShopProfile;
use crate::record::{Image, Product};
use crate::url::{CrawlUrl, LinkKind};
use scraper::Html;
use std::collections::HashSet;

/// Value of a metadata field whose selector matched nothing
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Everything the crawl loop needs from one page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Raw `href` values, unresolved
    pub links: Vec<String>,

    /// The product and its images, for product pages only
    pub product: Option<(Product, Vec<Image>)>,
}

/// Parses a fetched page and runs extraction if it is a product page
pub fn parse_page(html: &str, profile: &ShopProfile, url: &CrawlUrl, kind: LinkKind) -> ParsedPage {
    let document = Html::parse_document(html);

    let links = extract_links(&document);
    let product = kind
        .is_extractable()
        .then(|| extract_product(&document, profile, url));

    ParsedPage { links, product }
}

/// Builds the product record for a product page
///
/// Runs every metadata selector and every image selector of the profile. An
/// image reachable through more than one selector is reported once.
pub fn extract_product(document: &Html, profile: &ShopProfile, url: &CrawlUrl) -> (Product, Vec<Image>) {
    let fields = extract_fields(document, profile.metadata_selectors());

    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for selector in profile.image_selectors().values() {
        for found in extract_images(document, selector, url) {
            if seen.insert(found.url.clone()) {
                images.push(Image::new(found.url, url.clone(), found.dom_location));
            }
        }
    }

    let product = Product::new(url.clone(), fields, &images);
    (product, images)
}
