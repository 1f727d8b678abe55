//! Extracted records and their identity
//!
//! A crawl yields two kinds of records: [`Product`]s for product pages and
//! [`Image`]s for the pictures on them. Both are keyed by an [`IdentityHash`]
//! computed over their URL only, so re-extracting a page whose copy changed
//! produces the same key and is treated as an update of the same entity.

mod identity;
mod image;
mod product;

pub use identity::{HasIdentityHash, IdentityHash, Serializable};
pub use image::Image;
pub use product::Product;

use crate::storage::Collection;
use crate::url::CrawlUrl;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Either kind of extracted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractedRecord {
    Product(Product),
    Image(Image),
}

impl ExtractedRecord {
    /// The collection this record is stored in
    pub fn collection(&self) -> Collection {
        match self {
            Self::Product(_) => Collection::Products,
            Self::Image(_) => Collection::ImageMetadata,
        }
    }

    /// The page the record was extracted from
    pub fn source_url(&self) -> &CrawlUrl {
        match self {
            Self::Product(product) => &product.url,
            Self::Image(image) => &image.source_url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Product(_) => "product",
            Self::Image(_) => "image",
        }
    }

    pub fn as_product(&self) -> Option<&Product> {
        match self {
            Self::Product(product) => Some(product),
            Self::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Self::Image(image) => Some(image),
            Self::Product(_) => None,
        }
    }
}

impl HasIdentityHash for ExtractedRecord {
    fn identity_fields(&self) -> BTreeMap<&'static str, &str> {
        match self {
            Self::Product(product) => product.identity_fields(),
            Self::Image(image) => image.identity_fields(),
        }
    }

    fn identity_hash(&self) -> &IdentityHash {
        match self {
            Self::Product(product) => product.identity_hash(),
            Self::Image(image) => image.identity_hash(),
        }
    }
}

impl Serializable for ExtractedRecord {}

impl From<Product> for ExtractedRecord {
    fn from(product: Product) -> Self {
        Self::Product(product)
    }
}

impl From<Image> for ExtractedRecord {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}
