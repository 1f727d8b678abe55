use crate::extract::NOT_FOUND;
use crate::record::identity::{HasIdentityHash, IdentityHash, Serializable};
use crate::record::Image;
use crate::url::CrawlUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A product page's extracted metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub url: CrawlUrl,
    pub title: String,
    pub description: String,
    /// Every other metadata field, keyed by selector name
    pub metadata: BTreeMap<String, String>,
    /// Identity hashes of the product's images, in page order
    pub image_hashes: Vec<IdentityHash>,
    pub identity_hash: IdentityHash,
    pub extracted_at: DateTime<Utc>,
}

impl Product {
    /// Builds a product from its extracted fields and images
    ///
    /// `title` and `description` are lifted out of `fields`; a missing one
    /// becomes the not-found sentinel.
    pub fn new(url: CrawlUrl, mut fields: BTreeMap<String, String>, images: &[Image]) -> Self {
        let title = fields
            .remove("title")
            .unwrap_or_else(|| NOT_FOUND.to_string());
        let description = fields
            .remove("description")
            .unwrap_or_else(|| NOT_FOUND.to_string());

        let mut image_hashes: Vec<IdentityHash> = Vec::with_capacity(images.len());
        for image in images {
            if !image_hashes.contains(&image.identity_hash) {
                image_hashes.push(image.identity_hash.clone());
            }
        }

        let identity_hash = Self::identity_for(&url);

        Self {
            url,
            title,
            description,
            metadata: fields,
            image_hashes,
            identity_hash,
            extracted_at: Utc::now(),
        }
    }

    /// The identity hash a product page at `url` always gets
    pub fn identity_for(url: &CrawlUrl) -> IdentityHash {
        IdentityHash::of([("url", url.as_str())])
    }
}

impl HasIdentityHash for Product {
    fn identity_fields(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([("url", self.url.as_str())])
    }

    fn identity_hash(&self) -> &IdentityHash {
        &self.identity_hash
    }
}

impl Serializable for Product {}
