use crate::record::identity::{HasIdentityHash, IdentityHash, Serializable};
use crate::url::CrawlUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An image found on a product page
///
/// Only metadata lives here; the bytes are fetched later by the image resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Absolute image URL, query string included
    pub url: String,
    /// The product page the image was found on
    pub source_url: CrawlUrl,
    /// Ancestor chain of the matched element, for debugging only
    pub dom_location: String,
    pub identity_hash: IdentityHash,
    pub extracted_at: DateTime<Utc>,
}

impl Image {
    pub fn new(url: String, source_url: CrawlUrl, dom_location: String) -> Self {
        let identity_hash = Self::identity_for(&url);
        Self {
            url,
            source_url,
            dom_location,
            identity_hash,
            extracted_at: Utc::now(),
        }
    }

    pub fn identity_for(url: &str) -> IdentityHash {
        IdentityHash::of([("url", url)])
    }
}

impl HasIdentityHash for Image {
    fn identity_fields(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([("url", self.url.as_str())])
    }

    fn identity_hash(&self) -> &IdentityHash {
        &self.identity_hash
    }
}

impl Serializable for Image {}
