use crate::{UrlError, UrlResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;

/// A canonical crawl key
///
/// Holds scheme, host, port and path only. Query string, fragment and userinfo
/// are always stripped, so two raw URLs are crawl-equivalent iff their
/// `CrawlUrl`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrawlUrl(Url);

impl CrawlUrl {
    /// Canonicalizes an absolute URL
    ///
    /// # Examples
    ///
    /// ```
    /// use shoptrawl::url::CrawlUrl;
    ///
    /// let url = CrawlUrl::parse("https://Shop.com/a?x=1#top").unwrap();
    /// assert_eq!(url.as_str(), "https://shop.com/a");
    /// ```
    pub fn parse(raw: &str) -> UrlResult<Self> {
        let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
        Self::canonicalize(url)
    }

    fn canonicalize(mut url: Url) -> UrlResult<Self> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        if url.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }

        url.set_query(None);
        url.set_fragment(None);
        // Both setters only fail for URLs without a host, which was ruled out above
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.0.port_or_known_default()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for CrawlUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CrawlUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CrawlUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CrawlUrl::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Canonicalizes a possibly relative URL found on the page at `base`
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` (absolute URLs are taken as-is)
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Drop the query string, fragment and userinfo
///
/// Host lowercasing, default-port removal and dot-segment resolution come from
/// URL parsing itself. The result is idempotent:
/// `normalize(base, normalize(base, x).as_str()) == normalize(base, x)`.
///
/// # Examples
///
/// ```
/// use shoptrawl::url::{normalize, CrawlUrl};
///
/// let base = CrawlUrl::parse("https://s.com/collections/all").unwrap();
/// let url = normalize(&base, "../products/a?ref=1").unwrap();
/// assert_eq!(url.as_str(), "https://s.com/products/a");
/// ```
pub fn normalize(base: &CrawlUrl, raw: &str) -> UrlResult<CrawlUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let joined = base
        .as_url()
        .join(trimmed)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    CrawlUrl::canonicalize(joined)
}
