use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Content-derived key of an extracted record
///
/// Hex SHA-256 of the canonical JSON encoding of the record's identity fields.
/// Keys are sorted before encoding, so field order never changes the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
    /// Hashes a set of identity fields
    ///
    /// # Examples
    ///
    /// ```
    /// use shoptrawl::IdentityHash;
    ///
    /// let a = IdentityHash::of([("url", "https://s.com/a"), ("kind", "image")]);
    /// let b = IdentityHash::of([("kind", "image"), ("url", "https://s.com/a")]);
    /// assert_eq!(a, b);
    /// ```
    pub fn of<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let sorted: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.as_ref().to_string()))
            .collect();

        let mut canonical = serde_json::Map::new();
        for (key, value) in sorted {
            canonical.insert(key, serde_json::Value::String(value));
        }
        let encoded = serde_json::Value::Object(canonical).to_string();

        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records that carry a content-derived identity
pub trait HasIdentityHash {
    /// The fields the identity hash is computed over
    fn identity_fields(&self) -> BTreeMap<&'static str, &str>;

    /// The hash stored on the record at construction
    fn identity_hash(&self) -> &IdentityHash;

    /// Recomputes the hash from the identity fields
    fn compute_identity_hash(&self) -> IdentityHash {
        IdentityHash::of(self.identity_fields())
    }
}

/// Records that round-trip through a JSON document
pub trait Serializable: Serialize + DeserializeOwned {
    fn to_document(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn from_document(document: &str) -> serde_json::Result<Self> {
        serde_json::from_str(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = IdentityHash::of([("url", "https://s.com/products/a")]);
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a = IdentityHash::of([("a", "1"), ("b", "2")]);
        let b = IdentityHash::of([("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_values_and_keys_matter() {
        let base = IdentityHash::of([("url", "https://s.com/a")]);
        assert_ne!(base, IdentityHash::of([("url", "https://s.com/b")]));
        assert_ne!(base, IdentityHash::of([("src", "https://s.com/a")]));
    }

    #[test]
    fn test_canonical_encoding_is_unambiguous() {
        // Concatenation-based hashing would make these collide
        let a = IdentityHash::of([("a", "bc")]);
        let b = IdentityHash::of([("ab", "c")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let hash = IdentityHash::of([("url", "x")]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash));
    }
}
