//! Image bytes: local blob storage and lazy resolution
//!
//! Extraction only records image metadata. Bytes are downloaded the first time
//! someone asks for them, saved to the blob store, and the record is updated
//! with the blob locator so later requests read from disk.

use crate::record::IdentityHash;
use crate::storage::traits::{BlobStore, Collection, RecordStore, StorageError, StorageResult, StoredRecord};
use crate::TrawlError;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Blob store backed by a local directory
///
/// Blobs are fanned out by the first two hex characters of their hash:
/// `<root>/ab/abcdef….bin`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, locator: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(locator);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if locator.is_empty() || escapes {
            return Err(StorageError::BlobNotFound(locator.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalBlobStore {
    fn save(&self, bytes: &[u8], hash: &IdentityHash) -> StorageResult<String> {
        let hex = hash.as_str();
        let prefix = hex.get(..2).unwrap_or("00");
        let locator = format!("{}/{}.bin", prefix, hex);

        let path = self.path_for(&locator)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;

        Ok(locator)
    }

    fn load(&self, locator: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(locator)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::BlobNotFound(locator.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome of a batch resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: u64,
    pub failed: u64,
}

/// Downloads image bytes on first access
pub struct ImageResolver<B: BlobStore> {
    client: Client,
    blobs: B,
    timeout: Duration,
}

impl<B: BlobStore> ImageResolver<B> {
    pub fn new(client: Client, blobs: B, timeout: Duration) -> Self {
        Self {
            client,
            blobs,
            timeout,
        }
    }

    /// Returns the image's bytes, downloading and saving them if needed
    ///
    /// # Arguments
    ///
    /// * `store` - The record store the image record lives in
    /// * `stored` - An image record as returned by the store
    pub async fn resolve<S>(&self, store: &mut S, stored: &StoredRecord) -> Result<Vec<u8>, TrawlError>
    where
        S: RecordStore + ?Sized,
    {
        let image = stored.record.as_image().ok_or_else(|| {
            StorageError::Database(format!(
                "Record {} is not an image",
                stored.record.source_url()
            ))
        })?;

        if let Some(locator) = &stored.blob_locator {
            return Ok(self.blobs.load(locator)?);
        }

        tracing::debug!("Downloading image {}", image.url);
        let response = self
            .client
            .get(&image.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let locator = self.blobs.save(&bytes, &image.identity_hash)?;
        store.set_blob_locator(Collection::ImageMetadata, &image.identity_hash, &locator)?;

        Ok(bytes.to_vec())
    }

    /// Resolves every image record that has no bytes yet
    ///
    /// Failures are logged and counted; they never stop the batch.
    pub async fn resolve_pending<S>(&self, store: &mut S, limit: Option<usize>) -> Result<ResolveSummary, TrawlError>
    where
        S: RecordStore + ?Sized,
    {
        let mut summary = ResolveSummary::default();

        for stored in store.images_without_blob(limit)? {
            match self.resolve(store, &stored).await {
                Ok(bytes) => {
                    summary.resolved += 1;
                    tracing::debug!(
                        "Resolved image from {} ({} bytes)",
                        stored.record.source_url(),
                        bytes.len()
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("Failed to resolve image from {}: {}", stored.record.source_url(), e);
                }
            }
        }

        Ok(summary)
    }
}
