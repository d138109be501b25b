//! Media storage policy
//!
//! Wraps a `BlobStore` backend with upload validation, key naming,
//! a per-call timeout and best-effort cleanup.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{BlobStore, LocalBlobStore, R2BlobStore};
use crate::config::{CloudflareConfig, MediaBackend, MediaStorageConfig};
use crate::data::EntityId;
use crate::error::AppError;

/// Key and public URL of a freshly stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
}

/// Media storage service
///
/// Services own the ordering between blob calls and database writes;
/// this type only guarantees each blob call is bounded and observable.
#[derive(Clone)]
pub struct MediaStorage {
    backend: Arc<dyn BlobStore>,
    timeout: Duration,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(backend: Arc<dyn BlobStore>, timeout: Duration, max_upload_bytes: usize) -> Self {
        Self {
            backend,
            timeout,
            max_upload_bytes,
        }
    }

    /// Build the configured backend
    ///
    /// # Errors
    /// Returns `Config` if the R2 backend is selected without credentials
    /// or a bucket.
    pub fn from_config(
        config: &MediaStorageConfig,
        cloudflare: Option<&CloudflareConfig>,
    ) -> Result<Self, AppError> {
        let backend: Arc<dyn BlobStore> = match config.backend {
            MediaBackend::Local => {
                Arc::new(LocalBlobStore::new(&config.local_dir, &config.public_url))
            }
            MediaBackend::R2 => {
                let cloudflare = cloudflare.ok_or_else(|| {
                    AppError::Config("cloudflare credentials are required for R2".to_string())
                })?;
                let bucket = config.bucket.as_deref().ok_or_else(|| {
                    AppError::Config("storage.media.bucket is required for R2".to_string())
                })?;
                Arc::new(R2BlobStore::new(bucket, &config.public_url, cloudflare))
            }
        };

        tracing::info!(backend = ?config.backend, "Media storage initialized");

        Ok(Self::new(
            backend,
            Duration::from_secs(config.timeout_seconds),
            config.max_upload_bytes,
        ))
    }

    /// Public URL for a stored key
    pub fn public_url(&self, key: &str) -> String {
        self.backend.public_url(key)
    }

    /// Validate and store an uploaded image under `prefix/`
    ///
    /// # Arguments
    /// * `prefix` - Key namespace, e.g. "avatars" or "posts"
    /// * `data` - File contents
    /// * `content_type` - MIME type reported by the client
    ///
    /// # Errors
    /// - `Validation` for empty, oversized or non-image uploads
    /// - `Storage` if the backend fails or times out
    pub async fn upload_image(
        &self,
        prefix: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredBlob, AppError> {
        let ext = image_extension(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {content_type}"))
        })?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "Uploaded file exceeds {} bytes",
                self.max_upload_bytes
            )));
        }

        let key = format!("{}/{}.{}", prefix, EntityId::new().0, ext);
        let result = self
            .bounded(self.backend.store(&key, data, content_type))
            .await;

        let status = if result.is_ok() { "success" } else { "failure" };
        crate::metrics::MEDIA_UPLOADS_TOTAL
            .with_label_values(&[status])
            .inc();

        let url = result?;
        tracing::debug!(%key, "Stored media blob");
        Ok(StoredBlob { key, url })
    }

    /// Delete a blob, surfacing failures
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let result = self.bounded(self.backend.delete(key)).await;

        let status = if result.is_ok() { "success" } else { "failure" };
        crate::metrics::MEDIA_DELETES_TOTAL
            .with_label_values(&[status])
            .inc();

        result
    }

    /// Delete a blob whose database reference is already gone
    ///
    /// Failures leave an orphaned blob and are only logged.
    pub async fn delete_best_effort(&self, key: &str) {
        if let Err(error) = self.delete(key).await {
            tracing::warn!(%key, %error, "Failed to delete media blob");
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Storage(format!(
                "media storage timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
