//! Media blob storage
//!
//! Handles:
//! - The `BlobStore` seam to the external media host
//! - Local filesystem and Cloudflare R2 backends
//! - `MediaStorage`, the policy layer used by services (timeouts,
//!   key naming, best-effort deletion)

mod local;
mod media;
mod r2;

pub use local::LocalBlobStore;
pub use media::{MediaStorage, StoredBlob};
pub use r2::R2BlobStore;

use async_trait::async_trait;

use crate::error::AppError;

/// External blob host
///
/// Implementations only move bytes; they never touch the database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`
    ///
    /// # Returns
    /// Public URL of the stored blob
    async fn store(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError>;

    /// Delete the blob stored under `key`
    ///
    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Public URL for a key
    fn public_url(&self, key: &str) -> String;
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
