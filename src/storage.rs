use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
}

/// StorageService
///
/// Contract for the object store that holds invite images. The real S3 client is
/// swapped for `MockStorageService` in tests without touching the handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Only used for local MinIO.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `key` and returns the public URL of the object.
    async fn upload_image(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Removes the object stored under `key`. Missing objects are not an error.
    async fn delete_image(&self, key: &str) -> Result<(), StorageError>;
}

/// S3StorageClient
///
/// `StorageService` on top of the AWS SDK. Path-style addressing keeps it
/// compatible with MinIO and Supabase Storage.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3StorageClient {
    /// Builds a client for an S3-compatible endpoint with static credentials.
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        // 1. Static credentials (MinIO root user locally, access keys in production).
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        // 2. Client config. Path-style URLs (`endpoint/bucket/key`) are required by MinIO.
        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(err) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(error = %err, bucket = %self.bucket_name, "create_bucket skipped");
        }
    }

    async fn upload_image(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);

        // 1. Upload the bytes with their MIME type so browsers render them inline.
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        // 2. Public URL, in the same path style the client was configured with.
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket_name, key))
    }

    async fn delete_image(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;
        Ok(())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never escape its prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory stand-in used by the test-suite. Clones share the stored keys.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all uploads return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<BTreeSet<String>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Keys currently held, in sorted order.
    pub fn stored_keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn upload_image(
        &self,
        key: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Upload("simulated storage failure".to_string()));
        }
        let key = sanitize_key(key);
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(key.clone());
        }
        Ok(format!("http://localhost:9000/mock-bucket/{key}"))
    }

    async fn delete_image(&self, key: &str) -> Result<(), StorageError> {
        if let Ok(mut objects) = self.objects.lock() {
            objects.remove(&sanitize_key(key));
        }
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
