use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// AssetError
///
/// Failures of the external object store, split along the two contract
/// operations. Upload failures are terminal for the enclosing request; removal
/// failures are non-fatal to callers (the lifecycle service logs and swallows
/// them, accepting the orphan asset).
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("removal failed: {0}")]
    Removal(String),
}

/// StoredAsset
///
/// The handle returned by a successful store: the public URL persisted on the
/// post, and the opaque asset id (distinct from the URL) used for later removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    pub url: String,
    pub asset_id: String,
}

/// RemovalOutcome
///
/// Result of a removal request. `NotFound` is a success from the caller's point
/// of view: the object is gone either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemovalOutcome {
    Removed,
    NotFound,
}

// 1. AssetStore Contract
/// AssetStore
///
/// Defines the abstract contract for the external image object store. This trait
/// allows us to swap the concrete implementation—from the real S3 client
/// (S3AssetStore) in production to the in-memory Mock (MockAssetStore) during
/// testing—without affecting the lifecycle service.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Ensures the configured bucket exists. Used primarily in the `Env::Local`
    /// setup to automatically provision the required bucket in MinIO. No-op in
    /// production.
    async fn ensure_bucket_exists(&self);

    /// Uploads an image binary and returns its public URL and asset id.
    async fn store(
        &self,
        binary: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<StoredAsset, AssetError>;

    /// Removes a previously stored object by asset id.
    async fn remove(&self, asset_id: &str) -> Result<RemovalOutcome, AssetError>;
}

/// AssetState
///
/// The concrete type used to share the asset store access across the application state.
pub type AssetState = Arc<dyn AssetStore>;

// 2. The Real Implementation (S3/MinIO)
/// S3AssetStore
///
/// The concrete implementation using the AWS SDK for S3. Due to S3 compatibility,
/// this client transparently handles connections to a Dockerized MinIO instance
/// locally or any S3-compatible gateway in production.
///
/// The `force_path_style(true)` is critical for MinIO-style gateways, and also
/// what makes the `endpoint/bucket/key` public URL shape valid.
#[derive(Clone)]
pub struct S3AssetStore {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3AssetStore {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // CRITICAL: Forces the client to use path-style addressing
            // (http://endpoint/bucket/key), required for MinIO-style gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    /// ensure_bucket_exists
    ///
    /// Calls the S3 CreateBucket API. Since S3 APIs are idempotent, this only creates
    /// the bucket if it does not already exist. It's safe to call at startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    /// store
    ///
    /// Uploads the binary under a fresh, collision-free object key
    /// (`posts/<uuid>.<ext>`) and returns the path-style public URL together
    /// with the key as the asset id.
    async fn store(
        &self,
        binary: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<StoredAsset, AssetError> {
        let asset_id = object_key_for(filename);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&asset_id)
            .content_type(content_type)
            .body(ByteStream::from(binary.to_vec()))
            .send()
            .await
            .map_err(|e| AssetError::Upload(e.to_string()))?;

        Ok(StoredAsset {
            url: format!("{}/{}/{}", self.endpoint, self.bucket_name, asset_id),
            asset_id,
        })
    }

    /// remove
    ///
    /// Deletes the object. S3 DeleteObject succeeds on missing keys, so this
    /// implementation cannot distinguish `Removed` from `NotFound`; the
    /// distinction only matters to callers that need it (the mock reports both).
    async fn remove(&self, asset_id: &str) -> Result<RemovalOutcome, AssetError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(asset_id)
            .send()
            .await
            .map_err(|e| AssetError::Removal(e.to_string()))?;

        Ok(RemovalOutcome::Removed)
    }
}

/// object_key_for
///
/// Derives a unique object key from an upload filename. The extension is
/// sanitized down to alphanumerics to keep keys free of path traversal and
/// separator characters regardless of what the client sends.
fn object_key_for(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());

    format!("posts/{}.{}", Uuid::new_v4(), extension.to_lowercase())
}

// 3. The Mock Implementation (For Unit Tests)
/// MockAssetStore
///
/// A mock implementation of `AssetStore` used exclusively for unit and
/// integration testing. It records every store/remove call so tests can assert
/// the lifecycle service's exact interaction with the object store (e.g.
/// "previous asset requested for removal exactly once"), and exposes failure
/// toggles for both operations.
#[derive(Default)]
pub struct MockAssetStore {
    /// When true, `store` returns a simulated upload failure.
    pub fail_store: bool,
    /// When true, `remove` returns a simulated removal failure.
    pub fail_remove: bool,
    live: Mutex<Vec<String>>,
    removal_requests: Mutex<Vec<String>>,
}

impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_store() -> Self {
        Self {
            fail_store: true,
            ..Self::default()
        }
    }

    pub fn failing_remove() -> Self {
        Self {
            fail_remove: true,
            ..Self::default()
        }
    }

    /// Asset ids currently live in the mock store.
    pub fn live_assets(&self) -> Vec<String> {
        self.live.lock().unwrap().clone()
    }

    /// Every asset id passed to `remove`, in call order, including failed calls.
    pub fn removal_requests(&self) -> Vec<String> {
        self.removal_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn store(
        &self,
        _binary: &[u8],
        filename: &str,
        _content_type: &str,
    ) -> Result<StoredAsset, AssetError> {
        if self.fail_store {
            return Err(AssetError::Upload("mock upload failure".to_string()));
        }

        let asset_id = object_key_for(filename);
        self.live.lock().unwrap().push(asset_id.clone());

        Ok(StoredAsset {
            url: format!("http://localhost:9000/mock-bucket/{}", asset_id),
            asset_id,
        })
    }

    async fn remove(&self, asset_id: &str) -> Result<RemovalOutcome, AssetError> {
        self.removal_requests
            .lock()
            .unwrap()
            .push(asset_id.to_string());

        if self.fail_remove {
            return Err(AssetError::Removal("mock removal failure".to_string()));
        }

        let mut live = self.live.lock().unwrap();
        match live.iter().position(|id| id == asset_id) {
            Some(idx) => {
                live.remove(idx);
                Ok(RemovalOutcome::Removed)
            }
            None => Ok(RemovalOutcome::NotFound),
        }
    }
}
