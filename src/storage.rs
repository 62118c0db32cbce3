use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::DEFAULT_PROFILE_PIC;

/// How long a presigned upload URL stays valid.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid presigning configuration: {0}")]
    Presigning(String),
    #[error("object storage request failed: {0}")]
    Request(String),
}

/// StorageService
///
/// Contract for the object storage that holds customer profile pictures. Handlers only ever
/// see this trait; the S3 client and the in-memory mock are interchangeable behind it.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket when it is missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary, signed URL allowing a client to PUT one object directly to
    /// the bucket. The upload must carry `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3StorageClient
///
/// S3-compatible client (MinIO locally, any S3 endpoint in production).
/// Path-style addressing is forced for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
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
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket({}) skipped: {:?}", self.bucket_name, e);
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Presigning(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Removes empty, `.` and `..` segments so a client-supplied name cannot escape its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Object key for a new profile picture of `customer_id`, e.g.
/// `profile_pics/<customer>/<random>.png`. Only the extension of `filename` is kept.
pub fn profile_picture_key(customer_id: Uuid, filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_ascii_lowercase();

    sanitize_key(&format!(
        "profile_pics/{}/{}.{}",
        customer_id,
        Uuid::new_v4(),
        extension
    ))
}

/// Whether `key` may be stored as the profile picture of `customer_id`: the default picture,
/// or an already-sanitized key under that customer's own `profile_pics/` prefix.
pub fn is_own_picture_key(customer_id: Uuid, key: &str) -> bool {
    if key == DEFAULT_PROFILE_PIC {
        return true;
    }
    let prefix = format!("profile_pics/{customer_id}/");
    key.len() > prefix.len() && key.starts_with(&prefix) && sanitize_key(key) == key
}

/// MockStorageService
///
/// In-memory stand-in used by the test suites. Produces deterministic URLs.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Request("simulated failure".to_string()));
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// Shared handle to the storage service held in the application state.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_drops_traversal_segments() {
        assert_eq!(sanitize_key("../a/./b//c/.."), "a/b/c");
    }

    #[test]
    fn profile_picture_key_keeps_only_the_extension() {
        let customer = Uuid::from_u128(7);
        let key = profile_picture_key(customer, "../../etc/Me.PNG");
        assert!(key.starts_with(&format!("profile_pics/{}/", customer)));
        assert!(key.ends_with(".png"));
        assert!(!key.contains(".."));
    }

    #[test]
    fn profile_picture_key_falls_back_to_bin() {
        let key = profile_picture_key(Uuid::from_u128(7), "no-extension");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn picture_keys_are_scoped_to_their_customer() {
        let own = Uuid::from_u128(7);
        let other = Uuid::from_u128(8);
        assert!(is_own_picture_key(own, "profile1.png"));
        assert!(is_own_picture_key(own, &profile_picture_key(own, "me.png")));
        assert!(!is_own_picture_key(own, &profile_picture_key(other, "me.png")));
        assert!(!is_own_picture_key(own, &format!("profile_pics/{own}/")));
        assert!(!is_own_picture_key(
            own,
            &format!("profile_pics/{own}/../{other}/me.png")
        ));
        assert!(!is_own_picture_key(own, "avatars/me.png"));
    }

    #[tokio::test]
    async fn failing_mock_reports_error() {
        let storage = MockStorageService::new_failing();
        let result = storage.get_presigned_upload_url("k", "image/png").await;
        assert!(matches!(result, Err(StorageError::Request(_))));
    }
}
