use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Every post image lives under this prefix.
pub const POST_IMAGES_PREFIX: &str = "posts_images";

/// Upload URLs stay valid for ten minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Object storage for post images. Clients upload directly to the bucket through a
/// presigned URL and then submit the returned key as the post's `image` field.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Only called in `Env::Local`,
    /// where MinIO starts empty.
    async fn ensure_bucket_exists(&self);

    /// Signs a PUT for `key`, pinned to `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;
}

/// S3StorageClient
///
/// `StorageService` over any S3-compatible endpoint (MinIO locally).
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
            // MinIO only understands path-style addressing.
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
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => tracing::info!(bucket = %self.bucket_name, "Created storage bucket"),
            Err(e) => tracing::debug!(bucket = %self.bucket_name, error = %e, "Bucket not created"),
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// Strips empty, `.` and `..` segments so a key can never climb out of its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// image_object_key
///
/// A fresh, unguessable key for an uploaded image: `posts_images/<uuid>.<ext>`. The
/// extension comes from the client's filename (lowercased, alphanumeric only) and falls
/// back to `bin`.
pub fn image_object_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());
    format!("{}/{}.{}", POST_IMAGES_PREFIX, Uuid::new_v4(), extension)
}

/// Only image uploads are signed.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

/// MockStorageService
///
/// Deterministic `StorageService` for tests; no network.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every call fails.
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
        content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?content-type={}&signature=fake",
            sanitize_key(key),
            urlencoding::encode(content_type)
        ))
    }
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
