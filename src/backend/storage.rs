//! Filesystem object store with buckets and public URLs.
//!
//! Layout: `{root}/{bucket}/{path}` holds the object bytes and
//! `{root}/{bucket}/{path}.content-type` the content type recorded at upload.
//! A bucket exists once its directory exists.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::BackendError;

const CONTENT_TYPE_SUFFIX: &str = ".content-type";

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create the bucket directory if it is missing.
    pub async fn ensure_bucket(&self, bucket: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(bucket)).await
    }

    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let bucket_dir = self.root.join(bucket);
        if !tokio::fs::try_exists(&bucket_dir).await.unwrap_or(false) {
            return Err(BackendError::BucketNotFound("Bucket not found".to_string()));
        }
        let target = self
            .resolve(bucket, path)
            .ok_or_else(|| BackendError::Other(format!("Invalid object path: {path}")))?;

        if !upsert && tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(BackendError::Other("The resource already exists".to_string()));
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&target, bytes).await.map_err(io_error)?;
        tokio::fs::write(sidecar(&target), content_type).await.map_err(io_error)?;

        log::debug!("Stored object {bucket}/{path} ({} bytes, {content_type})", bytes.len());
        Ok(())
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> Option<String> {
        self.resolve(bucket, path)?;
        Some(format!("{}/storage/{bucket}/{path}", self.public_base_url))
    }

    /// Map a bucket-relative object path onto the filesystem, rejecting
    /// anything that could escape the bucket.
    pub fn resolve(&self, bucket: &str, path: &str) -> Option<PathBuf> {
        if !is_safe_segment(bucket) || path.is_empty() || path.starts_with('/') {
            return None;
        }
        if path.ends_with(CONTENT_TYPE_SUFFIX) || !path.split('/').all(is_safe_segment) {
            return None;
        }
        Some(self.root.join(bucket).join(path))
    }

    pub async fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        let target = self.resolve(bucket, path)?;
        tokio::fs::read_to_string(sidecar(&target))
            .await
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
}

fn sidecar(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(CONTENT_TYPE_SUFFIX);
    PathBuf::from(name)
}

fn io_error(e: std::io::Error) -> BackendError {
    match e.kind() {
        ErrorKind::PermissionDenied => BackendError::PolicyDenied(format!(
            "new object violates storage security policy: {e}"
        )),
        _ => BackendError::Other(e.to_string()),
    }
}
