//! Backend collaborator behind the profile page.
//!
//! `ProfileBackend` is the narrow repository interface the profile logic talks
//! to: profile records, the audit-log table, avatar object storage and password
//! credentials. `PgBackend` implements it on Postgres plus the filesystem
//! object store in [`storage`].

pub mod postgres;
pub mod storage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::audit::AuditRecord;
use crate::models::activity::ActivityLogEntry;
use crate::models::admin::{Identity, ProfileChanges};

pub use postgres::PgBackend;
pub use storage::LocalObjectStore;

/// Bucket holding avatar objects.
pub const AVATAR_BUCKET: &str = "avatars";

/// Folder inside [`AVATAR_BUCKET`] that admin avatars are stored under.
pub const AVATAR_FOLDER: &str = "admin-avatars";

#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// Check sign-in credentials. `Ok(None)` means unknown email or wrong password.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Identity>, BackendError>;

    async fn sign_out(&self, admin_id: i64) -> Result<(), BackendError>;

    async fn get_profile(&self, admin_id: i64) -> Result<Identity, BackendError>;

    async fn update_profile(&self, admin_id: i64, changes: &ProfileChanges) -> Result<(), BackendError>;

    /// Newest-first audit entries for the admin, at most `limit`.
    async fn list_activity(&self, admin_id: i64, limit: i64) -> Result<Vec<ActivityLogEntry>, BackendError>;

    /// Count audit entries for the admin, restricted to `created_at >= since` when given.
    async fn count_activity(&self, admin_id: i64, since: Option<DateTime<Utc>>) -> Result<i64, BackendError>;

    /// Store an object in the avatar bucket, overwriting any existing object at `path`.
    async fn upload_avatar(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BackendError>;

    /// Public URL for an object in the avatar bucket.
    async fn public_url(&self, path: &str) -> Result<Option<String>, BackendError>;

    async fn verify_password(&self, admin_id: i64, password: &str) -> Result<bool, BackendError>;

    async fn update_password(&self, admin_id: i64, new_password: &str) -> Result<(), BackendError>;

    async fn insert_audit(&self, record: &AuditRecord) -> Result<(), BackendError>;
}

/// Backend failure, classified by what the caller can tell the user about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    NotFound,
    /// The storage bucket does not exist.
    BucketNotFound(String),
    /// A row-level or storage security policy rejected the request.
    PolicyDenied(String),
    /// The target table lacks a column the request referenced.
    MissingColumn(String),
    Other(String),
}

impl BackendError {
    /// Classify a raw backend error message by the phrases the backend uses.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("Bucket not found") {
            BackendError::BucketNotFound(message)
        } else if message.contains("security policy") {
            BackendError::PolicyDenied(message)
        } else if message.contains("column \"") && message.contains("does not exist") {
            BackendError::MissingColumn(message)
        } else {
            BackendError::Other(message)
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BackendError::NotFound => "Record not found",
            BackendError::BucketNotFound(m)
            | BackendError::PolicyDenied(m)
            | BackendError::MissingColumn(m)
            | BackendError::Other(m) => m,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for BackendError {}

impl From<sqlx::Error> for BackendError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => BackendError::NotFound,
            sqlx::Error::Database(db) => BackendError::classify(db.message().to_string()),
            other => BackendError::Other(other.to_string()),
        }
    }
}
