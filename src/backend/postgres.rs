use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::storage::LocalObjectStore;
use super::{AVATAR_BUCKET, BackendError, ProfileBackend};
use crate::audit::AuditRecord;
use crate::auth::password;
use crate::models::activity::{self, ActivityLogEntry};
use crate::models::admin::{self, Identity, ProfileChanges};

/// `ProfileBackend` over the `admins` / `audit_logs` tables and a local object store.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
    storage: LocalObjectStore,
}

impl PgBackend {
    pub fn new(pool: PgPool, storage: LocalObjectStore) -> Self {
        Self { pool, storage }
    }

    pub fn storage(&self) -> &LocalObjectStore {
        &self.storage
    }
}

#[async_trait]
impl ProfileBackend for PgBackend {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Identity>, BackendError> {
        let Some((row, hash)) = admin::find_credentials_by_email(&self.pool, email).await? else {
            return Ok(None);
        };
        match password::verify_password(password, &hash) {
            Ok(true) => Ok(Some(row.into())),
            Ok(false) => Ok(None),
            Err(e) => {
                log::warn!("Stored password hash for admin {} is unreadable: {e}", row.id);
                Ok(None)
            }
        }
    }

    async fn sign_out(&self, admin_id: i64) -> Result<(), BackendError> {
        match admin::record_sign_out(&self.pool, admin_id).await? {
            0 => Err(BackendError::NotFound),
            _ => Ok(()),
        }
    }

    async fn get_profile(&self, admin_id: i64) -> Result<Identity, BackendError> {
        admin::find_by_id(&self.pool, admin_id)
            .await?
            .map(Identity::from)
            .ok_or(BackendError::NotFound)
    }

    async fn update_profile(&self, admin_id: i64, changes: &ProfileChanges) -> Result<(), BackendError> {
        match admin::update_profile(&self.pool, admin_id, changes).await? {
            0 => Err(BackendError::NotFound),
            _ => Ok(()),
        }
    }

    async fn list_activity(&self, admin_id: i64, limit: i64) -> Result<Vec<ActivityLogEntry>, BackendError> {
        Ok(activity::find_recent_by_admin(&self.pool, admin_id, limit).await?)
    }

    async fn count_activity(&self, admin_id: i64, since: Option<DateTime<Utc>>) -> Result<i64, BackendError> {
        Ok(activity::count_by_admin(&self.pool, admin_id, since).await?)
    }

    async fn upload_avatar(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BackendError> {
        self.storage
            .upload(AVATAR_BUCKET, path, &bytes, content_type, true)
            .await
    }

    async fn public_url(&self, path: &str) -> Result<Option<String>, BackendError> {
        Ok(self.storage.public_url(AVATAR_BUCKET, path))
    }

    async fn verify_password(&self, admin_id: i64, password: &str) -> Result<bool, BackendError> {
        let hash = admin::find_password_hash_by_id(&self.pool, admin_id)
            .await?
            .ok_or(BackendError::NotFound)?;
        password::verify_password(password, &hash).map_err(BackendError::Other)
    }

    async fn update_password(&self, admin_id: i64, new_password: &str) -> Result<(), BackendError> {
        let hash = password::hash_password(new_password).map_err(BackendError::Other)?;
        match admin::update_password(&self.pool, admin_id, &hash).await? {
            0 => Err(BackendError::NotFound),
            _ => Ok(()),
        }
    }

    async fn insert_audit(&self, record: &AuditRecord) -> Result<(), BackendError> {
        activity::create(
            &self.pool,
            record.admin_id,
            record.action.as_str(),
            &record.table_name,
            record.record_id,
            &record.changes,
        )
        .await?;
        Ok(())
    }
}
