//! Profile page workflows: profile edit, password change, avatar upload and
//! the activity feed.
//!
//! Every workflow goes through [`ProfileService`], which only talks to the
//! backend via [`ProfileBackend`] and records advisory audit entries on the
//! [`AuditQueue`]. Audit writes never influence a workflow's result.

pub mod activity;
pub mod avatar;
pub mod edit;
pub mod password;

use std::fmt;
use std::sync::Arc;

use crate::audit::AuditQueue;
use crate::backend::{BackendError, ProfileBackend};
use crate::models::admin::Identity;

pub use avatar::{AvatarOutcome, AvatarState, AvatarUpload, MAX_AVATAR_BYTES};
pub use edit::ProfileEditForm;
pub use password::PasswordChangeForm;

pub const FIELD_GENERAL: &str = "general";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_CURRENT_PASSWORD: &str = "current_password";
pub const FIELD_AVATAR: &str = "avatar";

/// Why a profile workflow did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// Rejected before any backend call.
    Invalid { field: &'static str, message: String },
    /// The backend refused or failed the primary operation.
    Backend { field: &'static str, message: String },
}

impl ProfileError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ProfileError::Invalid { field, message: message.into() }
    }

    pub fn backend(field: &'static str, message: impl Into<String>) -> Self {
        ProfileError::Backend { field, message: message.into() }
    }

    pub fn field(&self) -> &'static str {
        match self {
            ProfileError::Invalid { field, .. } | ProfileError::Backend { field, .. } => field,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProfileError::Invalid { message, .. } | ProfileError::Backend { message, .. } => message,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProfileError::Invalid { .. })
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field(), self.message())
    }
}

impl std::error::Error for ProfileError {}

#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn ProfileBackend>,
    audit: AuditQueue,
    require_current_password: bool,
}

impl ProfileService {
    pub fn new(backend: Arc<dyn ProfileBackend>, audit: AuditQueue) -> Self {
        Self {
            backend,
            audit,
            require_current_password: true,
        }
    }

    /// Whether a password change must present the current password.
    pub fn with_current_password_check(mut self, required: bool) -> Self {
        self.require_current_password = required;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ProfileBackend> {
        &self.backend
    }

    pub fn audit(&self) -> &AuditQueue {
        &self.audit
    }

    pub fn requires_current_password(&self) -> bool {
        self.require_current_password
    }

    /// Canonical identity from the backend.
    pub async fn get_profile(&self, admin_id: i64) -> Result<Identity, BackendError> {
        self.backend.get_profile(admin_id).await
    }

    /// Re-fetch after a successful mutation. A failure is logged and leaves the
    /// caller without a fresh copy; the mutation itself already succeeded.
    async fn refetch(&self, admin_id: i64) -> Option<Identity> {
        match self.backend.get_profile(admin_id).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                log::warn!("Could not re-fetch profile {admin_id} after update: {e}");
                None
            }
        }
    }
}
