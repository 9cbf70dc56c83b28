//! Avatar upload: validation, object naming, cache-busting and the
//! optimistic `Pending -> Confirmed | RolledBack` state transition.
//!
//! The stored object and the profile link live on different backend surfaces
//! with no transaction between them. When linking fails the uploaded object is
//! left in place.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use serde_json::json;

use super::{FIELD_AVATAR, ProfileError, ProfileService};
use crate::audit::{AuditAction, AuditRecord};
use crate::backend::{AVATAR_BUCKET, AVATAR_FOLDER, BackendError};
use crate::models::admin::{Identity, ProfileChanges};

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

const CACHE_PARAM: &str = "t";
const DEFAULT_EXTENSION: &str = "img";

/// An image file chosen for upload.
#[derive(Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AvatarUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

fn not_an_image() -> ProfileError {
    ProfileError::invalid(FIELD_AVATAR, "Please select a valid image file")
}

fn too_large() -> ProfileError {
    ProfileError::invalid(FIELD_AVATAR, "File size must be less than 5MB")
}

impl AvatarUpload {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    /// Build an upload from a browser `data:<mime>;base64,<payload>` URI.
    /// The type and size checks run before the payload is decoded.
    pub fn from_data_uri(file_name: &str, data_uri: &str) -> Result<Self, ProfileError> {
        let rest = data_uri.strip_prefix("data:").ok_or_else(not_an_image)?;
        let (meta, payload) = rest.split_once(',').ok_or_else(not_an_image)?;
        let content_type = meta.strip_suffix(";base64").ok_or_else(not_an_image)?;
        if !is_raster_image(content_type) {
            return Err(not_an_image());
        }
        if payload.len() > (MAX_AVATAR_BYTES / 3 + 1) * 4 {
            return Err(too_large());
        }
        let bytes = STANDARD.decode(payload).map_err(|_| not_an_image())?;

        let upload = Self::new(file_name, content_type, bytes);
        upload.validate()?;
        Ok(upload)
    }

    /// Must be an `image/*` type of at most [`MAX_AVATAR_BYTES`]. SVG is
    /// refused since it can carry script.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !is_raster_image(&self.content_type) {
            return Err(not_an_image());
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            return Err(too_large());
        }
        Ok(())
    }

    /// Text after the last `.` of the original file name (the whole name if
    /// it has none), reduced to ASCII letters and digits so it is safe in a URL.
    pub fn extension(&self) -> String {
        let ext: String = self
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if ext.is_empty() { DEFAULT_EXTENSION.to_string() } else { ext }
    }
}

fn is_raster_image(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/") && essence != "image/svg+xml"
}

/// Object path inside the avatar bucket: `admin-avatars/{id}_{ms}.{ext}`.
pub fn avatar_object_path(admin_id: i64, uploaded_at_ms: i64, extension: &str) -> String {
    format!("{AVATAR_FOLDER}/{admin_id}_{uploaded_at_ms}.{extension}")
}

/// Append `t=<token>` using `&` when the URL already has a query string.
pub fn append_cache_param(url: &str, token: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{CACHE_PARAM}={token}")
}

/// Value of the last `t=` query parameter in `url`, if any.
pub fn cache_token(url: &str) -> Option<i64> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == CACHE_PARAM)
        .filter_map(|(_, value)| value.parse().ok())
        .last()
}

/// Current time in ms, bumped past `previous`'s token so consecutive avatar
/// URLs never share a cache-busting value.
pub fn next_cache_token(previous: Option<&str>, now_ms: i64) -> i64 {
    match previous.and_then(cache_token) {
        Some(prev) if prev >= now_ms => prev + 1,
        _ => now_ms,
    }
}

/// Locally displayed avatar across an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarState {
    Idle { url: Option<String> },
    /// New URL shown optimistically, not yet confirmed by a re-fetch.
    Pending { previous: Option<String>, candidate: String },
    /// URL taken from the re-fetched canonical identity.
    Confirmed { url: Option<String> },
    /// The link failed; the previous URL is shown again.
    RolledBack { url: Option<String> },
}

impl AvatarState {
    pub fn idle(url: Option<&str>) -> Self {
        AvatarState::Idle { url: url.map(str::to_string) }
    }

    pub fn displayed_url(&self) -> Option<&str> {
        match self {
            AvatarState::Idle { url }
            | AvatarState::Confirmed { url }
            | AvatarState::RolledBack { url } => url.as_deref(),
            AvatarState::Pending { candidate, .. } => Some(candidate),
        }
    }

    pub fn stage(self, candidate: String) -> Self {
        let previous = match self {
            AvatarState::Pending { previous, .. } => previous,
            settled => settled.displayed_url().map(str::to_string),
        };
        AvatarState::Pending { previous, candidate }
    }

    /// Settle on the canonical URL. A concurrent write that landed after ours
    /// wins, so this may differ from the staged candidate.
    pub fn confirm(self, canonical: &Identity) -> Self {
        match self {
            AvatarState::Pending { .. } => AvatarState::Confirmed {
                url: canonical.avatar_url.clone(),
            },
            other => other,
        }
    }

    pub fn roll_back(self) -> Self {
        match self {
            AvatarState::Pending { previous, .. } => AvatarState::RolledBack { url: previous },
            other => other,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AvatarState::Pending { .. })
    }
}

/// Result of a completed avatar upload.
#[derive(Debug, Clone)]
pub struct AvatarOutcome {
    pub state: AvatarState,
    /// Re-fetched identity; `None` when the re-fetch failed.
    pub identity: Option<Identity>,
}

fn no_public_url() -> ProfileError {
    ProfileError::backend(FIELD_AVATAR, "Failed to generate public URL for uploaded avatar.")
}

fn storage_diagnostic(err: BackendError) -> ProfileError {
    let message = match err {
        BackendError::BucketNotFound(_) => format!(
            "Storage Error: Bucket \"{AVATAR_BUCKET}\" not found. Please create it before uploading avatars."
        ),
        BackendError::PolicyDenied(msg) => format!(
            "Storage RLS Error: {msg}. Check the write policy on the '{AVATAR_BUCKET}' bucket."
        ),
        other => other.message().to_string(),
    };
    ProfileError::backend(FIELD_AVATAR, message)
}

fn link_diagnostic(err: BackendError) -> ProfileError {
    let message = match err {
        BackendError::MissingColumn(_) => {
            "Database Error: The \"admins\" table is missing the \"avatar_url\" column.".to_string()
        }
        BackendError::PolicyDenied(msg) => {
            format!("Database RLS Error: {msg}. Check the UPDATE policy on the 'admins' table.")
        }
        other => other.message().to_string(),
    };
    ProfileError::backend(FIELD_AVATAR, message)
}

impl ProfileService {
    /// Upload `upload` and link it as the admin's avatar.
    ///
    /// `current_avatar` is the URL displayed before the upload; it seeds the
    /// state machine and the cache-busting token.
    pub async fn upload_avatar(
        &self,
        admin_id: i64,
        current_avatar: Option<&str>,
        upload: AvatarUpload,
    ) -> Result<AvatarOutcome, ProfileError> {
        upload.validate()?;

        let uploaded_at_ms = Utc::now().timestamp_millis();
        let path = avatar_object_path(admin_id, uploaded_at_ms, &upload.extension());
        let content_type = upload.content_type.clone();

        self.backend
            .upload_avatar(&path, upload.bytes, &content_type)
            .await
            .map_err(storage_diagnostic)?;

        let public_url = match self.backend.public_url(&path).await {
            Ok(Some(url)) => url,
            Ok(None) => return Err(no_public_url()),
            Err(e) => {
                log::warn!("Public URL lookup for {path} failed: {e}");
                return Err(no_public_url());
            }
        };

        let token = next_cache_token(current_avatar, Utc::now().timestamp_millis());
        let avatar_url = append_cache_param(&public_url, token);

        let state = AvatarState::idle(current_avatar).stage(avatar_url.clone());
        if let Err(e) = self
            .backend
            .update_profile(admin_id, &ProfileChanges::avatar(&avatar_url, Utc::now()))
            .await
        {
            let state = state.roll_back();
            log::warn!(
                "Avatar for admin {admin_id} stored at {path} but not linked ({e}); showing {:?}",
                state.displayed_url()
            );
            return Err(link_diagnostic(e));
        }

        let identity = self.refetch(admin_id).await;
        let state = match &identity {
            Some(canonical) => state.confirm(canonical),
            None => state,
        };

        self.audit.record(AuditRecord::own_profile(
            admin_id,
            AuditAction::AvatarUpdated,
            json!({ "avatar_updated": true }),
        ));

        log::info!("Admin {admin_id} uploaded a new avatar ({path})");
        Ok(AvatarOutcome { state, identity })
    }
}
