//! Shared test infrastructure for the profile workflows.
//!
//! `MemoryBackend` is an in-memory `ProfileBackend` with switchable faults,
//! so each workflow can be driven through its failure paths without Postgres.
//!
//! # Helpers
//! - `sample_identity()` - a signed-in superadmin with no avatar
//! - `service_with(backend)` - `ProfileService` wired to a fresh `AuditQueue`
//! - `png_upload()` - a tiny valid image upload

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use adminpanel::audit::{AuditQueue, AuditRecord};
use adminpanel::backend::{BackendError, ProfileBackend};
use adminpanel::models::activity::ActivityLogEntry;
use adminpanel::models::admin::{Identity, ProfileChanges, Role};
use adminpanel::profile::{AvatarUpload, ProfileService};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const ADMIN_ID: i64 = 42;
pub const ADMIN_EMAIL: &str = "ada@example.com";
pub const ADMIN_PASS: &str = "admin123";
pub const PUBLIC_BASE: &str = "https://cdn.example.com/storage/avatars";

/// Minimal PNG signature, enough to stand in for image bytes.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).single().expect("valid timestamp")
}

pub fn sample_identity() -> Identity {
    Identity {
        id: ADMIN_ID,
        full_name: Some("Ada Lovelace".to_string()),
        email: ADMIN_EMAIL.to_string(),
        avatar_url: None,
        role: Role::Superadmin,
        created_at: created_at(),
        updated_at: created_at() + Duration::days(3),
    }
}

pub fn png_upload() -> AvatarUpload {
    AvatarUpload::new("me.png", "image/png", PNG_BYTES.to_vec())
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Switchable failure modes. Each `Some` makes the matching call fail.
#[derive(Default)]
pub struct Faults {
    pub sign_out: Option<BackendError>,
    pub get_profile: Option<BackendError>,
    pub update_profile: Option<BackendError>,
    pub list_activity: Option<BackendError>,
    pub count_activity: Option<BackendError>,
    pub upload: Option<BackendError>,
    pub public_url: Option<BackendError>,
    /// Storage answers the URL lookup with nothing.
    pub no_public_url: bool,
    pub verify_password: Option<BackendError>,
    pub update_password: Option<BackendError>,
    pub insert_audit: Option<BackendError>,
    /// Another writer's avatar URL that lands right after our next update.
    pub concurrent_avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct State {
    identity: Option<Identity>,
    password: String,
    activity: Vec<ActivityLogEntry>,
    objects: HashMap<String, StoredObject>,
    audits: Vec<AuditRecord>,
    profile_updates: Vec<ProfileChanges>,
    calls: Vec<&'static str>,
    signed_out: Vec<i64>,
}

pub struct MemoryBackend {
    state: Mutex<State>,
    pub faults: Mutex<Faults>,
}

impl MemoryBackend {
    pub fn new(identity: Identity) -> Self {
        Self {
            state: Mutex::new(State {
                identity: Some(identity),
                password: ADMIN_PASS.to_string(),
                ..State::default()
            }),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn shared(identity: Identity) -> Arc<Self> {
        Arc::new(Self::new(identity))
    }

    pub fn with_faults(self, configure: impl FnOnce(&mut Faults)) -> Self {
        configure(&mut self.faults.lock().unwrap());
        self
    }

    pub fn set_activity(&self, entries: Vec<ActivityLogEntry>) {
        self.state.lock().unwrap().activity = entries;
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.lock().unwrap().identity.clone()
    }

    pub fn password(&self) -> String {
        self.state.lock().unwrap().password.clone()
    }

    pub fn audits(&self) -> Vec<AuditRecord> {
        self.state.lock().unwrap().audits.clone()
    }

    pub fn objects(&self) -> HashMap<String, StoredObject> {
        self.state.lock().unwrap().objects.clone()
    }

    pub fn profile_updates(&self) -> Vec<ProfileChanges> {
        self.state.lock().unwrap().profile_updates.clone()
    }

    /// Backend methods invoked so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn signed_out(&self) -> Vec<i64> {
        self.state.lock().unwrap().signed_out.clone()
    }

    fn enter(&self, call: &'static str) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn fault(&self, pick: impl FnOnce(&Faults) -> Option<BackendError>) -> Result<(), BackendError> {
        match pick(&self.faults.lock().unwrap()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProfileBackend for MemoryBackend {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Identity>, BackendError> {
        self.enter("authenticate");
        let state = self.state.lock().unwrap();
        Ok(state
            .identity
            .clone()
            .filter(|i| i.email.eq_ignore_ascii_case(email) && state.password == password))
    }

    async fn sign_out(&self, admin_id: i64) -> Result<(), BackendError> {
        self.enter("sign_out");
        self.fault(|f| f.sign_out.clone())?;
        self.state.lock().unwrap().signed_out.push(admin_id);
        Ok(())
    }

    async fn get_profile(&self, admin_id: i64) -> Result<Identity, BackendError> {
        self.enter("get_profile");
        self.fault(|f| f.get_profile.clone())?;
        self.state
            .lock()
            .unwrap()
            .identity
            .clone()
            .filter(|i| i.id == admin_id)
            .ok_or(BackendError::NotFound)
    }

    async fn update_profile(&self, admin_id: i64, changes: &ProfileChanges) -> Result<(), BackendError> {
        self.enter("update_profile");
        self.fault(|f| f.update_profile.clone())?;
        let concurrent = self.faults.lock().unwrap().concurrent_avatar.take();

        let mut state = self.state.lock().unwrap();
        state.profile_updates.push(changes.clone());
        let identity = state
            .identity
            .as_mut()
            .filter(|i| i.id == admin_id)
            .ok_or(BackendError::NotFound)?;
        if let Some(name) = &changes.full_name {
            identity.full_name = Some(name.clone()).filter(|n| !n.trim().is_empty());
        }
        if let Some(email) = &changes.email {
            identity.email = email.clone();
        }
        if let Some(url) = &changes.avatar_url {
            identity.avatar_url = Some(url.clone());
        }
        identity.updated_at = changes.updated_at;

        if let Some(other) = concurrent {
            identity.avatar_url = Some(other);
        }
        Ok(())
    }

    async fn list_activity(&self, _admin_id: i64, limit: i64) -> Result<Vec<ActivityLogEntry>, BackendError> {
        self.enter("list_activity");
        self.fault(|f| f.list_activity.clone())?;
        let state = self.state.lock().unwrap();
        let mut entries: Vec<_> = state.activity.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn count_activity(&self, _admin_id: i64, since: Option<DateTime<Utc>>) -> Result<i64, BackendError> {
        self.enter("count_activity");
        self.fault(|f| f.count_activity.clone())?;
        let state = self.state.lock().unwrap();
        let count = state
            .activity
            .iter()
            .filter(|e| since.is_none_or(|s| e.created_at >= s))
            .count();
        Ok(count as i64)
    }

    async fn upload_avatar(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BackendError> {
        self.enter("upload_avatar");
        self.fault(|f| f.upload.clone())?;
        self.state.lock().unwrap().objects.insert(
            path.to_string(),
            StoredObject { bytes, content_type: content_type.to_string() },
        );
        Ok(())
    }

    async fn public_url(&self, path: &str) -> Result<Option<String>, BackendError> {
        self.enter("public_url");
        self.fault(|f| f.public_url.clone())?;
        if self.faults.lock().unwrap().no_public_url {
            return Ok(None);
        }
        Ok(Some(format!("{PUBLIC_BASE}/{path}")))
    }

    async fn verify_password(&self, _admin_id: i64, password: &str) -> Result<bool, BackendError> {
        self.enter("verify_password");
        self.fault(|f| f.verify_password.clone())?;
        Ok(self.state.lock().unwrap().password == password)
    }

    async fn update_password(&self, _admin_id: i64, new_password: &str) -> Result<(), BackendError> {
        self.enter("update_password");
        self.fault(|f| f.update_password.clone())?;
        self.state.lock().unwrap().password = new_password.to_string();
        Ok(())
    }

    async fn insert_audit(&self, record: &AuditRecord) -> Result<(), BackendError> {
        self.enter("insert_audit");
        self.fault(|f| f.insert_audit.clone())?;
        self.state.lock().unwrap().audits.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// SERVICE SETUP
// ============================================================================

/// `ProfileService` over `backend`. Must be called inside a tokio runtime.
pub fn service_with(backend: Arc<MemoryBackend>) -> ProfileService {
    let backend: Arc<dyn ProfileBackend> = backend;
    let audit = AuditQueue::spawn(backend.clone());
    ProfileService::new(backend, audit)
}

pub fn activity_entry(id: i64, action: &str, created_at: DateTime<Utc>) -> ActivityLogEntry {
    ActivityLogEntry {
        id,
        action: action.to_string(),
        table_name: "admins".to_string(),
        record_id: ADMIN_ID,
        created_at,
    }
}
